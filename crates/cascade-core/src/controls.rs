//! Unified control surface helpers
//!
//! Pure policy and math shared by every source type: the fixed playback
//! rate set, seek-by-fraction/skip clamping, and the auto-hide policy
//! for the control chrome. The session applies these; hosts may also
//! use them directly for rendering.

use std::time::{Duration, Instant};

/// Playback rates the control surface offers
pub const PLAYBACK_RATES: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// Is `rate` one of the allowed playback rates
pub fn rate_allowed(rate: f64) -> bool {
    PLAYBACK_RATES.iter().any(|r| (r - rate).abs() < f64::EPSILON)
}

/// Control actions a host input layer can dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    PlayPause,
    /// Seek to a played fraction in percent (0-100)
    SeekFraction(f64),
    SkipForward,
    SkipBackward,
    SetVolume(f64),
    Mute,
    SetRate(f64),
    Fullscreen,
}

/// Map a 0-100 seek fraction onto a position in seconds
pub fn fraction_to_position(percent: f64, duration: f64) -> f64 {
    (percent.clamp(0.0, 100.0) / 100.0) * duration.max(0.0)
}

/// Clamp a skip target into the playable range
pub fn skip_target(position: f64, offset: f64, duration: Option<f64>) -> f64 {
    let target = position + offset;
    match duration {
        Some(d) => target.clamp(0.0, d),
        None => target.max(0.0),
    }
}

/// Auto-hide policy for the control chrome: visible on pointer
/// activity, hidden after the idle timeout while playing, always
/// visible while paused.
#[derive(Debug, Clone)]
pub struct ChromePolicy {
    idle_timeout: Duration,
    last_activity: Instant,
}

impl ChromePolicy {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            last_activity: Instant::now(),
        }
    }

    /// Record pointer movement or any other user interaction
    pub fn on_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn visible(&self, now: Instant, is_playing: bool) -> bool {
        if !is_playing {
            return true;
        }
        now.duration_since(self.last_activity) < self.idle_timeout
    }
}
