//! Playback session - orchestrator for one mount
//!
//! Coordinates:
//! - Initial source selection and fallback routing
//! - In-place retry with backoff for transient failures
//! - State machine transitions and host event emission
//! - Binding lifecycle (exactly one active, epoch-guarded teardown)

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::binding::{BindingEnvelope, BindingEvent, BindingFactory, EventSink, MediaBinding};
use crate::controls::{self, ChromePolicy, ControlAction};
use crate::error::{Error, ErrorClass, Result};
use crate::quality::{self, QualityTarget};
use crate::retry::{self, ScheduledRetry};
use crate::source;
use crate::types::{
    PlaybackState, PlayerConfig, PlayerPhase, SessionId, SourceKind, SourceSet,
};

/// Host-facing playback events. The terminal error is deliberately
/// unstructured; failure detail stays in the logs.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    LoadedMetadata { duration: Option<f64> },
    Progress { percent: f64 },
    TimeUpdate { position: f64, duration: Option<f64> },
    Play,
    Pause,
    Ended,
    Error,
}

/// Fallback bookkeeping for the active attempt
#[derive(Debug)]
struct Attempt {
    current: SourceKind,
    /// Grows monotonically within one mount lifecycle
    failed: HashSet<SourceKind>,
    /// Resets to zero on every source switch
    retry_count: u32,
    /// Media-class errors get exactly one in-place recovery
    recovery_attempted: bool,
}

struct Shared {
    id: SessionId,
    config: PlayerConfig,
    sources: SourceSet,
    factory: Box<dyn BindingFactory>,
    /// Bumped on every teardown; events stamped with an older epoch are
    /// discarded, so a stale binding can never corrupt state
    epoch: AtomicU64,
    unmounted: AtomicBool,
    phase: RwLock<PlayerPhase>,
    phase_tx: watch::Sender<PlayerPhase>,
    state: RwLock<PlaybackState>,
    attempt: RwLock<Attempt>,
    binding: Mutex<Option<Box<dyn MediaBinding>>>,
    binding_tx: mpsc::UnboundedSender<BindingEnvelope>,
    events_tx: mpsc::UnboundedSender<PlayerEvent>,
    retry: StdMutex<Option<ScheduledRetry>>,
}

/// Player session managing a single mount
pub struct PlayerSession {
    shared: Arc<Shared>,
    loop_task: JoinHandle<()>,
}

impl PlayerSession {
    /// Mount the player: select the initial source and start loading.
    ///
    /// Fails synchronously when no source was supplied, or when a
    /// provider hard rule makes the supplied set unplayable (missing or
    /// unsupported source; no retry, no fallback).
    pub async fn mount(
        sources: SourceSet,
        config: PlayerConfig,
        factory: Box<dyn BindingFactory>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PlayerEvent>)> {
        let initial = source::select_initial(&sources)?;

        let id = SessionId::new();
        let (phase_tx, _) = watch::channel(PlayerPhase::Selecting);
        let (binding_tx, binding_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            id,
            config,
            sources,
            factory,
            epoch: AtomicU64::new(0),
            unmounted: AtomicBool::new(false),
            phase: RwLock::new(PlayerPhase::Selecting),
            phase_tx,
            state: RwLock::new(PlaybackState::default()),
            attempt: RwLock::new(Attempt {
                current: initial,
                failed: HashSet::new(),
                retry_count: 0,
                recovery_attempted: false,
            }),
            binding: Mutex::new(None),
            binding_tx,
            events_tx,
            retry: StdMutex::new(None),
        });

        info!(session_id = %id, source = %initial, "Mounting player session");

        let loop_task = tokio::spawn(Shared::run_loop(shared.clone(), binding_rx));
        Shared::activate(&shared, initial, 0).await;

        Ok((Self { shared, loop_task }, events_rx))
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub async fn phase(&self) -> PlayerPhase {
        *self.shared.phase.read().await
    }

    /// Subscribe to phase changes
    pub fn subscribe_phase(&self) -> watch::Receiver<PlayerPhase> {
        self.shared.phase_tx.subscribe()
    }

    /// Snapshot of the playback state for the control bar
    pub async fn snapshot(&self) -> PlaybackState {
        self.shared.state.read().await.clone()
    }

    /// Auto-hide policy for the control chrome, using the configured
    /// idle timeout. The host feeds it activity and poll timestamps.
    pub fn chrome_policy(&self) -> ChromePolicy {
        ChromePolicy::new(Duration::from_millis(
            self.shared.config.chrome_idle_timeout_ms,
        ))
    }

    /// Sources that have failed so far in this mount
    pub async fn failed_sources(&self) -> HashSet<SourceKind> {
        self.shared.attempt.read().await.failed.clone()
    }

    /// In-place retry count for the current activation (for the
    /// loading spinner's attempt counter)
    pub async fn retry_count(&self) -> u32 {
        self.shared.attempt.read().await.retry_count
    }

    /// Start or resume playback. A no-op unless paused or loading.
    #[instrument(skip(self))]
    pub async fn play(&self) -> Result<()> {
        let phase = *self.shared.phase.read().await;
        let source = match phase {
            PlayerPhase::Paused { source } => source,
            _ => return Ok(()),
        };

        if let Some(binding) = self.shared.binding.lock().await.as_mut() {
            binding.play().await?;
        }
        self.shared.state.write().await.is_playing = true;
        let _ = Shared::set_phase(&self.shared, PlayerPhase::Playing { source }).await;
        self.shared.emit(PlayerEvent::Play);
        Ok(())
    }

    /// Pause playback. A no-op unless playing.
    #[instrument(skip(self))]
    pub async fn pause(&self) -> Result<()> {
        let phase = *self.shared.phase.read().await;
        let source = match phase {
            PlayerPhase::Playing { source } => source,
            _ => return Ok(()),
        };

        if let Some(binding) = self.shared.binding.lock().await.as_mut() {
            binding.pause().await?;
        }
        self.shared.state.write().await.is_playing = false;
        let _ = Shared::set_phase(&self.shared, PlayerPhase::Paused { source }).await;
        self.shared.emit(PlayerEvent::Pause);
        Ok(())
    }

    pub async fn toggle_play(&self) -> Result<()> {
        if self.shared.state.read().await.is_playing {
            self.pause().await
        } else {
            self.play().await
        }
    }

    /// Seek to an absolute position, clamped into the known range
    #[instrument(skip(self))]
    pub async fn seek(&self, seconds: f64) -> Result<()> {
        let duration = self.shared.state.read().await.duration;
        let clamped = match duration {
            Some(d) => seconds.clamp(0.0, d),
            None => seconds.max(0.0),
        };

        if let Some(binding) = self.shared.binding.lock().await.as_mut() {
            binding.seek(clamped).await?;
        }
        self.shared.state.write().await.position = clamped;
        Ok(())
    }

    /// Seek by played fraction (0-100 mapped to duration). A no-op
    /// while duration is unknown.
    pub async fn seek_fraction(&self, percent: f64) -> Result<()> {
        let duration = self.shared.state.read().await.duration;
        match duration {
            Some(d) => self.seek(controls::fraction_to_position(percent, d)).await,
            None => Ok(()),
        }
    }

    /// Skip by a signed offset in seconds
    pub async fn skip(&self, offset: f64) -> Result<()> {
        let (position, duration) = {
            let state = self.shared.state.read().await;
            (state.position, state.duration)
        };
        self.seek(controls::skip_target(position, offset, duration))
            .await
    }

    /// Set volume, clamped into [0, 1]
    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        let volume = volume.clamp(0.0, 1.0);
        let muted = {
            let mut state = self.shared.state.write().await;
            state.volume = volume;
            state.is_muted
        };
        if let Some(binding) = self.shared.binding.lock().await.as_mut() {
            binding.set_volume(volume, muted).await?;
        }
        Ok(())
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        let (volume, muted) = {
            let mut state = self.shared.state.write().await;
            state.is_muted = !state.is_muted;
            (state.volume, state.is_muted)
        };
        if let Some(binding) = self.shared.binding.lock().await.as_mut() {
            binding.set_volume(volume, muted).await?;
        }
        Ok(())
    }

    /// Set the playback rate. Rates outside the allowed set are
    /// ignored, not errors.
    pub async fn set_rate(&self, rate: f64) -> Result<()> {
        if !controls::rate_allowed(rate) {
            debug!(rate, "Rate outside allowed set, ignoring");
            return Ok(());
        }
        if let Some(binding) = self.shared.binding.lock().await.as_mut() {
            binding.set_rate(rate).await?;
        }
        self.shared.state.write().await.playback_rate = rate;
        Ok(())
    }

    pub async fn toggle_fullscreen(&self) {
        let mut state = self.shared.state.write().await;
        state.is_fullscreen = !state.is_fullscreen;
    }

    /// Pin a quality level by label ("Auto" clears the pin). A no-op
    /// when the active source has no quality selection (e.g. embeds).
    pub async fn change_quality(&self, label: &str) -> Result<()> {
        let mut guard = self.shared.binding.lock().await;
        let binding = match guard.as_mut() {
            Some(b) if b.supports_quality_selection() => b,
            _ => return Ok(()),
        };
        binding.set_quality(QualityTarget::from_label(label)).await?;
        drop(guard);
        self.shared.state.write().await.quality_label = label.to_string();
        Ok(())
    }

    /// Dispatch a host input action onto the session
    pub async fn apply_control(&self, action: ControlAction) -> Result<()> {
        match action {
            ControlAction::PlayPause => self.toggle_play().await,
            ControlAction::SeekFraction(percent) => self.seek_fraction(percent).await,
            ControlAction::SkipForward => self.skip(self.shared.config.skip_offset_secs).await,
            ControlAction::SkipBackward => self.skip(-self.shared.config.skip_offset_secs).await,
            ControlAction::SetVolume(volume) => self.set_volume(volume).await,
            ControlAction::Mute => self.toggle_mute().await,
            ControlAction::SetRate(rate) => self.set_rate(rate).await,
            ControlAction::Fullscreen => {
                self.toggle_fullscreen().await;
                Ok(())
            }
        }
    }

    /// Position report from the renderer (native bindings drive no
    /// clock of their own)
    pub async fn report_position(&self, seconds: f64) {
        let epoch = self.shared.epoch.load(Ordering::SeqCst);
        let _ = self.shared.binding_tx.send(BindingEnvelope {
            epoch,
            event: BindingEvent::TimeUpdate {
                position: seconds,
                duration: None,
            },
        });
    }

    /// Duration report from the renderer once media metadata parsed
    pub async fn report_duration(&self, seconds: f64) {
        self.shared.state.write().await.duration = Some(seconds);
    }

    /// Failure report from the renderer (decode errors surface here);
    /// routed through the same retry/fallback machinery as
    /// binding-detected failures.
    pub fn report_error(&self, error: Error) {
        let epoch = self.shared.epoch.load(Ordering::SeqCst);
        let _ = self.shared.binding_tx.send(BindingEnvelope {
            epoch,
            event: BindingEvent::Failed(error),
        });
    }

    /// Tear everything down: cancel pending retries, invalidate all
    /// in-flight callbacks, release the binding. No state mutation nor
    /// host event can be observed afterwards.
    pub async fn unmount(self) {
        let shared = &self.shared;
        shared.unmounted.store(true, Ordering::SeqCst);
        shared.epoch.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut retry) = shared.retry.lock() {
            if let Some(timer) = retry.take() {
                timer.cancel();
            }
        }
        self.loop_task.abort();
        if let Some(mut binding) = shared.binding.lock().await.take() {
            binding.teardown().await;
        }
        info!(session_id = %shared.id, "Session unmounted");
    }
}

impl Drop for PlayerSession {
    fn drop(&mut self) {
        // Best-effort teardown for hosts that drop without unmounting.
        self.shared.unmounted.store(true, Ordering::SeqCst);
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut retry) = self.shared.retry.lock() {
            retry.take();
        }
        self.loop_task.abort();
    }
}

impl Shared {
    async fn run_loop(shared: Arc<Shared>, mut rx: mpsc::UnboundedReceiver<BindingEnvelope>) {
        while let Some(envelope) = rx.recv().await {
            if shared.unmounted.load(Ordering::SeqCst) {
                break;
            }
            if envelope.epoch != shared.epoch.load(Ordering::SeqCst) {
                debug!(epoch = envelope.epoch, "Discarding stale binding event");
                continue;
            }
            Self::handle_event(&shared, envelope.event).await;
        }
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events_tx.send(event);
    }

    async fn set_phase(shared: &Arc<Shared>, target: PlayerPhase) -> Result<()> {
        let mut phase = shared.phase.write().await;
        if !phase.can_transition_to(&target) {
            return Err(Error::InvalidStateTransition {
                from: phase.to_string(),
                to: target.to_string(),
            });
        }
        debug!(from = %*phase, to = %target, "Phase transition");
        *phase = target;
        let _ = shared.phase_tx.send(target);
        Ok(())
    }

    /// Tear down the previous binding and start loading `kind`.
    /// `attempt` is nonzero when this is an in-place retry.
    async fn activate(shared: &Arc<Shared>, kind: SourceKind, attempt: u32) {
        if shared.unmounted.load(Ordering::SeqCst) {
            return;
        }

        // Invalidate the old binding's events before anything else.
        let epoch = shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(mut old) = shared.binding.lock().await.take() {
            old.teardown().await;
        }

        let _ = Self::set_phase(
            shared,
            PlayerPhase::Loading {
                source: kind,
                attempt,
            },
        )
        .await;

        let sink = EventSink::new(epoch, shared.binding_tx.clone());
        let created = shared
            .factory
            .create(kind, &shared.sources, &shared.config, sink.clone());

        match created {
            Ok(mut binding) => {
                let loaded = binding.load().await;
                *shared.binding.lock().await = Some(binding);
                if let Err(e) = loaded {
                    // Route through the same path as async failures.
                    sink.emit(BindingEvent::Failed(e));
                }
            }
            Err(e) => sink.emit(BindingEvent::Failed(e)),
        }
    }

    async fn handle_event(shared: &Arc<Shared>, event: BindingEvent) {
        match event {
            BindingEvent::Ready {
                duration,
                qualities,
            } => Self::handle_ready(shared, duration, qualities).await,
            BindingEvent::TimeUpdate { position, duration } => {
                Self::handle_time_update(shared, position, duration).await;
            }
            BindingEvent::Play => {
                let phase = *shared.phase.read().await;
                if let PlayerPhase::Paused { source } | PlayerPhase::Loading { source, .. } = phase
                {
                    shared.state.write().await.is_playing = true;
                    let _ = Self::set_phase(shared, PlayerPhase::Playing { source }).await;
                    shared.emit(PlayerEvent::Play);
                }
            }
            BindingEvent::Pause => {
                let phase = *shared.phase.read().await;
                if let PlayerPhase::Playing { source } = phase {
                    shared.state.write().await.is_playing = false;
                    let _ = Self::set_phase(shared, PlayerPhase::Paused { source }).await;
                    shared.emit(PlayerEvent::Pause);
                }
            }
            BindingEvent::Ended => Self::finish_ended(shared).await,
            BindingEvent::Failed(error) => Self::route_failure(shared, error).await,
        }
    }

    async fn handle_ready(
        shared: &Arc<Shared>,
        duration: Option<f64>,
        qualities: Vec<crate::quality::QualityLevel>,
    ) {
        let source = match shared.phase.read().await.source() {
            Some(source) => source,
            None => return,
        };

        {
            let mut state = shared.state.write().await;
            if duration.is_some() {
                state.duration = duration;
            }
        }

        // Initial quality policy: pin the first level at or above the
        // configured bar to avoid a low-quality flash.
        if !qualities.is_empty() {
            let target =
                quality::initial_target(&qualities, shared.config.preferred_min_height);
            let mut guard = shared.binding.lock().await;
            if let Some(binding) = guard.as_mut() {
                if binding.supports_quality_selection()
                    && binding.set_quality(target).await.is_ok()
                {
                    let label = match target {
                        QualityTarget::Auto => "Auto".to_string(),
                        QualityTarget::Height(h) => format!("{h}p"),
                    };
                    drop(guard);
                    shared.state.write().await.quality_label = label;
                }
            }
        }

        // Start offset for natively-bound sources; the embed bridge
        // already applied it during its handshake.
        if source != SourceKind::Embed {
            if let Some(start) = shared.sources.start_time {
                let mut guard = shared.binding.lock().await;
                if let Some(binding) = guard.as_mut() {
                    if binding.seek(start).await.is_ok() {
                        drop(guard);
                        shared.state.write().await.position = start;
                    }
                }
            }
        }

        shared.emit(PlayerEvent::LoadedMetadata { duration });

        shared.state.write().await.is_playing = true;
        let _ = Self::set_phase(shared, PlayerPhase::Playing { source }).await;
        shared.emit(PlayerEvent::Play);

        info!(source = %source, duration = ?duration, "Source ready, playing");
    }

    async fn handle_time_update(shared: &Arc<Shared>, position: f64, duration: Option<f64>) {
        let (duration, percent) = {
            let mut state = shared.state.write().await;
            state.position = position;
            if duration.is_some() {
                state.duration = duration;
            }
            (state.duration, state.progress_percent())
        };

        shared.emit(PlayerEvent::TimeUpdate { position, duration });
        if let Some(percent) = percent {
            shared.emit(PlayerEvent::Progress { percent });
        }

        // End-of-content inference for bindings that never signal it.
        if let Some(d) = duration {
            if d > 0.0 && position >= d - 0.5 {
                Self::finish_ended(shared).await;
            }
        }
    }

    async fn finish_ended(shared: &Arc<Shared>) {
        if Self::set_phase(shared, PlayerPhase::Ended).await.is_err() {
            return;
        }
        shared.state.write().await.is_playing = false;
        shared.emit(PlayerEvent::Ended);
        info!("Playback ended");
    }

    /// Failure router: retry in place, recover in place, fall back, or
    /// terminate, per error class.
    async fn route_failure(shared: &Arc<Shared>, error: Error) {
        if shared.unmounted.load(Ordering::SeqCst) {
            return;
        }
        if shared.phase.read().await.is_terminal() {
            return;
        }

        let (current, retry_count) = {
            let attempt = shared.attempt.read().await;
            (attempt.current, attempt.retry_count)
        };

        warn!(
            source = %current,
            code = error.code(),
            class = ?error.class(),
            retry_count,
            error = %error,
            "Playback failure"
        );

        if error.is_terminal() {
            Self::terminal(shared).await;
            return;
        }

        match error.class() {
            ErrorClass::Network => {
                let next_retry = retry_count + 1;
                if retry::budget_exhausted(&shared.config, next_retry) {
                    Self::fall_back(shared).await;
                    return;
                }
                shared.attempt.write().await.retry_count = next_retry;
                let _ = Self::set_phase(
                    shared,
                    PlayerPhase::Loading {
                        source: current,
                        attempt: next_retry,
                    },
                )
                .await;

                let delay = retry::retry_delay(&shared.config, next_retry);
                let epoch_at_schedule = shared.epoch.load(Ordering::SeqCst);
                let shared_for_timer = shared.clone();
                let timer = ScheduledRetry::spawn(delay, move || async move {
                    // A source switch or unmount in the meantime makes
                    // this retry moot.
                    if shared_for_timer.unmounted.load(Ordering::SeqCst)
                        || shared_for_timer.epoch.load(Ordering::SeqCst) != epoch_at_schedule
                    {
                        return;
                    }
                    Shared::activate(&shared_for_timer, current, next_retry).await;
                });
                if let Ok(mut slot) = shared.retry.lock() {
                    *slot = Some(timer);
                }
            }
            ErrorClass::Media => {
                let already_recovered = {
                    let mut attempt = shared.attempt.write().await;
                    let prior = attempt.recovery_attempted;
                    attempt.recovery_attempted = true;
                    prior
                };
                if already_recovered {
                    Self::fall_back(shared).await;
                    return;
                }

                let _ = Self::set_phase(
                    shared,
                    PlayerPhase::Loading {
                        source: current,
                        attempt: retry_count,
                    },
                )
                .await;

                let recovered = match shared.binding.lock().await.as_mut() {
                    Some(binding) => binding.recover().await,
                    None => Err(Error::Internal("no active binding".to_string())),
                };
                if recovered.is_err() {
                    Self::fall_back(shared).await;
                }
                // On success the binding re-emits Ready.
            }
            ErrorClass::Fatal => Self::fall_back(shared).await,
        }
    }

    /// Record the current source as failed and move to the next viable
    /// candidate, or terminate when none remains.
    async fn fall_back(shared: &Arc<Shared>) {
        let next = {
            let mut attempt = shared.attempt.write().await;
            let from = attempt.current;
            attempt.failed.insert(from);
            let next = source::next_fallback(&shared.sources, &attempt.failed, from);
            if let Some(next) = next {
                attempt.current = next;
                attempt.retry_count = 0;
                attempt.recovery_attempted = false;
            }
            next
        };

        match next {
            Some(next) => {
                info!(source = %next, "Falling back");
                Self::activate(shared, next, 0).await;
            }
            None => Self::terminal(shared).await,
        }
    }

    /// All recovery exhausted. Emits exactly one error event.
    async fn terminal(shared: &Arc<Shared>) {
        if Self::set_phase(shared, PlayerPhase::Failed).await.is_err() {
            return;
        }
        if let Ok(mut retry) = shared.retry.lock() {
            if let Some(timer) = retry.take() {
                timer.cancel();
            }
        }
        shared.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(mut binding) = shared.binding.lock().await.take() {
            binding.teardown().await;
        }
        shared.state.write().await.is_playing = false;
        shared.emit(PlayerEvent::Error);
        warn!(session_id = %shared.id, "All sources exhausted, session failed");
    }
}
