//! Quality levels derived from the adaptive-stream manifest
//!
//! The ladder is display-oriented: deduplicated by vertical resolution
//! (highest bandwidth wins), sorted descending, with a synthetic "Auto"
//! entry first. Pinning a level is the binding's business; "Auto"
//! clears the pin and resumes adaptive selection.

use serde::{Deserialize, Serialize};

/// One rendition as enumerated from the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    /// Display label, e.g. "720p" or "Auto"
    pub label: String,
    /// Vertical resolution; 0 for the synthetic Auto entry
    pub height: u32,
    /// Peak bandwidth in bits per second; 0 for Auto
    pub bandwidth: u64,
}

impl QualityLevel {
    pub fn auto() -> Self {
        Self {
            label: "Auto".to_string(),
            height: 0,
            bandwidth: 0,
        }
    }

    pub fn new(height: u32, bandwidth: u64) -> Self {
        Self {
            label: format!("{height}p"),
            height,
            bandwidth,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.height == 0
    }
}

/// Selection target passed to the active binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTarget {
    /// Clear any manual pin; the binding adapts freely
    Auto,
    /// Pin the level matching this vertical resolution
    Height(u32),
}

impl QualityTarget {
    /// Parse a display label back into a target. Unknown labels map to
    /// Auto rather than erroring; quality selection is never fatal.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("auto") {
            return QualityTarget::Auto;
        }
        match label.trim_end_matches('p').parse::<u32>() {
            Ok(height) => QualityTarget::Height(height),
            Err(_) => QualityTarget::Auto,
        }
    }
}

/// Heights shown when a manifest exposes zero levels. Display only;
/// selecting from this list has no binding effect until real levels
/// appear.
pub const DEFAULT_HEIGHTS: [u32; 5] = [1080, 720, 480, 360, 240];

/// Build the display ladder from raw (height, bandwidth) pairs.
///
/// Duplicate heights keep the highest-bandwidth variant. Output is
/// sorted descending by height with Auto prepended.
pub fn build_ladder(renditions: &[(u32, u64)]) -> Vec<QualityLevel> {
    let mut best: Vec<(u32, u64)> = Vec::new();
    for &(height, bandwidth) in renditions {
        if height == 0 {
            continue;
        }
        match best.iter_mut().find(|(h, _)| *h == height) {
            Some(entry) => entry.1 = entry.1.max(bandwidth),
            None => best.push((height, bandwidth)),
        }
    }
    best.sort_by(|a, b| b.0.cmp(&a.0));

    let mut ladder = vec![QualityLevel::auto()];
    ladder.extend(best.into_iter().map(|(h, b)| QualityLevel::new(h, b)));
    ladder
}

/// The fallback ladder for manifests that expose no levels.
pub fn default_ladder() -> Vec<QualityLevel> {
    let mut ladder = vec![QualityLevel::auto()];
    ladder.extend(DEFAULT_HEIGHTS.iter().map(|&h| QualityLevel::new(h, 0)));
    ladder
}

/// Initial selection policy: pin the lowest real level at or above
/// `min_height` to avoid a low-quality flash on good connections.
/// Returns Auto when no such level exists or the policy is disabled.
pub fn initial_target(ladder: &[QualityLevel], min_height: u32) -> QualityTarget {
    if min_height == 0 {
        return QualityTarget::Auto;
    }
    ladder
        .iter()
        .filter(|l| !l.is_auto() && l.height >= min_height)
        .map(|l| l.height)
        .min()
        .map(QualityTarget::Height)
        .unwrap_or(QualityTarget::Auto)
}
