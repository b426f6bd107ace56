//! Core types for Cascade

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Unique identifier for a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery mechanism for one logical video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Adaptive-bitrate stream manifest (HLS)
    Hls,
    /// Embeddable third-party player document
    Embed,
    /// Direct progressive file URL
    Direct,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Hls => write!(f, "hls"),
            SourceKind::Embed => write!(f, "embed"),
            SourceKind::Direct => write!(f, "direct"),
        }
    }
}

/// Embed provider, inferred from the embed URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Terms require the official embed; other sources are never attempted
    Vimeo,
    /// Publishes manifests only; its embed is not a valid playback path
    CloudflareStream,
    Generic,
}

impl Provider {
    /// Infer provider from URL substring, matching the host integration
    pub fn infer(url: &Url) -> Self {
        let s = url.as_str();
        if s.contains("vimeo.com") {
            Provider::Vimeo
        } else if s.contains("cloudflarestream.com") || s.contains("videodelivery.net") {
            Provider::CloudflareStream
        } else {
            Provider::Generic
        }
    }

    /// Playback must go through the official embed for this provider
    pub fn requires_embed(&self) -> bool {
        matches!(self, Provider::Vimeo)
    }

    /// Only the adaptive stream is a valid playback path for this provider
    pub fn manifest_only(&self) -> bool {
        matches!(self, Provider::CloudflareStream)
    }

    /// Domain fragments accepted in message origins from this provider.
    /// Mirrors [`Provider::infer`]: every domain a provider serves from
    /// is a valid message origin.
    pub fn origin_fragments(&self) -> &'static [&'static str] {
        match self {
            Provider::Vimeo => &["vimeo.com"],
            Provider::CloudflareStream => &["cloudflarestream.com", "videodelivery.net"],
            Provider::Generic => &[],
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Vimeo => write!(f, "vimeo"),
            Provider::CloudflareStream => write!(f, "cloudflare-stream"),
            Provider::Generic => write!(f, "generic"),
        }
    }
}

/// CORS attribute forwarded to the native media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossOrigin {
    Anonymous,
    UseCredentials,
}

impl CrossOrigin {
    pub fn as_attr(&self) -> &'static str {
        match self {
            CrossOrigin::Anonymous => "anonymous",
            CrossOrigin::UseCredentials => "use-credentials",
        }
    }
}

/// An embeddable player document with its inferred provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedSource {
    pub url: Url,
    pub provider: Provider,
}

impl EmbedSource {
    pub fn new(url: Url) -> Self {
        let provider = Provider::infer(&url);
        Self { url, provider }
    }

    /// Fragments a message origin may contain to be accepted; generic
    /// providers accept the embed URL's own host
    pub fn expected_origins(&self) -> Vec<String> {
        let fragments = self.provider.origin_fragments();
        if fragments.is_empty() {
            vec![self.url.host_str().unwrap_or_default().to_string()]
        } else {
            fragments.iter().map(|f| f.to_string()).collect()
        }
    }
}

/// The source descriptors supplied by the host at mount. Immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSet {
    /// Adaptive-stream manifest URL
    pub hls: Option<Url>,
    /// Embeddable player URL with inferred provider
    pub embed: Option<EmbedSource>,
    /// Direct progressive file URL
    pub direct: Option<Url>,
    /// Seconds to seek to once metadata/ready is available
    pub start_time: Option<f64>,
    /// CORS attribute for natively-bound sources
    pub cross_origin: Option<CrossOrigin>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hls(mut self, url: Url) -> Self {
        self.hls = Some(url);
        self
    }

    pub fn with_embed(mut self, url: Url) -> Self {
        self.embed = Some(EmbedSource::new(url));
        self
    }

    pub fn with_direct(mut self, url: Url) -> Self {
        self.direct = Some(url);
        self
    }

    pub fn with_start_time(mut self, seconds: f64) -> Self {
        self.start_time = Some(seconds.max(0.0));
        self
    }

    pub fn with_cross_origin(mut self, cross_origin: CrossOrigin) -> Self {
        self.cross_origin = Some(cross_origin);
        self
    }

    /// Did the host supply this delivery mechanism
    pub fn supplies(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Hls => self.hls.is_some(),
            SourceKind::Embed => self.embed.is_some(),
            SourceKind::Direct => self.direct.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hls.is_none() && self.embed.is_none() && self.direct.is_none()
    }

    /// Provider governing the selection rules; Generic when no embed
    pub fn provider(&self) -> Provider {
        self.embed
            .as_ref()
            .map(|e| e.provider)
            .unwrap_or(Provider::Generic)
    }
}

/// Player state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PlayerPhase {
    /// Initial state, choosing the first source
    Selecting,
    /// A source binding is loading; `attempt` counts in-place retries
    Loading { source: SourceKind, attempt: u32 },
    /// Content is playing
    Playing { source: SourceKind },
    /// Playback paused
    Paused { source: SourceKind },
    /// Playback completed naturally
    Ended,
    /// All recovery exhausted; terminal
    Failed,
}

impl PlayerPhase {
    /// Source the phase is bound to, if any
    pub fn source(&self) -> Option<SourceKind> {
        match self {
            PlayerPhase::Loading { source, .. }
            | PlayerPhase::Playing { source }
            | PlayerPhase::Paused { source } => Some(*source),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayerPhase::Ended | PlayerPhase::Failed)
    }

    /// Check if transition to target phase is valid
    pub fn can_transition_to(&self, target: &PlayerPhase) -> bool {
        use PlayerPhase::*;
        matches!(
            (self, target),
            // From Selecting
            (Selecting, Loading { .. }) | (Selecting, Failed) |
            // From Loading: retry/fallback re-enter Loading
            (Loading { .. }, Loading { .. }) | (Loading { .. }, Playing { .. }) |
            (Loading { .. }, Paused { .. }) | (Loading { .. }, Failed) |
            // From Playing
            (Playing { .. }, Paused { .. }) | (Playing { .. }, Loading { .. }) |
            (Playing { .. }, Ended) | (Playing { .. }, Failed) |
            // From Paused
            (Paused { .. }, Playing { .. }) | (Paused { .. }, Loading { .. }) |
            (Paused { .. }, Failed)
        )
    }
}

impl std::fmt::Display for PlayerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerPhase::Selecting => write!(f, "selecting"),
            PlayerPhase::Loading { source, attempt } => {
                write!(f, "loading({source}, attempt {attempt})")
            }
            PlayerPhase::Playing { source } => write!(f, "playing({source})"),
            PlayerPhase::Paused { source } => write!(f, "paused({source})"),
            PlayerPhase::Ended => write!(f, "ended"),
            PlayerPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Playback state read by the control surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Current position in seconds
    pub position: f64,
    /// Duration in seconds, once known
    pub duration: Option<f64>,
    /// Volume in [0, 1]
    pub volume: f64,
    pub is_muted: bool,
    pub playback_rate: f64,
    /// Label of the active quality level ("Auto" unless pinned)
    pub quality_label: String,
    pub is_fullscreen: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            position: 0.0,
            duration: None,
            volume: 1.0,
            is_muted: false,
            playback_rate: 1.0,
            quality_label: "Auto".to_string(),
            is_fullscreen: false,
        }
    }
}

impl PlaybackState {
    /// Played fraction as a percentage, when duration is known
    pub fn progress_percent(&self) -> Option<f64> {
        match self.duration {
            Some(d) if d > 0.0 => Some((self.position / d * 100.0).clamp(0.0, 100.0)),
            _ => None,
        }
    }
}

/// Player configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Base retry delay in milliseconds
    pub retry_base_delay_ms: u64,
    /// Backoff cap in milliseconds
    pub retry_max_delay_ms: u64,
    /// In-place retries per source activation
    pub max_retries: u32,
    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// How long to wait for an embedded player's ready signal
    pub embed_ready_timeout_ms: u64,
    /// Pin the first level at or above this height on manifest parse (0 disables)
    pub preferred_min_height: u32,
    /// Control chrome auto-hide timeout while playing, in milliseconds
    pub chrome_idle_timeout_ms: u64,
    /// Skip-by-offset step in seconds
    pub skip_offset_secs: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 10000,
            max_retries: 3,
            request_timeout_ms: 10000,
            embed_ready_timeout_ms: 8000,
            preferred_min_height: 720,
            chrome_idle_timeout_ms: 3000,
            skip_offset_secs: 10.0,
        }
    }
}
