//! Error types for Cascade Core

use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// How the failure router should treat an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Transient network failure, retried in place with backoff
    Network,
    /// Media pipeline failure, one in-place recovery then fallback
    Media,
    /// Nothing to retry, fall back (or terminate) immediately
    Fatal,
}

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Manifest errors
    #[error("Failed to fetch manifest: {0}")]
    ManifestFetch(String),

    #[error("Failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("Manifest rejected by server: HTTP {status}")]
    ManifestRejected { status: u16 },

    // Direct source errors
    #[error("Source probe failed: {url}")]
    ProbeFailed { url: String },

    #[error("Source rejected by server: HTTP {status}")]
    SourceRejected { status: u16 },

    // Embed errors
    #[error("Embedded player did not signal ready within {timeout_ms}ms")]
    EmbedReadyTimeout { timeout_ms: u64 },

    #[error("Embedded player reported failure: {0}")]
    EmbedFailure(String),

    #[error("Message transport closed")]
    TransportClosed,

    // Source selection errors
    #[error("No usable source supplied for provider {provider}")]
    SourceUnavailable { provider: String },

    #[error("No source supplied")]
    NoSource,

    #[error("All supplied sources exhausted")]
    SourcesExhausted,

    // Playback errors
    #[error("Invalid playback state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Media decode failure: {0}")]
    MediaDecode(String),

    #[error("Session is unmounted")]
    Unmounted,

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classification used by the retry scheduler and fallback router
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::ManifestFetch(_)
            | Error::ProbeFailed { .. }
            | Error::EmbedReadyTimeout { .. }
            | Error::Network(_) => ErrorClass::Network,

            Error::ManifestParse(_) | Error::MediaDecode(_) | Error::EmbedFailure(_) => {
                ErrorClass::Media
            }

            Error::ManifestRejected { .. }
            | Error::SourceRejected { .. }
            | Error::TransportClosed
            | Error::SourceUnavailable { .. }
            | Error::NoSource
            | Error::SourcesExhausted
            | Error::InvalidStateTransition { .. }
            | Error::Unmounted
            | Error::InvalidConfig(_)
            | Error::Internal(_) => ErrorClass::Fatal,
        }
    }

    /// True when the failure router should skip fallback entirely
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::SourceUnavailable { .. } | Error::NoSource | Error::SourcesExhausted
        )
    }

    /// Short code for logs
    pub fn code(&self) -> &'static str {
        match self {
            Error::ManifestFetch(_) => "MANIFEST_FETCH",
            Error::ManifestParse(_) => "MANIFEST_PARSE",
            Error::ManifestRejected { .. } => "MANIFEST_REJECTED",
            Error::ProbeFailed { .. } => "PROBE_FAILED",
            Error::SourceRejected { .. } => "SOURCE_REJECTED",
            Error::EmbedReadyTimeout { .. } => "EMBED_READY_TIMEOUT",
            Error::EmbedFailure(_) => "EMBED_FAILURE",
            Error::TransportClosed => "TRANSPORT_CLOSED",
            Error::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            Error::NoSource => "NO_SOURCE",
            Error::SourcesExhausted => "SOURCES_EXHAUSTED",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::MediaDecode(_) => "MEDIA_DECODE",
            Error::Unmounted => "UNMOUNTED",
            Error::Network(_) => "NETWORK",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Internal(_) => "INTERNAL",
        }
    }
}
