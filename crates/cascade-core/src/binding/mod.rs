//! Media bindings
//!
//! One binding is active per source attempt. Bindings translate their
//! delivery mechanism (HLS client, embedded-player bridge, direct file)
//! into a shared event shape, so the session and the control surface
//! stay provider-agnostic. Every event is stamped with the session
//! epoch that created the binding; the session discards stale epochs
//! after a teardown.

mod direct;
mod embed;
mod hls;

pub use direct::DirectBinding;
pub use embed::EmbedBinding;
pub use hls::HlsBinding;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bridge::TransportFactory;
use crate::error::{Error, Result};
use crate::quality::{QualityLevel, QualityTarget};
use crate::types::{PlayerConfig, SourceKind, SourceSet};

/// Event from the active binding
#[derive(Debug)]
pub enum BindingEvent {
    /// Metadata is available; playback can begin
    Ready {
        duration: Option<f64>,
        qualities: Vec<QualityLevel>,
    },
    /// Position report from a binding that drives its own clock
    TimeUpdate { position: f64, duration: Option<f64> },
    Play,
    Pause,
    Ended,
    /// The binding gave up; the session routes this through the
    /// retry/fallback machinery
    Failed(Error),
}

/// Envelope stamping each event with its originating epoch
#[derive(Debug)]
pub struct BindingEnvelope {
    pub epoch: u64,
    pub event: BindingEvent,
}

/// Sink a binding emits events into, pre-stamped with its epoch
#[derive(Clone)]
pub struct EventSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<BindingEnvelope>,
}

impl EventSink {
    pub fn new(epoch: u64, tx: mpsc::UnboundedSender<BindingEnvelope>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Best-effort emit; a closed channel means the session is gone and
    /// the event is moot.
    pub fn emit(&self, event: BindingEvent) {
        let _ = self.tx.send(BindingEnvelope {
            epoch: self.epoch,
            event,
        });
    }
}

/// One active delivery mechanism
#[async_trait]
pub trait MediaBinding: Send {
    fn kind(&self) -> SourceKind;

    /// Begin the load sequence. Immediate failures are returned;
    /// asynchronous ones arrive as [`BindingEvent::Failed`].
    async fn load(&mut self) -> Result<()>;

    /// One in-place recovery attempt for media-class errors. Bindings
    /// without a native recovery path report failure and the session
    /// falls back.
    async fn recover(&mut self) -> Result<()> {
        Err(Error::MediaDecode("no in-place recovery path".to_string()))
    }

    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    async fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Volume/mute forwarding; a no-op where the mechanism has no hook
    async fn set_volume(&mut self, _volume: f64, _muted: bool) -> Result<()> {
        Ok(())
    }

    /// Playback-rate forwarding; a no-op where unsupported
    async fn set_rate(&mut self, _rate: f64) -> Result<()> {
        Ok(())
    }

    fn supports_quality_selection(&self) -> bool {
        false
    }

    /// Pin or unpin a quality level; a no-op where unsupported
    async fn set_quality(&mut self, _target: QualityTarget) -> Result<()> {
        Ok(())
    }

    /// Release everything. After this returns no further events may be
    /// observed from this binding (stale in-flight ones are dropped by
    /// the epoch guard).
    async fn teardown(&mut self);
}

/// Creates the binding for a selected source. The seam the tests use to
/// inject scripted bindings.
pub trait BindingFactory: Send + Sync {
    fn create(
        &self,
        kind: SourceKind,
        sources: &SourceSet,
        config: &PlayerConfig,
        sink: EventSink,
    ) -> Result<Box<dyn MediaBinding>>;
}

/// Production factory: HTTP-backed HLS and direct bindings, plus the
/// embed binding when the host wired a message transport.
pub struct HttpBindingFactory {
    client: reqwest::Client,
    transports: Option<Arc<dyn TransportFactory>>,
}

impl HttpBindingFactory {
    pub fn new(config: &PlayerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            transports: None,
        })
    }

    /// Wire the host's postMessage glue so embed sources are playable
    pub fn with_transports(mut self, transports: Arc<dyn TransportFactory>) -> Self {
        self.transports = Some(transports);
        self
    }
}

impl BindingFactory for HttpBindingFactory {
    fn create(
        &self,
        kind: SourceKind,
        sources: &SourceSet,
        config: &PlayerConfig,
        sink: EventSink,
    ) -> Result<Box<dyn MediaBinding>> {
        match kind {
            SourceKind::Hls => {
                let url = sources.hls.clone().ok_or(Error::NoSource)?;
                Ok(Box::new(HlsBinding::new(url, self.client.clone(), sink)))
            }
            SourceKind::Direct => {
                let url = sources.direct.clone().ok_or(Error::NoSource)?;
                Ok(Box::new(DirectBinding::new(
                    url,
                    sources.cross_origin,
                    self.client.clone(),
                    sink,
                )))
            }
            SourceKind::Embed => {
                let embed = sources.embed.clone().ok_or(Error::NoSource)?;
                let transports = self.transports.as_ref().ok_or_else(|| {
                    Error::InvalidConfig("no embed message transport configured".to_string())
                })?;
                let channel = transports.connect(&embed)?;
                Ok(Box::new(EmbedBinding::new(
                    embed,
                    channel,
                    sources.start_time,
                    config.embed_ready_timeout_ms,
                    sink,
                )))
            }
        }
    }
}
