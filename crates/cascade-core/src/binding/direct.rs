//! Direct progressive-file binding
//!
//! The engine never downloads the media payload itself; loading a
//! direct source means proving the file is reachable with a one-byte
//! ranged request and handing the URL to the renderer. Duration is
//! unknown until the renderer reports metadata.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::RANGE;
use tracing::{debug, instrument};
use url::Url;

use super::{BindingEvent, EventSink, MediaBinding};
use crate::error::{Error, Result};
use crate::types::{CrossOrigin, SourceKind};

pub struct DirectBinding {
    file_url: Url,
    cross_origin: Option<CrossOrigin>,
    client: Client,
    sink: EventSink,
    playing: bool,
}

impl DirectBinding {
    pub fn new(
        file_url: Url,
        cross_origin: Option<CrossOrigin>,
        client: Client,
        sink: EventSink,
    ) -> Self {
        Self {
            file_url,
            cross_origin,
            client,
            sink,
            playing: false,
        }
    }

    /// The crossorigin attribute the renderer should put on its media
    /// element. Only direct sources carry it; native adaptive playback
    /// skips the attribute (provider quirk).
    pub fn cross_origin_attr(&self) -> Option<&'static str> {
        self.cross_origin.map(|c| c.as_attr())
    }

    #[instrument(skip(self), fields(url = %self.file_url))]
    async fn probe(&self) -> Result<()> {
        let response = self
            .client
            .get(self.file_url.clone())
            .header(RANGE, "bytes=0-0")
            .send()
            .await?;
        let status = response.status();

        if status.is_client_error() {
            return Err(Error::SourceRejected {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(Error::ProbeFailed {
                url: self.file_url.to_string(),
            });
        }

        debug!(status = status.as_u16(), "Direct source reachable");
        Ok(())
    }
}

#[async_trait]
impl MediaBinding for DirectBinding {
    fn kind(&self) -> SourceKind {
        SourceKind::Direct
    }

    async fn load(&mut self) -> Result<()> {
        self.probe().await?;
        self.sink.emit(BindingEvent::Ready {
            duration: None,
            qualities: Vec::new(),
        });
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        self.playing = true;
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.playing = false;
        Ok(())
    }

    async fn seek(&mut self, _seconds: f64) -> Result<()> {
        // Byte-range seeking is the renderer's business.
        Ok(())
    }

    async fn teardown(&mut self) {
        self.playing = false;
    }
}
