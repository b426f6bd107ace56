//! Adaptive-stream (HLS) binding
//!
//! Loads the master playlist, derives the quality ladder, and fetches
//! the top variant's media playlist for duration and liveness. Errors
//! are classified for the failure router: transport failures are
//! network-class, playlist parse failures are media-class, and a 4xx
//! from the origin is fatal for this source.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{BindingEvent, EventSink, MediaBinding};
use crate::error::{Error, Result};
use crate::quality::{self, QualityLevel, QualityTarget};
use crate::types::SourceKind;

pub struct HlsBinding {
    manifest_url: Url,
    client: Client,
    sink: EventSink,
    ladder: Vec<QualityLevel>,
    pinned: QualityTarget,
    playing: bool,
}

impl HlsBinding {
    pub fn new(manifest_url: Url, client: Client, sink: EventSink) -> Self {
        Self {
            manifest_url,
            client,
            sink,
            ladder: Vec::new(),
            pinned: QualityTarget::Auto,
            playing: false,
        }
    }

    async fn fetch_playlist(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if status.is_client_error() {
            return Err(Error::ManifestRejected {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(Error::ManifestFetch(format!("HTTP {status} for {url}")));
        }

        Ok(response.text().await?)
    }

    /// Parse the master playlist into (height, bandwidth) pairs plus the
    /// URI of the highest-bandwidth variant.
    fn parse_master(&self, content: &str) -> Result<(Vec<(u32, u64)>, Option<String>)> {
        let master = m3u8_rs::parse_master_playlist_res(content.as_bytes())
            .map_err(|e| Error::ManifestParse(format!("not a master playlist: {e:?}")))?;

        let renditions: Vec<(u32, u64)> = master
            .variants
            .iter()
            .filter_map(|v| v.resolution.map(|r| (r.height as u32, v.bandwidth)))
            .collect();

        let top_variant = master
            .variants
            .iter()
            .max_by_key(|v| v.bandwidth)
            .map(|v| v.uri.clone());

        Ok((renditions, top_variant))
    }

    /// Duration from a VOD media playlist; live playlists have none.
    fn parse_duration(content: &str) -> Option<f64> {
        let media = m3u8_rs::parse_media_playlist_res(content.as_bytes()).ok()?;
        if !media.end_list {
            return None;
        }
        Some(media.segments.iter().map(|s| s.duration as f64).sum())
    }

    fn resolve_uri(&self, uri: &str) -> Result<Url> {
        self.manifest_url
            .join(uri)
            .map_err(|e| Error::ManifestParse(format!("unresolvable variant URI {uri}: {e}")))
    }

    #[instrument(skip(self), fields(url = %self.manifest_url))]
    async fn load_manifest(&mut self) -> Result<()> {
        let content = self.fetch_playlist(&self.manifest_url.clone()).await?;

        // Some stream hosts serve a media playlist directly, or a master
        // with no resolution-tagged variants. Display falls back to the
        // default ladder in that case; pinning is a no-op until real
        // levels appear.
        let (renditions, top_variant) = match self.parse_master(&content) {
            Ok(parsed) => parsed,
            Err(_) if content.contains("#EXTINF") => {
                debug!("Media playlist without variants, using default ladder");
                let duration = Self::parse_duration(&content);
                self.ladder = quality::default_ladder();
                self.sink.emit(BindingEvent::Ready {
                    duration,
                    qualities: self.ladder.clone(),
                });
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.ladder = if renditions.is_empty() {
            debug!("Manifest exposes zero levels, using default ladder");
            quality::default_ladder()
        } else {
            quality::build_ladder(&renditions)
        };

        let duration = match top_variant {
            Some(uri) => {
                let variant_url = self.resolve_uri(&uri)?;
                let variant = self.fetch_playlist(&variant_url).await?;
                Self::parse_duration(&variant)
            }
            None => None,
        };

        debug!(
            levels = self.ladder.len() - 1,
            duration = ?duration,
            "Manifest parsed"
        );

        self.sink.emit(BindingEvent::Ready {
            duration,
            qualities: self.ladder.clone(),
        });
        Ok(())
    }

    /// Whether a pin target matches a real level in the current ladder
    fn pin_has_effect(&self, target: QualityTarget) -> bool {
        match target {
            QualityTarget::Auto => true,
            QualityTarget::Height(h) => self
                .ladder
                .iter()
                .any(|l| !l.is_auto() && l.height == h && l.bandwidth > 0),
        }
    }
}

#[async_trait]
impl MediaBinding for HlsBinding {
    fn kind(&self) -> SourceKind {
        SourceKind::Hls
    }

    async fn load(&mut self) -> Result<()> {
        self.load_manifest().await
    }

    /// In-place media recovery: one fresh manifest load, the analog of
    /// an adaptive client's recoverMediaError path.
    async fn recover(&mut self) -> Result<()> {
        warn!(url = %self.manifest_url, "Attempting in-place manifest recovery");
        self.load_manifest().await
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
        // Segment-level seeking belongs to the renderer; nothing to do
        // at the manifest layer.
        Ok(())
    }

    fn supports_quality_selection(&self) -> bool {
        true
    }

    async fn set_quality(&mut self, target: QualityTarget) -> Result<()> {
        if !self.pin_has_effect(target) {
            debug!(?target, "Pin target not in ladder, ignoring");
            return Ok(());
        }
        self.pinned = target;
        debug!(?target, "Quality target applied");
        Ok(())
    }

    async fn teardown(&mut self) {
        self.playing = false;
        self.ladder.clear();
    }
}
