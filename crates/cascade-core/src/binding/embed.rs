//! Embedded-player binding
//!
//! Drives an [`EmbedBridge`] over the host-supplied message channel.
//! The embedded document owns the actual playback surface; this binding
//! only remote-controls it and translates its signals into the shared
//! binding event shape. Duration arrives with the first timeupdate, not
//! at ready.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BindingEvent, EventSink, MediaBinding};
use crate::bridge::{BridgeUpdate, EmbedBridge, EmbedChannel, InboundMessage};
use crate::error::{Error, Result};
use crate::types::{EmbedSource, SourceKind};

pub struct EmbedBinding {
    embed: EmbedSource,
    bridge: Arc<Mutex<EmbedBridge>>,
    inbound: Option<mpsc::UnboundedReceiver<InboundMessage>>,
    start_time: Option<f64>,
    ready_timeout_ms: u64,
    sink: EventSink,
    reader: Option<JoinHandle<()>>,
}

impl EmbedBinding {
    pub fn new(
        embed: EmbedSource,
        channel: EmbedChannel,
        start_time: Option<f64>,
        ready_timeout_ms: u64,
        sink: EventSink,
    ) -> Self {
        let bridge = EmbedBridge::new(channel.transport, embed.expected_origins());
        Self {
            embed,
            bridge: Arc::new(Mutex::new(bridge)),
            inbound: Some(channel.inbound),
            start_time,
            ready_timeout_ms,
            sink,
            reader: None,
        }
    }
}

fn forward(update: BridgeUpdate, sink: &EventSink) {
    let event = match update {
        BridgeUpdate::Ready => BindingEvent::Ready {
            duration: None,
            qualities: Vec::new(),
        },
        BridgeUpdate::Time { position, duration } => BindingEvent::TimeUpdate {
            position,
            duration: Some(duration),
        },
        BridgeUpdate::Play => BindingEvent::Play,
        BridgeUpdate::Pause => BindingEvent::Pause,
        BridgeUpdate::Ended => BindingEvent::Ended,
    };
    sink.emit(event);
}

/// Pump the inbound channel through the bridge for the binding lifetime.
async fn run_bridge(
    bridge: Arc<Mutex<EmbedBridge>>,
    mut inbound: mpsc::UnboundedReceiver<InboundMessage>,
    start_time: Option<f64>,
    ready_timeout: Duration,
    sink: EventSink,
) {
    // Phase 1: wait for the ready signal, bounded.
    let ready = tokio::time::timeout(ready_timeout, async {
        while let Some(msg) = inbound.recv().await {
            let update = bridge.lock().await.handle_message(&msg.origin, &msg.payload);
            if let Some(BridgeUpdate::Ready) = update {
                return true;
            }
        }
        false
    })
    .await;

    match ready {
        Ok(true) => {
            let handshake = bridge.lock().await.handshake(start_time);
            if let Err(e) = handshake {
                warn!(error = %e, "Embed handshake failed");
                sink.emit(BindingEvent::Failed(e));
                return;
            }
            forward(BridgeUpdate::Ready, &sink);
        }
        Ok(false) => {
            sink.emit(BindingEvent::Failed(Error::TransportClosed));
            return;
        }
        Err(_) => {
            sink.emit(BindingEvent::Failed(Error::EmbedReadyTimeout {
                timeout_ms: ready_timeout.as_millis() as u64,
            }));
            return;
        }
    }

    // Phase 2: translate playback signals until the channel closes or
    // the binding is torn down.
    while let Some(msg) = inbound.recv().await {
        let update = bridge.lock().await.handle_message(&msg.origin, &msg.payload);
        if let Some(update) = update {
            forward(update, &sink);
        }
    }
    debug!("Embed message channel closed");
}

#[async_trait]
impl MediaBinding for EmbedBinding {
    fn kind(&self) -> SourceKind {
        SourceKind::Embed
    }

    async fn load(&mut self) -> Result<()> {
        let inbound = self
            .inbound
            .take()
            .ok_or_else(|| Error::Internal("embed binding loaded twice".to_string()))?;

        debug!(url = %self.embed.url, provider = %self.embed.provider, "Starting embed bridge");

        let handle = tokio::spawn(run_bridge(
            self.bridge.clone(),
            inbound,
            self.start_time,
            Duration::from_millis(self.ready_timeout_ms),
            self.sink.clone(),
        ));
        self.reader = Some(handle);
        Ok(())
    }

    /// The embedded document owns its own play control; the protocol
    /// carries no play method, so this only acknowledges the toggle.
    async fn play(&mut self) -> Result<()> {
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        Ok(())
    }

    async fn seek(&mut self, seconds: f64) -> Result<()> {
        self.bridge.lock().await.set_current_time(seconds)
    }

    async fn teardown(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl Drop for EmbedBinding {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
