//! Embedded-player message bridge
//!
//! Providers controlled via an embedded document speak a small JSON
//! protocol over a shared message channel. The transport is injected:
//! production wires the host's postMessage glue, tests use an in-memory
//! fake. Incoming traffic is filtered by origin before parsing, and
//! non-JSON or unrelated messages on the shared channel are ignored.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::types::EmbedSource;

/// Outbound remote-control methods
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum OutboundMethod {
    GetDuration,
    SetCurrentTime { value: f64 },
    AddEventListener { value: EmbedEventName },
}

/// Event names the bridge subscribes to after the ready signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedEventName {
    Timeupdate,
    Play,
    Pause,
    Ended,
}

const SUBSCRIBED_EVENTS: [EmbedEventName; 4] = [
    EmbedEventName::Timeupdate,
    EmbedEventName::Play,
    EmbedEventName::Pause,
    EmbedEventName::Ended,
];

/// Inbound messages from the embedded player
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum InboundEvent {
    Ready,
    Timeupdate { data: TimeUpdateData },
    Play,
    Pause,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
struct TimeUpdateData {
    seconds: f64,
    duration: f64,
}

/// Provider-agnostic translation of an accepted inbound message
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeUpdate {
    Ready,
    Time { position: f64, duration: f64 },
    Play,
    Pause,
    Ended,
}

/// Outbound half of the message channel. Production implementations
/// deliver to the embedded document; tests record the payloads.
pub trait MessageTransport: Send + Sync {
    fn post(&self, payload: &str) -> Result<()>;
}

/// One raw message received on the shared channel, origin included
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub origin: String,
    pub payload: String,
}

/// Both halves of an embed connection, as wired by the host
pub struct EmbedChannel {
    pub transport: Box<dyn MessageTransport>,
    pub inbound: mpsc::UnboundedReceiver<InboundMessage>,
}

/// Connects message channels to embedded player documents
pub trait TransportFactory: Send + Sync {
    fn connect(&self, embed: &EmbedSource) -> Result<EmbedChannel>;
}

/// Remote control for one embedded player document
pub struct EmbedBridge {
    transport: Box<dyn MessageTransport>,
    expected_origins: Vec<String>,
    ready: bool,
}

impl EmbedBridge {
    pub fn new(transport: Box<dyn MessageTransport>, expected_origins: Vec<String>) -> Self {
        Self {
            transport,
            expected_origins,
            ready: false,
        }
    }

    /// Has the embedded player signalled ready
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Process one raw message from the shared channel.
    ///
    /// Returns `None` for messages from unexpected origins and for
    /// payloads that are not this protocol; the shared channel carries
    /// unrelated traffic and that is never an error.
    pub fn handle_message(&mut self, origin: &str, payload: &str) -> Option<BridgeUpdate> {
        if !self.expected_origins.iter().any(|f| origin.contains(f)) {
            trace!(origin, "Discarding message from unexpected origin");
            return None;
        }

        let event: InboundEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(_) => {
                trace!("Discarding non-protocol message");
                return None;
            }
        };

        Some(match event {
            InboundEvent::Ready => {
                self.ready = true;
                debug!("Embedded player ready");
                BridgeUpdate::Ready
            }
            InboundEvent::Timeupdate { data } => BridgeUpdate::Time {
                position: data.seconds,
                duration: data.duration,
            },
            InboundEvent::Play => BridgeUpdate::Play,
            InboundEvent::Pause => BridgeUpdate::Pause,
            InboundEvent::Ended => BridgeUpdate::Ended,
        })
    }

    /// After the ready signal: request duration, apply the start offset
    /// if the host asked for one, and subscribe to playback events.
    pub fn handshake(&self, start_time: Option<f64>) -> Result<()> {
        self.send(&OutboundMethod::GetDuration)?;
        if let Some(seconds) = start_time {
            self.send(&OutboundMethod::SetCurrentTime { value: seconds })?;
        }
        for event in SUBSCRIBED_EVENTS {
            self.send(&OutboundMethod::AddEventListener { value: event })?;
        }
        Ok(())
    }

    pub fn set_current_time(&self, seconds: f64) -> Result<()> {
        self.send(&OutboundMethod::SetCurrentTime { value: seconds })
    }

    pub fn send(&self, method: &OutboundMethod) -> Result<()> {
        let payload = serde_json::to_string(method)
            .map_err(|e| Error::Internal(format!("Failed to encode bridge message: {e}")))?;
        self.transport.post(&payload)
    }
}
