//! Cascade Core - Adaptive Video Source Player
//!
//! This crate provides the core logic for resilient playback across
//! multiple delivery mechanisms for the same content:
//! - Source selection across HLS, embedded player, and direct file
//! - Failure classification with in-place retry and cross-source fallback
//! - HLS manifest parsing and quality ladder construction
//! - Message bridge for provider-hosted embedded players
//! - Unified playback controls over heterogeneous sources
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Cascade Core                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐          │
//! │  │    Source    │  │    Retry     │  │   Quality    │          │
//! │  │   Selector   │  │  Scheduler   │  │  Controller  │          │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘          │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Player    │                              │
//! │                    │   Session   │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────────────┐           │
//! │  │     HLS      │  │    Embed    │  │    Direct    │           │
//! │  │   Binding    │  │   Binding   │  │   Binding    │           │
//! │  └──────────────┘  └──────┬──────┘  └──────────────┘           │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Message   │                              │
//! │                    │   Bridge    │                              │
//! │                    └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod source;
pub mod retry;
pub mod quality;
pub mod bridge;
pub mod binding;
pub mod controls;
pub mod session;

pub use error::{Error, ErrorClass, Result};
pub use types::*;
pub use source::{next_fallback, select_initial};
pub use quality::{QualityLevel, QualityTarget};
pub use bridge::{BridgeUpdate, EmbedBridge, MessageTransport, TransportFactory};
pub use binding::{BindingFactory, HttpBindingFactory, MediaBinding};
pub use controls::{ChromePolicy, ControlAction, PLAYBACK_RATES};
pub use session::{PlayerEvent, PlayerSession};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the player library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Cascade Core initialized");
}
