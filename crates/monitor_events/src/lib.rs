//! # Monitor Events
//!
//! Core of the webhook monitor: everything that happens to a payments-platform
//! event between "the HTTP body arrived" and "subscribers were told about it".
//! This crate has no networking of its own; the server crate drives it.
//!
//! ## Core Features
//!
//! - **Signature Verification**: HMAC-SHA256 over `"{timestamp}.{body}"` with
//!   a replay tolerance, or an explicit insecure mode
//! - **Event Normalization**: validated [`Event`] values with stable accessors
//! - **Recent-Event Cache**: newest-first history for the dashboard
//! - **Sliding-Window Statistics**: per-interval counts per event type
//! - **Pause/Resume**: queued events are delivered in arrival order
//!
//! ## Architecture Overview
//!
//! [`MonitorStore`] owns the cache, the [`StatsAggregator`] and the pause
//! state behind one lock. Accepted events and new samples leave the store as
//! [`HubMessage`]s through the [`Broadcaster`] trait, which the server crate
//! implements with its subscriber hub.
//!
//! ## Quick Start Example
//!
//! ```rust,no_run
//! use monitor_events::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), WebhookError> {
//!     let verifier = SignatureVerifier::new("whsec_test");
//!     let store = MonitorStore::new(
//!         RecentEventCache::unbounded(),
//!         StatsConfig::default(),
//!         Arc::new(NullBroadcaster),
//!     );
//!     store.initialize_stats(current_timestamp_millis()).await;
//!
//!     let body = br#"{"id":"evt_1","type":"charge.succeeded","created":1,"data":{"object":{}}}"#;
//!     let header = signature_header(b"whsec_test", current_timestamp() as i64, body);
//!     let event = verifier.verify(body, Some(&header))?;
//!     store.ingest(event).await;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod cache;
pub mod error;
pub mod event;
pub mod palette;
pub mod shutdown;
pub mod signature;
pub mod stats;
pub mod store;
pub mod utils;

pub use broadcast::{Broadcaster, HubMessage, NullBroadcaster};
pub use cache::RecentEventCache;
pub use error::{WebhookError, WebhookResult};
pub use event::{Event, PING_EVENT_TYPE};
pub use palette::{color_for, EVENT_COLORS};
pub use shutdown::ShutdownState;
pub use signature::{compute_signature, signature_header, SignatureHeader, SignatureVerifier};
pub use stats::{
    EventTypeSummary, PausedTickPolicy, StatsAggregator, StatsConfig, StatsSample,
    DEFAULT_INTERVAL_MS, DEFAULT_MAX_EVENT_COUNT,
};
pub use store::{IngestOutcome, MonitorStore, PauseState, PauseStatus};
pub use utils::{current_timestamp, current_timestamp_millis};

pub use std::sync::Arc;

/// Returns build info string with the crate version.
pub fn monitor_build_info() -> String {
    format!("Monitor Events v{}", env!("CARGO_PKG_VERSION"))
}
