//! # Monitor Server - Webhook Ingestion and Live Dashboard Feed
//!
//! The networking half of the webhook monitor. It receives signed webhook
//! deliveries from the payments platform on one port and serves the
//! dashboard API plus a real-time WebSocket feed on another.
//!
//! ## Architecture Overview
//!
//! ### Core Components
//!
//! * **Monitor Store** - Cache, statistics and pause state (from `monitor_events`)
//! * **Subscriber Hub** - Bounded per-subscriber queues and best-effort fan-out
//! * **Webhook Router** - `POST /`: verify, normalize, distribute, acknowledge
//! * **Dashboard Router** - Query endpoints, pause controls and `/ws`
//! * **Platform Client** - The platform's own recent-event list
//!
//! ### Message Flow
//!
//! 1. The platform POSTs an event with a signature header
//! 2. The verifier checks the HMAC and the replay window, then normalizes
//! 3. The store caches and counts the event (or queues it while paused)
//! 4. The hub pushes `{"kind":"event","data":...}` to every subscriber
//! 5. The server answers `200`; any verification failure answers `400`
//!
//! Every stats interval the ticker closes a sample and the hub pushes
//! `{"kind":"stats","data":...}`.
//!
//! ## Error Handling
//!
//! * [`ServerError`] - bind and serve failures; fatal only at startup
//! * [`UpstreamError`] - platform API failures; surfaced as `502`
//!
//! ## Thread Safety
//!
//! * The store serializes ingest, tick and pause toggles behind one mutex
//! * The hub uses `DashMap` so subscribers come and go during broadcasts
//! * Broadcasts never wait on a subscriber's socket

// Re-export core types and functions for easy access
pub use config::{PlatformConfig, ServerConfig, DEFAULT_DASHBOARD_PORT};
pub use connection::{ConnectionId, SubscriberHub};
pub use error::{ServerError, UpstreamError};
pub use messaging::{ControlReply, ResumeResponse, SubscriberCommand};
pub use server::{BoundServer, MonitorServer, MonitorState};
pub use upstream::{EventSource, PlatformClient};
pub use utils::{create_server, create_server_with_config};

// Public module declarations
pub mod config;
pub mod connection;
pub mod error;
pub mod messaging;
pub mod server;
pub mod upstream;
pub mod utils;

// Internal modules (not part of public API)
mod tests;
