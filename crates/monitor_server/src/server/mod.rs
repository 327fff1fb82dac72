//! Core server implementation and request handling.
//!
//! This module contains the main monitor server structure and the handlers
//! for webhook deliveries, dashboard queries and live subscribers.

pub mod core;
pub mod handlers;

pub use core::{spawn_stats_ticker, BoundServer, MonitorServer};
pub use handlers::{dashboard_router, webhook_router, MonitorState};
