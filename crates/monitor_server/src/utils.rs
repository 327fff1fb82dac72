//! Utility functions and helper methods for the monitor server.
//!
//! This module provides convenient factory functions for creating server
//! instances with different configurations.

use crate::{config::ServerConfig, error::ServerError, server::MonitorServer};

/// Creates a new monitor server with default configuration.
///
/// Defaults listen on `127.0.0.1:4000` (dashboard) and `127.0.0.1:4001`
/// (webhooks) with no signing secret.
///
/// # Example
///
/// ```rust
/// use monitor_server::create_server;
///
/// let server = create_server().unwrap();
/// assert_eq!(server.config().dashboard_address.port(), 4000);
/// ```
pub fn create_server() -> Result<MonitorServer, ServerError> {
    MonitorServer::new(ServerConfig::default())
}

/// Creates a new monitor server with custom configuration.
///
/// # Example
///
/// ```rust
/// use monitor_server::{create_server_with_config, ServerConfig};
///
/// let config = ServerConfig {
///     dashboard_address: "0.0.0.0:9000".parse().unwrap(),
///     webhook_address: "0.0.0.0:9001".parse().unwrap(),
///     subscriber_queue_capacity: 64,
///     ..Default::default()
/// };
///
/// let server = create_server_with_config(config).unwrap();
/// ```
pub fn create_server_with_config(config: ServerConfig) -> Result<MonitorServer, ServerError> {
    MonitorServer::new(config)
}
