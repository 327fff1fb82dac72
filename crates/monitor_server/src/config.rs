//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize the dashboard and webhook listeners.

use monitor_events::StatsConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Default dashboard port; webhooks are received on the next port up.
pub const DEFAULT_DASHBOARD_PORT: u16 = 4000;

/// Configuration structure for the monitor server.
///
/// Contains the two listen addresses, subscriber queue sizing, the payments
/// platform settings and the statistics window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address of the dashboard listener (query endpoints and `/ws`)
    pub dashboard_address: SocketAddr,

    /// Address of the webhook listener (`POST /`)
    pub webhook_address: SocketAddr,

    /// Outbound messages buffered per subscriber before it is evicted
    pub subscriber_queue_capacity: usize,

    /// Maximum cached events; `None` keeps every event
    pub cache_max_events: Option<usize>,

    /// Payments platform settings
    pub platform: PlatformConfig,

    /// Statistics window settings
    pub stats: StatsConfig,
}

/// Settings for talking to and trusting the payments platform.
#[derive(Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Secret API key; decides test/live mode and authenticates the event list
    pub api_key: Option<String>,

    /// Webhook signing secret; `None` runs the webhook listener in insecure mode
    pub signing_secret: Option<String>,

    /// Base URL of the platform REST API
    pub api_base_url: String,

    /// Base URL of the platform dashboard
    pub dashboard_base_url: String,

    /// Prefix that marks an API key as a test-mode key
    pub test_key_prefix: String,

    /// Name of the HTTP header carrying the webhook signature
    pub signature_header: String,

    /// Maximum age of a signed webhook in seconds
    pub signature_tolerance_secs: u64,

    /// Events returned by `/recent-events`
    pub recent_events_limit: usize,

    /// Timeout for platform API requests in seconds
    pub request_timeout_secs: u64,
}

impl PlatformConfig {
    /// Dashboard URL for the configured key; test keys get the `test/` path.
    pub fn dashboard_url(&self) -> String {
        let base = if self.dashboard_base_url.ends_with('/') {
            self.dashboard_base_url.clone()
        } else {
            format!("{}/", self.dashboard_base_url)
        };

        match &self.api_key {
            Some(key) if key.starts_with(&self.test_key_prefix) => format!("{base}test/"),
            _ => base,
        }
    }

    /// Replay tolerance as a `Duration`.
    pub fn signature_tolerance(&self) -> Duration {
        Duration::from_secs(self.signature_tolerance_secs)
    }

    /// Platform request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("PlatformConfig")
            .field("api_key", &redact(&self.api_key))
            .field("signing_secret", &redact(&self.signing_secret))
            .field("api_base_url", &self.api_base_url)
            .field("dashboard_base_url", &self.dashboard_base_url)
            .field("test_key_prefix", &self.test_key_prefix)
            .field("signature_header", &self.signature_header)
            .field("signature_tolerance_secs", &self.signature_tolerance_secs)
            .field("recent_events_limit", &self.recent_events_limit)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dashboard_address: SocketAddr::from(([127, 0, 0, 1], DEFAULT_DASHBOARD_PORT)),
            webhook_address: SocketAddr::from(([127, 0, 0, 1], DEFAULT_DASHBOARD_PORT + 1)),
            subscriber_queue_capacity: 1024,
            cache_max_events: None,
            platform: PlatformConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            signing_secret: None,
            api_base_url: "https://api.stripe.com/v1".to_string(),
            dashboard_base_url: "https://dashboard.stripe.com/".to_string(),
            test_key_prefix: "sk_test".to_string(),
            signature_header: "stripe-signature".to_string(),
            signature_tolerance_secs: 300,
            recent_events_limit: 20,
            request_timeout_secs: 10,
        }
    }
}
