//! Configuration management for the webhook monitor.
//!
//! This module handles loading, validation, and conversion of the monitor
//! configuration from TOML files, environment variables and command-line
//! arguments.

use monitor_events::{PausedTickPolicy, StatsConfig, DEFAULT_INTERVAL_MS, DEFAULT_MAX_EVENT_COUNT};
use monitor_server::{PlatformConfig, ServerConfig, DEFAULT_DASHBOARD_PORT};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tracing::info;

/// Environment variable overriding `platform.api_key`.
pub const API_KEY_ENV: &str = "MONITOR_API_KEY";

/// Environment variable overriding `platform.signing_secret`.
pub const SIGNING_SECRET_ENV: &str = "MONITOR_SIGNING_SECRET";

/// Log levels accepted by `logging.level` and `--log-level`.
pub const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Largest page the platform's list endpoint accepts.
const MAX_RECENT_EVENTS_LIMIT: usize = 100;

/// Application configuration loaded from TOML file.
///
/// Every section is optional in the file; missing sections and fields take
/// their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listener settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Payments platform settings
    #[serde(default)]
    pub platform: PlatformSettings,
    /// Statistics window settings
    #[serde(default)]
    pub stats: StatsSettings,
    /// Recent-event cache settings
    #[serde(default)]
    pub cache: CacheSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address both listeners bind to
    pub host: String,
    /// Dashboard port
    pub port: u16,
    /// Webhook port; `port + 1` when unset
    pub webhook_port: Option<u16>,
    /// Messages buffered per subscriber before it is evicted
    pub subscriber_queue_capacity: usize,
}

/// Payments platform configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    /// Secret API key
    pub api_key: Option<String>,
    /// Webhook signing secret; unset runs in insecure mode
    pub signing_secret: Option<String>,
    /// REST API base URL
    pub api_base_url: String,
    /// Dashboard base URL
    pub dashboard_base_url: String,
    /// Prefix of test-mode API keys
    pub test_key_prefix: String,
    /// Header carrying the webhook signature
    pub signature_header: String,
    /// Maximum age of a signed webhook in seconds
    pub signature_tolerance_secs: u64,
    /// Events returned by `/recent-events`
    pub recent_events_limit: usize,
    /// Platform API timeout in seconds
    pub request_timeout_secs: u64,
}

/// Statistics window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSettings {
    /// Samples kept in the window
    pub max_event_count: usize,
    /// Tick interval in milliseconds
    pub interval_ms: u64,
    /// `zero_fill` keeps ticking while paused, `suspend` freezes the window
    pub paused_tick_policy: PausedTickPolicy,
}

/// Recent-event cache configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum cached events; unset keeps every event
    pub max_events: Option<usize>,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_DASHBOARD_PORT,
            webhook_port: None,
            subscriber_queue_capacity: 1024,
        }
    }
}

impl Default for PlatformSettings {
    fn default() -> Self {
        let platform = PlatformConfig::default();
        Self {
            api_key: None,
            signing_secret: None,
            api_base_url: platform.api_base_url,
            dashboard_base_url: platform.dashboard_base_url,
            test_key_prefix: platform.test_key_prefix,
            signature_header: platform.signature_header,
            signature_tolerance_secs: platform.signature_tolerance_secs,
            recent_events_limit: platform.recent_events_limit,
            request_timeout_secs: platform.request_timeout_secs,
        }
    }
}

impl PlatformSettings {
    /// The signing secret, treating an empty value as unset.
    pub fn signing_secret(&self) -> Option<&str> {
        self.signing_secret.as_deref().filter(|secret| !secret.is_empty())
    }

    /// The API key, treating an empty value as unset.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}

impl std::fmt::Debug for PlatformSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("PlatformSettings")
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

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            max_event_count: DEFAULT_MAX_EVENT_COUNT,
            interval_ms: DEFAULT_INTERVAL_MS,
            paused_tick_policy: PausedTickPolicy::default(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl ServerSettings {
    /// The webhook port, defaulting to the port after the dashboard's.
    pub fn effective_webhook_port(&self) -> u16 {
        self.webhook_port.unwrap_or(self.port.saturating_add(1))
    }

    fn ip(&self) -> Result<IpAddr, String> {
        self.host
            .parse()
            .map_err(|_| format!("Invalid host address: {}", self.host))
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the
    /// specified path and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies `MONITOR_API_KEY` and `MONITOR_SIGNING_SECRET` from the
    /// process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Applies secret overrides from any variable lookup. Empty values are
    /// ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(api_key) = present(API_KEY_ENV) {
            self.platform.api_key = Some(api_key);
        }
        if let Some(secret) = present(SIGNING_SECRET_ENV) {
            self.platform.signing_secret = Some(secret);
        }
    }

    /// Converts the application configuration to a monitor server
    /// configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let ip = self.server.ip()?;
        let platform = &self.platform;

        Ok(ServerConfig {
            dashboard_address: SocketAddr::new(ip, self.server.port),
            webhook_address: SocketAddr::new(ip, self.server.effective_webhook_port()),
            subscriber_queue_capacity: self.server.subscriber_queue_capacity,
            cache_max_events: self.cache.max_events,
            platform: PlatformConfig {
                api_key: platform.api_key().map(str::to_owned),
                signing_secret: platform.signing_secret().map(str::to_owned),
                api_base_url: platform.api_base_url.clone(),
                dashboard_base_url: platform.dashboard_base_url.clone(),
                test_key_prefix: platform.test_key_prefix.clone(),
                signature_header: platform.signature_header.to_ascii_lowercase(),
                signature_tolerance_secs: platform.signature_tolerance_secs,
                recent_events_limit: platform.recent_events_limit,
                request_timeout_secs: platform.request_timeout_secs,
            },
            stats: StatsConfig {
                max_event_count: self.stats.max_event_count,
                interval_ms: self.stats.interval_ms,
                paused_tick_policy: self.stats.paused_tick_policy,
            },
        })
    }

    /// Validates the configuration settings.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing
    /// the issue.
    pub fn validate(&self) -> Result<(), String> {
        self.server.ip()?;

        if self.server.port == self.server.effective_webhook_port() {
            return Err(format!(
                "Dashboard and webhook ports must differ (both {})",
                self.server.port
            ));
        }

        if self.server.subscriber_queue_capacity == 0 {
            return Err("server.subscriber_queue_capacity must be greater than 0".to_string());
        }

        if self.stats.max_event_count == 0 {
            return Err("stats.max_event_count must be greater than 0".to_string());
        }

        if self.stats.interval_ms == 0 {
            return Err("stats.interval_ms must be greater than 0".to_string());
        }

        let limit = self.platform.recent_events_limit;
        if limit == 0 || limit > MAX_RECENT_EVENTS_LIMIT {
            return Err(format!(
                "platform.recent_events_limit must be between 1 and {MAX_RECENT_EVENTS_LIMIT}, got {limit}"
            ));
        }

        if self.platform.signature_header.is_empty() {
            return Err("platform.signature_header cannot be empty".to_string());
        }

        if self.cache.max_events == Some(0) {
            return Err("cache.max_events must be greater than 0 when set".to_string());
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LOG_LEVELS:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
