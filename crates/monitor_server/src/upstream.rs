//! Client for the payments platform REST API.
//!
//! Only one call is needed: the platform's own list of recent events, which
//! backs `/recent-events` independently of the local cache.

use crate::config::PlatformConfig;
use crate::error::UpstreamError;
use async_trait::async_trait;
use monitor_events::Event;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// A source of recent events other than the local cache.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Returns at most `limit` events, newest first.
    async fn list_events(&self, limit: usize) -> Result<Vec<Event>, UpstreamError>;
}

/// Envelope of the platform's list endpoints.
#[derive(Debug, Deserialize)]
struct ListResponse {
    data: Vec<Value>,
}

/// HTTP client for `GET {api_base_url}/events`.
#[derive(Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    api_base_url: String,
    api_key: Option<String>,
}

impl PlatformClient {
    /// Builds a client from the platform settings.
    pub fn new(config: &PlatformConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.api_base_url)
    }
}

impl std::fmt::Debug for PlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformClient")
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[async_trait]
impl EventSource for PlatformClient {
    async fn list_events(&self, limit: usize) -> Result<Vec<Event>, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| UpstreamError::Unavailable("no API key configured".to_string()))?;

        let response = self
            .http
            .get(self.events_url())
            .bearer_auth(api_key)
            .query(&[("limit", limit)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Unavailable(format!(
                "event list returned {status}"
            )));
        }

        let body: ListResponse = response.json().await?;
        let received = body.data.len();
        let mut events: Vec<Event> = body
            .data
            .into_iter()
            .filter_map(|value| match Event::from_value(value) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("Skipping unreadable upstream event: {}", e);
                    None
                }
            })
            .collect();
        events.truncate(limit);

        debug!("Fetched {} of {} upstream event(s)", events.len(), received);
        Ok(events)
    }
}
