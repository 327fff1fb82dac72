//! Error types for webhook verification and payload normalization.
//!
//! Every variant here is a client-input error: the ingestion endpoint answers
//! it with `400` and never retries. Retrying is the upstream sender's job.

use std::time::Duration;

/// Reasons a webhook delivery is rejected before distribution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    /// The signature header is missing, unparsable, or none of its
    /// signatures match the payload.
    #[error("Invalid webhook signature")]
    SignatureInvalid,

    /// The signature matched but its embedded timestamp is older than the
    /// replay tolerance.
    #[error("Webhook timestamp {timestamp} is outside the {}s tolerance window", tolerance.as_secs())]
    SignatureExpired {
        /// Timestamp carried in the signature header (seconds since epoch).
        timestamp: i64,
        /// Tolerance that was exceeded.
        tolerance: Duration,
    },

    /// The payload is not an event envelope (missing or mistyped field).
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),
}

/// Result type for verification and normalization.
pub type WebhookResult<T> = Result<T, WebhookError>;

pub(crate) fn malformed(reason: impl Into<String>) -> WebhookError {
    WebhookError::MalformedPayload(reason.into())
}
