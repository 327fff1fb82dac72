//! Error types and handling for the monitor server.
//!
//! This module defines the errors that can occur while binding and serving
//! the two listeners and while talking to the payments platform API.

/// Enumeration of possible server errors.
///
/// Network errors at startup (a port that cannot be bound) are fatal to the
/// process; everything else is reported and survived.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or connection issues
    #[error("Network error: {0}")]
    Network(String),

    /// Internal server errors such as a task that panicked
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure to fetch data from the payments platform API.
///
/// Covers transport errors, non-success statuses and undecodable bodies.
/// Never fatal; the dashboard endpoint maps it to `502`.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The platform could not be reached or returned an unusable answer
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}
