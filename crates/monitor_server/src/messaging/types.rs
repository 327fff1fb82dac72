//! Message type definitions for subscriber-server communication.
//!
//! Subscribers mostly listen, but they can also drive the pause control over
//! the same socket. Replies go only to the subscriber that asked.

use monitor_events::PauseStatus;
use serde::{Deserialize, Serialize};

/// A control message sent from a subscriber to the server.
///
/// # Examples
///
/// ```json
/// { "action": "pause" }
/// { "action": "resume" }
/// { "action": "toggle_pause" }
/// { "action": "status" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SubscriberCommand {
    /// Start queueing incoming events
    Pause,
    /// Deliver queued events and stop queueing
    Resume,
    /// Flip between the two
    TogglePause,
    /// Report the current pause state
    Status,
}

/// A reply to one subscriber's command.
///
/// Uses the same `{kind, data}` envelope as broadcast frames so a client can
/// dispatch on `kind` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ControlReply {
    /// Pause state after the command ran
    PauseStatus(PauseStatus),
    /// The command could not be understood
    Error {
        /// What went wrong
        message: String,
    },
}

/// Response body of `POST /resume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeResponse {
    /// Whether the stream is still paused (always false after a resume)
    pub paused: bool,
    /// Events still queued
    pub queued: usize,
    /// Events delivered by this resume
    pub flushed: usize,
}
