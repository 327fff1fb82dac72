//! Messages pushed to live subscribers and the seam the store pushes them
//! through.
//!
//! The store depends only on [`Broadcaster`]; the networking crate provides
//! the real fan-out. Implementations must not block: they are called while
//! the store lock is held so that broadcast order equals arrival order.

use crate::event::Event;
use crate::stats::StatsSample;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A message for every connected subscriber.
///
/// Wire form: `{"kind":"event","data":{...}}` or `{"kind":"stats","data":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum HubMessage {
    /// A newly accepted event.
    Event(Event),
    /// A newly closed statistics interval.
    Stats(StatsSample),
}

impl HubMessage {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event(_) => "event",
            Self::Stats(_) => "stats",
        }
    }

    /// True for ping events, which never reach the live feed.
    pub fn is_ping(&self) -> bool {
        matches!(self, Self::Event(event) if event.is_ping())
    }

    /// Serializes the message once so it can be shared by every subscriber.
    pub fn to_frame(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}

/// Best-effort fan-out to live subscribers.
pub trait Broadcaster: Send + Sync {
    /// Delivers `message` to every current subscriber and returns how many
    /// accepted it. Must not block and must never fail the caller.
    fn broadcast(&self, message: &HubMessage) -> usize;
}

/// A broadcaster with no subscribers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBroadcaster;

impl Broadcaster for NullBroadcaster {
    fn broadcast(&self, _message: &HubMessage) -> usize {
        0
    }
}
