//! Message handling for subscriber-server communication.
//!
//! This module provides the control messages subscribers may send over the
//! live-feed socket and the routing that applies them.

pub mod router;
pub mod types;

pub use router::route_subscriber_message;
pub use types::{ControlReply, ResumeResponse, SubscriberCommand};
