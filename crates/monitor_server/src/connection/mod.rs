//! Subscriber management for the live feed.
//!
//! This module tracks connected dashboard subscribers and fans accepted
//! events and statistics samples out to them.

pub mod client;
pub mod manager;

pub use client::Subscriber;
pub use manager::SubscriberHub;

/// Type alias for connection identifiers.
///
/// Connection IDs uniquely identify subscribers throughout their lifecycle
/// on the server.
pub type ConnectionId = usize;
