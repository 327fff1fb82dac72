//! Subscriber hub for fanning messages out to live subscribers.
//!
//! Every subscriber gets a bounded outbound queue. A broadcast serializes the
//! message once and offers the frame to each queue with `try_send`, so the
//! ingestion path never waits on a slow subscriber. A subscriber whose queue
//! is full or closed is evicted on the spot; anyone still connected has
//! therefore received every message, in order.

use super::{client::Subscriber, ConnectionId};
use dashmap::DashMap;
use monitor_events::{Broadcaster, HubMessage};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, trace, warn};

/// Central manager for all live subscribers.
///
/// # Architecture
///
/// * Uses `DashMap` so connects and disconnects never wait on a broadcast
/// * Implements atomic connection ID generation
/// * Implements [`Broadcaster`] so the store can hand messages over directly
#[derive(Debug)]
pub struct SubscriberHub {
    /// Map of connection ID to subscriber
    subscribers: DashMap<ConnectionId, Subscriber>,

    /// Atomic counter for generating unique connection IDs
    next_id: AtomicUsize,

    /// Capacity of each subscriber's outbound queue
    queue_capacity: usize,
}

impl SubscriberHub {
    /// Creates a hub whose subscribers buffer up to `queue_capacity` frames.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicUsize::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Adds a new subscriber and returns its ID plus the receiving half of
    /// its outbound queue.
    pub fn add_subscriber(&self, remote_addr: SocketAddr) -> (ConnectionId, mpsc::Receiver<Arc<str>>) {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        self.subscribers
            .insert(connection_id, Subscriber::new(remote_addr, sender));
        info!("🔗 Subscriber {} connected from {}", connection_id, remote_addr);
        (connection_id, receiver)
    }

    /// Removes a subscriber. Its queue closes, which ends its socket task.
    pub fn remove_subscriber(&self, connection_id: ConnectionId) {
        if let Some((_, subscriber)) = self.subscribers.remove(&connection_id) {
            info!(
                "❌ Subscriber {} from {} disconnected",
                connection_id, subscriber.remote_addr
            );
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether the given subscriber is still registered.
    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.subscribers.contains_key(&connection_id)
    }

    /// Sends a frame to one subscriber, evicting it if it cannot take it.
    pub fn send_to(&self, connection_id: ConnectionId, frame: Arc<str>) -> bool {
        let result = match self.subscribers.get(&connection_id) {
            Some(subscriber) => subscriber.try_send(frame),
            None => return false,
        };

        match result {
            Ok(()) => true,
            Err(err) => {
                self.evict(connection_id, &err);
                false
            }
        }
    }

    /// Offers a pre-serialized frame to every subscriber.
    ///
    /// Returns how many subscribers accepted it.
    pub fn send_frame(&self, frame: &Arc<str>) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();

        for entry in self.subscribers.iter() {
            match entry.value().try_send(Arc::clone(frame)) {
                Ok(()) => delivered += 1,
                Err(err) => failed.push((*entry.key(), err)),
            }
        }

        // the iterator holds shard locks, so evict only after it is dropped
        for (connection_id, err) in failed {
            self.evict(connection_id, &err);
        }

        trace!("📡 Broadcast frame to {} subscriber(s)", delivered);
        delivered
    }

    /// Drops every subscriber, closing their sockets.
    pub fn close_all(&self) {
        let count = self.subscribers.len();
        self.subscribers.clear();
        if count > 0 {
            info!("🔌 Closed {} subscriber connection(s)", count);
        }
    }

    fn evict(&self, connection_id: ConnectionId, err: &TrySendError<Arc<str>>) {
        if self.subscribers.remove(&connection_id).is_none() {
            return;
        }
        match err {
            TrySendError::Full(_) => warn!(
                "🐌 Subscriber {} fell {} messages behind, evicting",
                connection_id, self.queue_capacity
            ),
            TrySendError::Closed(_) => {
                debug!("Subscriber {} already gone, removing", connection_id)
            }
        }
    }
}

impl Default for SubscriberHub {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Broadcaster for SubscriberHub {
    fn broadcast(&self, message: &HubMessage) -> usize {
        if message.is_ping() {
            trace!("Keeping ping event out of the live feed");
            return 0;
        }

        match message.to_frame() {
            Ok(frame) => self.send_frame(&frame),
            Err(e) => {
                warn!("Failed to serialize {} message: {}", message.kind(), e);
                0
            }
        }
    }
}
