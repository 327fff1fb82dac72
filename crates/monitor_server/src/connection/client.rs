//! A single live subscriber.
//!
//! The subscriber itself owns nothing but the sending half of its outbound
//! queue; the WebSocket task on the other end drains the queue. Dropping the
//! `Subscriber` closes the queue, which makes that task close the socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;

/// A connected observer of the live feed.
#[derive(Debug)]
pub struct Subscriber {
    /// Remote address of the WebSocket peer
    pub remote_addr: SocketAddr,

    /// When the subscription started
    pub connected_at: SystemTime,

    /// Outbound frames, already serialized
    sender: mpsc::Sender<Arc<str>>,
}

impl Subscriber {
    /// Creates a subscriber around the sending half of its queue.
    pub fn new(remote_addr: SocketAddr, sender: mpsc::Sender<Arc<str>>) -> Self {
        Self {
            remote_addr,
            connected_at: SystemTime::now(),
            sender,
        }
    }

    /// Queues a frame without waiting.
    pub fn try_send(&self, frame: Arc<str>) -> Result<(), mpsc::error::TrySendError<Arc<str>>> {
        self.sender.try_send(frame)
    }
}
