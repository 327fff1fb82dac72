//! Shutdown coordination for graceful server shutdown.
//!
//! Shared state that tells the listeners and the stats ticker to stop, and
//! lets them await that signal instead of polling the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Shared shutdown state for coordinating graceful shutdown across components.
#[derive(Debug, Clone)]
pub struct ShutdownState {
    /// Set once shutdown begins; no new webhooks are accepted after this.
    shutdown_initiated: Arc<AtomicBool>,
    /// Set once listeners and the ticker have stopped.
    shutdown_complete: Arc<AtomicBool>,
    /// Wakes every task waiting in [`ShutdownState::wait`].
    notify: Arc<watch::Sender<bool>>,
}

impl ShutdownState {
    /// Creates a new shutdown state with both flags set to false.
    pub fn new() -> Self {
        let (notify, _) = watch::channel(false);
        Self {
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_complete: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(notify),
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Returns true if shutdown is complete and final cleanup can begin.
    pub fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete.load(Ordering::Acquire)
    }

    /// Initiates shutdown and wakes every waiter.
    pub fn initiate_shutdown(&self) {
        if self.shutdown_initiated.swap(true, Ordering::AcqRel) {
            return;
        }
        self.notify.send_replace(true);
        info!("🛑 Shutdown initiated - no new webhooks will be accepted");
    }

    /// Marks shutdown as complete.
    pub fn complete_shutdown(&self) {
        self.shutdown_complete.store(true, Ordering::Release);
        info!("✅ Listeners and ticker stopped - ready for final cleanup");
    }

    /// Resolves once [`initiate_shutdown`](Self::initiate_shutdown) has been
    /// called, immediately if it already was.
    pub async fn wait(&self) {
        let mut receiver = self.notify.subscribe();
        // the sender lives in self, so this only errors if it was dropped
        let _ = receiver.wait_for(|initiated| *initiated).await;
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}
