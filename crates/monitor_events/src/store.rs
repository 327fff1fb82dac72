//! # Monitor Store
//!
//! The single piece of shared mutable state: recent-event cache, statistics
//! aggregator, pause state and the set of accepted event ids, all behind one
//! lock. Ingestion, ticks and pause toggles are therefore serialized, which
//! is what keeps a `record` from interleaving with the read-then-reset of a
//! `tick`.
//!
//! Distribution of an accepted event is always, in this order:
//!
//! 1. push to the cache
//! 2. record in the aggregator
//! 3. broadcast to subscribers
//!
//! All three happen under the lock, so readers never observe a partially
//! distributed event. While paused, the event goes to the pause queue
//! instead and distribution is deferred. `resume` replays it for every
//! queued event in arrival order before the lock is released, so no newer
//! event can overtake a queued one.
//!
//! Accepted ids are remembered for duplicate suppression. When the cache is
//! capped the id set is capped to the same size, oldest id first.

use crate::broadcast::{Broadcaster, HubMessage};
use crate::cache::RecentEventCache;
use crate::event::Event;
use crate::stats::{EventTypeSummary, PausedTickPolicy, StatsAggregator, StatsConfig, StatsSample};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

/// Result of handing an event to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Cached, counted and broadcast to this many subscribers.
    Distributed {
        /// Subscribers that accepted the broadcast.
        subscribers: usize,
    },
    /// Held in the pause queue at this (1-based) position.
    Queued {
        /// Length of the pause queue after the insert.
        position: usize,
    },
    /// An event with this id was already accepted; nothing was done.
    Duplicate,
}

/// Pause flag and the events received while it is set.
#[derive(Debug, Clone, Default)]
pub struct PauseState {
    paused: bool,
    queue: VecDeque<Event>,
}

impl PauseState {
    /// Whether the stream is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Events waiting for resume.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

/// Snapshot of the pause state for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseStatus {
    /// Whether the stream is paused.
    pub paused: bool,
    /// Events waiting for resume.
    pub queued: usize,
}

/// Accepted event ids, in acceptance order.
#[derive(Debug, Default)]
struct SeenIds {
    ids: HashSet<String>,
    order: VecDeque<String>,
    capacity: Option<usize>,
}

impl SeenIds {
    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Returns false if `id` is already known.
    fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_owned());
        self.order.push_back(id.to_owned());

        if let Some(capacity) = self.capacity {
            while self.order.len() > capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.ids.remove(&oldest);
                }
            }
        }
        true
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

#[derive(Debug)]
struct StoreInner {
    cache: RecentEventCache,
    stats: StatsAggregator,
    pause: PauseState,
    seen_ids: SeenIds,
}

impl StoreInner {
    fn status(&self) -> PauseStatus {
        PauseStatus {
            paused: self.pause.is_paused(),
            queued: self.pause.queued(),
        }
    }

    fn pause(&mut self) -> bool {
        if self.pause.paused {
            return false;
        }
        self.pause.paused = true;
        info!("⏸️ Event stream paused");
        true
    }

    fn resume(&mut self, broadcaster: &dyn Broadcaster) -> usize {
        if !self.pause.paused {
            return 0;
        }

        self.pause.paused = false;
        let queued = std::mem::take(&mut self.pause.queue);
        let flushed = queued.len();
        for event in queued {
            self.distribute(broadcaster, event);
        }

        info!("▶️ Event stream resumed, {} queued event(s) delivered", flushed);
        flushed
    }

    fn distribute(&mut self, broadcaster: &dyn Broadcaster, event: Event) -> usize {
        self.cache.push(event.clone());
        self.stats.record(&event.event_type);
        broadcaster.broadcast(&HubMessage::Event(event))
    }
}

/// Serialized owner of the cache, aggregator and pause state.
pub struct MonitorStore {
    inner: Mutex<StoreInner>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl MonitorStore {
    /// Creates a store around an empty cache and aggregator.
    ///
    /// # Arguments
    ///
    /// * `cache` - Recent-event cache (bounded or not)
    /// * `stats_config` - Window length, interval and paused-tick policy
    /// * `broadcaster` - Fan-out used for accepted events and new samples
    pub fn new(
        cache: RecentEventCache,
        stats_config: StatsConfig,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                seen_ids: SeenIds::with_capacity(cache.capacity()),
                cache,
                stats: StatsAggregator::new(stats_config),
                pause: PauseState::default(),
            }),
            broadcaster,
        }
    }

    /// Accepts a verified event.
    ///
    /// Returns once the event is fully distributed or queued, so the caller
    /// can acknowledge the delivery right after.
    pub async fn ingest(&self, event: Event) -> IngestOutcome {
        let mut inner = self.inner.lock().await;

        if !inner.seen_ids.insert(&event.id) {
            debug!(event_id = %event.id, "Ignoring duplicate delivery");
            return IngestOutcome::Duplicate;
        }

        if inner.pause.paused {
            trace!(event_id = %event.id, "Stream paused, queueing event");
            inner.pause.queue.push_back(event);
            return IngestOutcome::Queued {
                position: inner.pause.queue.len(),
            };
        }

        let subscribers = inner.distribute(self.broadcaster.as_ref(), event);
        IngestOutcome::Distributed { subscribers }
    }

    /// Pauses the stream. Returns false if it was already paused.
    pub async fn pause(&self) -> bool {
        self.inner.lock().await.pause()
    }

    /// Pauses the stream and returns the resulting status, read under the
    /// same lock.
    pub async fn pause_with_status(&self) -> PauseStatus {
        let mut inner = self.inner.lock().await;
        inner.pause();
        inner.status()
    }

    /// Resumes the stream, distributing every queued event in arrival order.
    ///
    /// The flag flip and the queue flush happen under one lock acquisition.
    /// Returns the number of flushed events.
    pub async fn resume(&self) -> usize {
        self.inner.lock().await.resume(self.broadcaster.as_ref())
    }

    /// Resumes the stream and returns the flushed count together with the
    /// resulting status, read under the same lock.
    pub async fn resume_with_status(&self) -> (usize, PauseStatus) {
        let mut inner = self.inner.lock().await;
        let flushed = inner.resume(self.broadcaster.as_ref());
        (flushed, inner.status())
    }

    /// Flips between paused and running.
    ///
    /// The read of the flag, the flip, any flush and the returned status all
    /// happen under one lock acquisition.
    pub async fn toggle_pause(&self) -> PauseStatus {
        let mut inner = self.inner.lock().await;
        if inner.pause.paused {
            inner.resume(self.broadcaster.as_ref());
        } else {
            inner.pause();
        }
        inner.status()
    }

    /// Whether the stream is paused.
    pub async fn is_paused(&self) -> bool {
        self.inner.lock().await.pause.paused
    }

    /// Current pause flag and queue length.
    pub async fn pause_status(&self) -> PauseStatus {
        self.inner.lock().await.status()
    }

    /// Pre-populates the statistics window; call once before the first tick.
    pub async fn initialize_stats(&self, now_ms: u64) {
        self.inner.lock().await.stats.initialize(now_ms);
    }

    /// Closes a statistics interval and broadcasts the new sample.
    ///
    /// Returns `None` when the stream is paused and the policy is
    /// [`PausedTickPolicy::Suspend`].
    pub async fn tick(&self, now_ms: u64) -> Option<StatsSample> {
        let mut inner = self.inner.lock().await;
        if inner.pause.paused && inner.stats.config().paused_tick_policy == PausedTickPolicy::Suspend
        {
            trace!("Stats tick suspended while paused");
            return None;
        }

        let sample = inner.stats.tick(now_ms);
        self.broadcaster.broadcast(&HubMessage::Stats(sample.clone()));
        Some(sample)
    }

    /// Cached events, newest first; all of them when `limit` is `None`.
    pub async fn recent_events(&self, limit: Option<usize>) -> Vec<Event> {
        let inner = self.inner.lock().await;
        match limit {
            Some(n) => inner.cache.list(n),
            None => inner.cache.list_all(),
        }
    }

    /// The statistics window, oldest first.
    pub async fn stats_window(&self) -> Vec<StatsSample> {
        self.inner.lock().await.stats.window()
    }

    /// Known event types with colors and counts.
    pub async fn event_types(&self) -> Vec<EventTypeSummary> {
        self.inner.lock().await.stats.event_types()
    }

    /// Number of cached events.
    pub async fn cached_len(&self) -> usize {
        self.inner.lock().await.cache.len()
    }

    /// Events recorded by the aggregator so far.
    pub async fn total_recorded(&self) -> u64 {
        self.inner.lock().await.stats.total_recorded()
    }
}

impl std::fmt::Debug for MonitorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorStore").finish_non_exhaustive()
    }
}
