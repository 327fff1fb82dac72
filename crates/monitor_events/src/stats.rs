//! # Sliding-Window Event Statistics
//!
//! The aggregator keeps a live counter per event type and, on every tick,
//! turns the growth of each counter since the previous tick into one
//! [`StatsSample`]. Samples live in a fixed-length window (oldest first) that
//! the dashboard draws as a stacked chart.
//!
//! Two invariants hold at all times:
//!
//! - **Rectangular window**: every sample has a count for every known type.
//!   A type seen for the first time is backfilled with zeros into all
//!   existing samples.
//! - **Ordered window**: timestamps are strictly increasing, and after
//!   [`StatsAggregator::initialize`] the window always holds exactly
//!   `max_event_count` samples.

use crate::palette::color_for;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Samples kept in the window when none is configured.
pub const DEFAULT_MAX_EVENT_COUNT: usize = 40;

/// Sampling interval in milliseconds when none is configured.
pub const DEFAULT_INTERVAL_MS: u64 = 1500;

/// What a tick does while the event stream is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PausedTickPolicy {
    /// Keep ticking. Recording is deferred while paused, so paused samples
    /// carry zero deltas and the window keeps tracking wall-clock time.
    #[default]
    ZeroFill,
    /// Skip ticks entirely; the window freezes until resume.
    Suspend,
}

/// Aggregator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Number of samples in the window.
    pub max_event_count: usize,
    /// Tick interval in milliseconds.
    pub interval_ms: u64,
    /// Tick behavior while paused.
    #[serde(default)]
    pub paused_tick_policy: PausedTickPolicy,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            max_event_count: DEFAULT_MAX_EVENT_COUNT,
            interval_ms: DEFAULT_INTERVAL_MS,
            paused_tick_policy: PausedTickPolicy::default(),
        }
    }
}

/// Event counts observed during one sampling interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSample {
    /// End of the interval, milliseconds since epoch.
    pub timestamp: u64,
    /// Events per type since the previous sample.
    pub counts: BTreeMap<String, u64>,
}

impl StatsSample {
    /// Sum of all per-type deltas.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// One known event type with its display color and lifetime count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeSummary {
    /// The event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Palette color.
    pub color: String,
    /// Events of this type recorded so far.
    pub count: u64,
}

/// Per-type counters plus the sample window.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    config: StatsConfig,
    live: BTreeMap<String, u64>,
    last_snapshot: BTreeMap<String, u64>,
    window: VecDeque<StatsSample>,
    total_recorded: u64,
}

impl StatsAggregator {
    /// Creates an empty aggregator. Call [`initialize`](Self::initialize)
    /// before the first tick to get a full-width window.
    pub fn new(config: StatsConfig) -> Self {
        let window = VecDeque::with_capacity(config.max_event_count + 1);
        Self {
            config,
            live: BTreeMap::new(),
            last_snapshot: BTreeMap::new(),
            window,
            total_recorded: 0,
        }
    }

    /// The aggregator settings.
    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// Counts one event of `event_type`.
    ///
    /// An unseen type starts at zero in the snapshot (so its first delta is
    /// the full count) and is backfilled with zeros into every existing
    /// sample.
    pub fn record(&mut self, event_type: &str) {
        self.total_recorded += 1;
        if let Some(count) = self.live.get_mut(event_type) {
            *count += 1;
            return;
        }

        self.live.insert(event_type.to_string(), 1);
        self.last_snapshot.insert(event_type.to_string(), 0);
        self.backfill(event_type);
    }

    /// Fills the window with `max_event_count` zero samples ending one
    /// interval before `now_ms`, spaced by the tick interval.
    ///
    /// Every type known at this point gets a zero entry. Calling it again
    /// discards the current window.
    pub fn initialize(&mut self, now_ms: u64) {
        let len = self.config.max_event_count as u64;
        let zeros: BTreeMap<String, u64> = self.live.keys().map(|t| (t.clone(), 0)).collect();

        self.window.clear();
        for i in 0..len {
            let offset = (len - i).saturating_mul(self.config.interval_ms);
            self.window.push_back(StatsSample {
                timestamp: now_ms.saturating_sub(offset),
                counts: zeros.clone(),
            });
        }
    }

    /// Closes the current interval at `now_ms`.
    ///
    /// Computes `live - last_snapshot` for every known type, advances the
    /// snapshot, appends the sample and evicts the oldest one once the window
    /// is full. Returns the new sample.
    pub fn tick(&mut self, now_ms: u64) -> StatsSample {
        let mut counts = BTreeMap::new();
        for (event_type, &live) in &self.live {
            let last = self.last_snapshot.entry(event_type.clone()).or_insert(0);
            counts.insert(event_type.clone(), live.saturating_sub(*last));
            *last = live;
        }

        let timestamp = match self.window.back() {
            Some(newest) if now_ms <= newest.timestamp => newest.timestamp + 1,
            _ => now_ms,
        };

        let sample = StatsSample { timestamp, counts };
        self.window.push_back(sample.clone());
        while self.window.len() > self.config.max_event_count {
            self.window.pop_front();
        }
        sample
    }

    /// The sample window, oldest first.
    pub fn window(&self) -> Vec<StatsSample> {
        self.window.iter().cloned().collect()
    }

    /// Number of samples currently in the window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Every type seen so far, in lexical order.
    pub fn known_types(&self) -> Vec<String> {
        self.live.keys().cloned().collect()
    }

    /// Lifetime count for one type.
    pub fn count(&self, event_type: &str) -> u64 {
        self.live.get(event_type).copied().unwrap_or(0)
    }

    /// Events recorded across all types.
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    /// Known types with their colors and lifetime counts.
    pub fn event_types(&self) -> Vec<EventTypeSummary> {
        self.live
            .iter()
            .map(|(event_type, &count)| EventTypeSummary {
                event_type: event_type.clone(),
                color: color_for(event_type).to_string(),
                count,
            })
            .collect()
    }

    fn backfill(&mut self, event_type: &str) {
        for sample in &mut self.window {
            sample.counts.entry(event_type.to_string()).or_insert(0);
        }
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new(StatsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    fn aggregator(max_event_count: usize) -> StatsAggregator {
        StatsAggregator::new(StatsConfig {
            max_event_count,
            interval_ms: 1500,
            paused_tick_policy: PausedTickPolicy::ZeroFill,
        })
    }

    fn assert_rectangular(stats: &StatsAggregator) {
        let expected = stats.known_types();
        for sample in stats.window() {
            let keys: Vec<String> = sample.counts.keys().cloned().collect();
            assert_eq!(keys, expected, "sample at {} is not rectangular", sample.timestamp);
        }
    }

    #[test]
    fn test_initialize_builds_full_spaced_window() {
        let mut stats = aggregator(40);
        stats.record("charge.succeeded");
        stats.initialize(NOW);

        let window = stats.window();
        assert_eq!(window.len(), 40);
        assert_eq!(window[0].timestamp, NOW - 40 * 1500);
        assert_eq!(window[39].timestamp, NOW - 1500);
        for pair in window.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, 1500);
        }
        assert!(window.iter().all(|s| s.counts.get("charge.succeeded") == Some(&0)));
    }

    #[test]
    fn test_record_new_type_backfills_every_sample() {
        let mut stats = aggregator(5);
        stats.record("charge.succeeded");
        stats.initialize(NOW);

        stats.record("invoice.paid");
        assert_eq!(stats.window_len(), 5);
        assert!(stats.window().iter().all(|s| s.counts.get("invoice.paid") == Some(&0)));
        assert_rectangular(&stats);

        // a second record of the same type does not touch the window again
        stats.record("invoice.paid");
        assert_eq!(stats.window_len(), 5);
        assert_rectangular(&stats);
    }

    #[test]
    fn test_tick_emits_deltas_since_previous_tick() {
        let mut stats = aggregator(40);
        stats.initialize(NOW);

        stats.record("A");
        stats.record("B");
        let first = stats.tick(NOW + 1500);
        assert_eq!(first.counts.get("A"), Some(&1));
        assert_eq!(first.counts.get("B"), Some(&1));
        assert_eq!(first.total(), 2);

        stats.record("A");
        let second = stats.tick(NOW + 3000);
        assert_eq!(second.counts.get("A"), Some(&1));
        assert_eq!(second.counts.get("B"), Some(&0));

        let third = stats.tick(NOW + 4500);
        assert_eq!(third.total(), 0);
        assert_eq!(third.counts.len(), 2);

        assert_eq!(stats.count("A"), 2);
        assert_eq!(stats.total_recorded(), 3);
        assert_rectangular(&stats);
    }

    #[test]
    fn test_window_stays_fixed_length_and_ordered() {
        let mut stats = aggregator(10);
        stats.initialize(NOW);

        for k in 1..=25u64 {
            if k % 3 == 0 {
                stats.record(&format!("type_{}", k % 4));
            }
            stats.tick(NOW + k * 1500);
            assert_eq!(stats.window_len(), 10);
        }

        let window = stats.window();
        for pair in window.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
        assert_eq!(window.last().map(|s| s.timestamp), Some(NOW + 25 * 1500));
        assert_rectangular(&stats);
    }

    #[test]
    fn test_tick_forces_strictly_increasing_timestamps() {
        let mut stats = aggregator(4);
        stats.initialize(NOW);

        let a = stats.tick(NOW);
        let b = stats.tick(NOW - 10_000);
        assert!(b.timestamp > a.timestamp);
        assert_eq!(b.timestamp, a.timestamp + 1);
    }

    #[test]
    fn test_tick_without_initialize_grows_to_capacity() {
        let mut stats = aggregator(3);
        stats.record("A");
        for k in 1..=5u64 {
            stats.tick(NOW + k);
        }
        assert_eq!(stats.window_len(), 3);
        assert_eq!(stats.window()[0].counts.get("A"), Some(&0));
    }

    #[test]
    fn test_event_type_summaries() {
        let mut stats = StatsAggregator::default();
        stats.record("invoice.paid");
        stats.record("charge.succeeded");
        stats.record("invoice.paid");

        let types = stats.event_types();
        assert_eq!(types.len(), 2);
        assert_eq!(types[0].event_type, "charge.succeeded");
        assert_eq!(types[1].count, 2);
        assert_eq!(types[1].color, color_for("invoice.paid"));
    }

    #[test]
    fn test_sample_wire_shape() {
        let sample = StatsSample {
            timestamp: 42,
            counts: BTreeMap::from([("A".to_string(), 1)]),
        };
        assert_eq!(
            serde_json::to_value(&sample).unwrap(),
            serde_json::json!({ "timestamp": 42, "counts": { "A": 1 } })
        );
        let policy: PausedTickPolicy = serde_json::from_str("\"suspend\"").unwrap();
        assert_eq!(policy, PausedTickPolicy::Suspend);
    }
}
