//! Recent-event cache.
//!
//! Most-recent-first storage of accepted events. The cache is plain data;
//! atomicity against concurrent readers comes from the store lock that owns
//! it (see [`crate::store::MonitorStore`]).

use crate::event::Event;
use std::collections::VecDeque;

/// Bounded or unbounded list of events, newest at the head.
#[derive(Debug, Clone, Default)]
pub struct RecentEventCache {
    events: VecDeque<Event>,
    capacity: Option<usize>,
}

impl RecentEventCache {
    /// Creates a cache that keeps every event for the process lifetime.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Creates a cache with an optional capacity; the oldest events are
    /// dropped once it is exceeded. `None` means unbounded.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.unwrap_or(0).min(1024)),
            capacity,
        }
    }

    /// Inserts an event at the head.
    pub fn push(&mut self, event: Event) {
        self.events.push_front(event);
        if let Some(capacity) = self.capacity {
            self.events.truncate(capacity);
        }
    }

    /// The `n` most recent events, newest first.
    pub fn list(&self, n: usize) -> Vec<Event> {
        self.events.iter().take(n).cloned().collect()
    }

    /// Every cached event, newest first.
    pub fn list_all(&self) -> Vec<Event> {
        self.events.iter().cloned().collect()
    }

    /// Number of cached events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The configured capacity, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(id: &str) -> Event {
        Event::from_value(json!({
            "id": id, "type": "charge.succeeded", "created": 1, "data": {}
        }))
        .unwrap()
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_list_is_reverse_chronological() {
        let mut cache = RecentEventCache::unbounded();
        for id in ["e1", "e2", "e3"] {
            cache.push(event(id));
        }

        assert_eq!(ids(&cache.list(2)), vec!["e3", "e2"]);
        assert_eq!(ids(&cache.list_all()), vec!["e3", "e2", "e1"]);
        assert_eq!(ids(&cache.list(10)), vec!["e3", "e2", "e1"]);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut cache = RecentEventCache::with_capacity(Some(2));
        for id in ["e1", "e2", "e3"] {
            cache.push(event(id));
        }

        assert_eq!(ids(&cache.list_all()), vec!["e3", "e2"]);
        assert_eq!(cache.capacity(), Some(2));
    }

    #[test]
    fn test_empty_cache() {
        let cache = RecentEventCache::with_capacity(None);
        assert!(cache.is_empty());
        assert!(cache.list(5).is_empty());
    }
}
