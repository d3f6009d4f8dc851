//! Duplicate-trace suppression.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use shared_types::TraceKey;

/// Default retention for seen trace keys. Matches the trace-key window so
/// a wrapped STAN in a later window is not mistaken for a duplicate.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(TraceKey::WINDOW_SECS);

/// Bound on tracked keys; at capacity new admissions are still accepted
/// (suppression degrades, ingress does not).
const MAX_TRACKED: usize = 500_000;

/// Recently seen trace keys with time-based eviction.
#[derive(Debug)]
pub struct TraceCache {
    seen: Mutex<HashMap<TraceKey, Instant>>,
    retention: Duration,
}

impl TraceCache {
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            retention,
        }
    }

    /// Records `key` and reports whether it was fresh. A `false` return
    /// means the key was already seen inside the retention window.
    pub fn check_and_insert(&self, key: &TraceKey) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock();
        seen.retain(|_, expiry| *expiry > now);
        if seen.contains_key(key) {
            return false;
        }
        if seen.len() >= MAX_TRACKED {
            tracing::warn!(tracked = seen.len(), "trace cache at capacity, suppression degraded");
            return true;
        }
        seen.insert(key.clone(), now + self.retention);
        true
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

impl Default for TraceCache {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ChannelId;

    #[test]
    fn second_sighting_is_a_duplicate() {
        let cache = TraceCache::default();
        let key = TraceKey::new(1, ChannelId::from("atm-01"), 0);
        assert!(cache.check_and_insert(&key));
        assert!(!cache.check_and_insert(&key));
    }

    #[test]
    fn distinct_channels_do_not_collide() {
        let cache = TraceCache::default();
        let a = TraceKey::new(1, ChannelId::from("atm-01"), 0);
        let b = TraceKey::new(1, ChannelId::from("pos-07"), 0);
        assert!(cache.check_and_insert(&a));
        assert!(cache.check_and_insert(&b));
    }

    #[test]
    fn entries_expire() {
        let cache = TraceCache::new(Duration::from_millis(1));
        let key = TraceKey::new(1, ChannelId::from("atm-01"), 0);
        assert!(cache.check_and_insert(&key));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.check_and_insert(&key));
    }
}
