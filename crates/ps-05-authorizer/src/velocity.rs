//! Sliding-window velocity tracking per account reference.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Attempt timestamps per account, pruned lazily on each observation.
/// Timestamps are seconds since the Unix epoch, taken from the message so
/// replays of old traffic stay deterministic.
/// Account entries are swept once the map grows past this many keys, so a
/// stream of distinct account references cannot grow the map unbounded.
const SWEEP_THRESHOLD: usize = 10_000;

pub struct VelocityTracker {
    window: Duration,
    attempts: Mutex<HashMap<String, VecDeque<u64>>>,
}

impl VelocityTracker {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Records one attempt at `now` and returns the number of attempts
    /// (including this one) inside the window ending at `now`.
    pub fn record(&self, account_ref: &str, now: u64) -> u32 {
        let cutoff = now.saturating_sub(self.window.as_secs());
        let mut attempts = self.attempts.lock();
        if attempts.len() >= SWEEP_THRESHOLD {
            attempts.retain(|_, q| q.back().is_some_and(|t| *t >= cutoff));
        }
        let queue = attempts.entry(account_ref.to_string()).or_default();
        while queue.front().is_some_and(|t| *t < cutoff) {
            queue.pop_front();
        }
        queue.push_back(now);
        queue.len() as u32
    }

    /// Number of account references currently tracked.
    #[must_use]
    pub fn tracked_accounts(&self) -> usize {
        self.attempts.lock().len()
    }

    /// Attempts currently inside the window, without recording one.
    #[must_use]
    pub fn count(&self, account_ref: &str, now: u64) -> u32 {
        let cutoff = now.saturating_sub(self.window.as_secs());
        let attempts = self.attempts.lock();
        attempts
            .get(account_ref)
            .map(|q| q.iter().filter(|t| **t >= cutoff).count() as u32)
            .unwrap_or(0)
    }
}
