//! Terminal-outcome store keyed by trace key.

use parking_lot::Mutex;
use shared_types::{FinalOutcome, TraceKey};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Outcomes are kept for the trace-key window so a replayed transaction
/// observes its original result instead of re-executing.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(600);

/// Hard cap on remembered outcomes.
const MAX_TRACKED: usize = 500_000;

struct Entry {
    outcome: FinalOutcome,
    recorded_at: Instant,
}

pub struct OutcomeStore {
    retention: Duration,
    entries: Mutex<HashMap<TraceKey, Entry>>,
}

impl OutcomeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    #[must_use]
    pub fn with_retention(retention: Duration) -> Self {
        Self {
            retention,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Recorded outcome for `trace`, if still retained.
    #[must_use]
    pub fn get(&self, trace: &TraceKey) -> Option<FinalOutcome> {
        let now = Instant::now();
        let entries = self.entries.lock();
        entries
            .get(trace)
            .filter(|e| now.duration_since(e.recorded_at) < self.retention)
            .map(|e| e.outcome)
    }

    pub fn record(&self, trace: TraceKey, outcome: FinalOutcome) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if entries.len() >= MAX_TRACKED {
            entries.retain(|_, e| now.duration_since(e.recorded_at) < self.retention);
        }
        entries.insert(
            trace,
            Entry {
                outcome,
                recorded_at: now,
            },
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for OutcomeStore {
    fn default() -> Self {
        Self::new()
    }
}
