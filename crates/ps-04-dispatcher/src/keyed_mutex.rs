//! Per-trace-key serialization.
//!
//! Two transactions with the same trace key must never run their fallback
//! loops concurrently, otherwise interleaved retries could issue duplicate
//! endpoint calls that downstream deduplication cannot pair up. Each key
//! maps to its own async mutex; the map entry is dropped once the last
//! holder releases it.

use parking_lot::Mutex;
use shared_types::TraceKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub struct TraceLocks {
    locks: Mutex<HashMap<TraceKey, Arc<AsyncMutex<()>>>>,
}

impl TraceLocks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires the lock for `trace`, waiting behind any holder of the same
    /// key. Distinct keys never contend.
    pub async fn acquire(&self, trace: &TraceKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(
                locks
                    .entry(trace.clone())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        let guard = lock.lock_owned().await;
        self.sweep(trace);
        guard
    }

    /// Drops map entries nobody else holds. The guard keeps its own Arc
    /// alive, so an entry with two strong references (map + guard) is idle.
    fn sweep(&self, acquired: &TraceKey) {
        let mut locks = self.locks.lock();
        locks.retain(|key, lock| key == acquired || Arc::strong_count(lock) > 1);
    }

    #[must_use]
    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}

impl Default for TraceLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ChannelId;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn trace(stan: u32) -> TraceKey {
        TraceKey::new(stan, ChannelId::new("pos-1"), 1_700_000_000)
    }

    #[tokio::test]
    async fn same_key_is_mutually_exclusive() {
        let locks = Arc::new(TraceLocks::new());
        let concurrent = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let concurrent = Arc::clone(&concurrent);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&trace(42)).await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let locks = TraceLocks::new();
        let g1 = locks.acquire(&trace(1)).await;
        // Would deadlock if keys shared a lock.
        let g2 = locks.acquire(&trace(2)).await;
        drop(g1);
        drop(g2);
    }

    #[tokio::test]
    async fn idle_entries_are_swept() {
        let locks = TraceLocks::new();
        {
            let _g = locks.acquire(&trace(1)).await;
        }
        {
            let _g = locks.acquire(&trace(2)).await;
        }
        // The sweep during the second acquire removed the idle first entry.
        assert!(locks.tracked() <= 1);
    }
}
