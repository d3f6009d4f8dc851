//! Dispatcher tuning knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds for the fallback loop and per-attempt timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Maximum authorization attempts per transaction across all candidate
    /// endpoints of the selected rule.
    pub max_attempts: u8,
    /// Upper bound on a single endpoint call. The effective timeout is the
    /// smaller of this and the transaction's remaining deadline.
    pub attempt_timeout_ms: u64,
    /// Overall deadline granted to a transaction at admission.
    pub transaction_deadline_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_ms: 2_000,
            transaction_deadline_ms: 5_000,
        }
    }
}

impl DispatcherConfig {
    #[must_use]
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    #[must_use]
    pub fn transaction_deadline(&self) -> Duration {
        Duration::from_millis(self.transaction_deadline_ms)
    }
}

/// Background health probing cadence and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheckConfig {
    /// Interval between probe rounds.
    pub probe_interval_ms: u64,
    /// Consecutive failures (attempts plus probes) before an endpoint is
    /// marked `Down` and removed from routing.
    pub down_after_failures: u32,
    /// Successful probes required before a `Down` endpoint returns to
    /// `Healthy`.
    pub recover_after_successes: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: 2_000,
            down_after_failures: 3,
            recover_after_successes: 1,
        }
    }
}

impl HealthCheckConfig {
    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let d = DispatcherConfig::default();
        assert_eq!(d.max_attempts, 3);
        assert!(d.attempt_timeout() < d.transaction_deadline());

        let h = HealthCheckConfig::default();
        assert_eq!(h.down_after_failures, 3);
        assert_eq!(h.recover_after_successes, 1);
    }
}
