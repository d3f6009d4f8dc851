//! Concurrency-safe endpoint health store.
//!
//! The routing path reads a snapshot and records attempt outcomes; the
//! background [`HealthChecker`](crate::health_checker::HealthChecker) owns
//! the `Down` transition and probe-driven recovery. Keeping mutation behind
//! one store means a burst of concurrent transactions can never observe a
//! half-applied transition.

use parking_lot::RwLock;
use shared_types::{EndpointId, HealthState};
use std::collections::HashMap;

/// Attempts remembered per endpoint for the rolling success rate.
const SUCCESS_WINDOW: usize = 50;

/// Per-endpoint counters behind the store lock.
#[derive(Debug, Clone)]
pub struct EndpointStatus {
    pub state: HealthState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    /// Ring of recent attempt outcomes, newest last.
    window: Vec<bool>,
}

impl EndpointStatus {
    fn new() -> Self {
        Self {
            state: HealthState::Healthy,
            consecutive_failures: 0,
            consecutive_successes: 0,
            window: Vec::with_capacity(SUCCESS_WINDOW),
        }
    }

    fn push_outcome(&mut self, success: bool) {
        if self.window.len() == SUCCESS_WINDOW {
            self.window.remove(0);
        }
        self.window.push(success);
    }

    /// Fraction of recent attempts that succeeded; 1.0 with no history.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 1.0;
        }
        let ok = self.window.iter().filter(|s| **s).count();
        ok as f64 / self.window.len() as f64
    }
}

/// Read-mostly map of endpoint health, shared between the dispatcher and
/// the health checker.
pub struct EndpointHealthStore {
    endpoints: RwLock<HashMap<EndpointId, EndpointStatus>>,
}

impl EndpointHealthStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Registers an endpoint as `Healthy` if it is not yet tracked.
    pub fn register(&self, endpoint: &EndpointId) {
        self.endpoints
            .write()
            .entry(endpoint.clone())
            .or_insert_with(EndpointStatus::new);
    }

    #[must_use]
    pub fn state_of(&self, endpoint: &EndpointId) -> HealthState {
        self.endpoints
            .read()
            .get(endpoint)
            .map(|s| s.state)
            .unwrap_or(HealthState::Healthy)
    }

    #[must_use]
    pub fn is_routable(&self, endpoint: &EndpointId) -> bool {
        self.state_of(endpoint).is_routable()
    }

    #[must_use]
    pub fn status(&self, endpoint: &EndpointId) -> Option<EndpointStatus> {
        self.endpoints.read().get(endpoint).cloned()
    }

    #[must_use]
    pub fn snapshot(&self) -> HashMap<EndpointId, HealthState> {
        self.endpoints
            .read()
            .iter()
            .map(|(id, s)| (id.clone(), s.state))
            .collect()
    }

    pub fn tracked(&self) -> Vec<EndpointId> {
        self.endpoints.read().keys().cloned().collect()
    }

    /// Records a successful attempt from the routing path. Resets the
    /// failure streak but never flips a `Down` endpoint back; only the
    /// health checker's probes do that.
    #[must_use = "callers publish the health-change event when a transition is returned"]
    pub fn record_success(&self, endpoint: &EndpointId) -> Option<(HealthState, HealthState)> {
        let mut map = self.endpoints.write();
        let status = map.entry(endpoint.clone()).or_insert_with(EndpointStatus::new);
        status.push_outcome(true);
        status.consecutive_failures = 0;
        status.consecutive_successes = status.consecutive_successes.saturating_add(1);
        if status.state == HealthState::Degraded {
            status.state = HealthState::Healthy;
            return Some((HealthState::Degraded, HealthState::Healthy));
        }
        None
    }

    /// Records a failed attempt from the routing path. A healthy endpoint
    /// becomes `Degraded` immediately; the `Down` transition is left to the
    /// health checker once the failure streak crosses its threshold.
    #[must_use = "callers publish the health-change event when a transition is returned"]
    pub fn record_failure(&self, endpoint: &EndpointId) -> Option<(HealthState, HealthState)> {
        let mut map = self.endpoints.write();
        let status = map.entry(endpoint.clone()).or_insert_with(EndpointStatus::new);
        status.push_outcome(false);
        status.consecutive_successes = 0;
        status.consecutive_failures = status.consecutive_failures.saturating_add(1);
        if status.state == HealthState::Healthy {
            status.state = HealthState::Degraded;
            return Some((HealthState::Healthy, HealthState::Degraded));
        }
        None
    }

    /// Applies a checker-owned transition. Returns the old state when the
    /// state actually changed.
    pub(crate) fn set_state(
        &self,
        endpoint: &EndpointId,
        to: HealthState,
    ) -> Option<HealthState> {
        let mut map = self.endpoints.write();
        let status = map.entry(endpoint.clone()).or_insert_with(EndpointStatus::new);
        if status.state == to {
            return None;
        }
        let from = status.state;
        status.state = to;
        if to == HealthState::Healthy {
            status.consecutive_failures = 0;
        }
        Some(from)
    }

    pub(crate) fn failure_streak(&self, endpoint: &EndpointId) -> u32 {
        self.endpoints
            .read()
            .get(endpoint)
            .map(|s| s.consecutive_failures)
            .unwrap_or(0)
    }
}

impl Default for EndpointHealthStore {
    fn default() -> Self {
        Self::new()
    }
}
