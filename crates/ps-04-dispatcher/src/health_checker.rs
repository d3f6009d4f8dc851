//! Background endpoint prober.
//!
//! Owns the `Down` transition and recovery: the routing path only degrades
//! endpoints, while this task takes them out of rotation once the failure
//! streak crosses the configured threshold and brings them back after
//! successful probes.

use shared_bus::{EventPublisher, SwitchEvent};
use shared_types::{EndpointId, HealthState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::HealthCheckConfig;
use crate::health::EndpointHealthStore;
use crate::ports::EndpointProber;

pub struct HealthChecker {
    store: Arc<EndpointHealthStore>,
    prober: Arc<dyn EndpointProber>,
    bus: Arc<dyn EventPublisher>,
    config: HealthCheckConfig,
    /// Successful probes seen per down endpoint since it went down.
    probe_successes: HashMap<EndpointId, u32>,
}

impl HealthChecker {
    #[must_use]
    pub fn new(
        store: Arc<EndpointHealthStore>,
        prober: Arc<dyn EndpointProber>,
        bus: Arc<dyn EventPublisher>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            store,
            prober,
            bus,
            config,
            probe_successes: HashMap::new(),
        }
    }

    /// Runs probe rounds until the shutdown signal flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.probe_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            interval_ms = self.config.probe_interval_ms,
            "health checker started"
        );
        loop {
            tokio::select! {
                _ = interval.tick() => self.probe_round().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("health checker stopping");
                        return;
                    }
                }
            }
        }
    }

    /// Probes every tracked endpoint once and applies transitions.
    pub async fn probe_round(&mut self) {
        for endpoint in self.store.tracked() {
            let state = self.store.state_of(&endpoint);
            match self.prober.probe(&endpoint).await {
                Ok(rtt) => {
                    debug!(endpoint = %endpoint.0, rtt_ms = rtt.as_millis() as u64, "probe ok");
                    self.on_probe_success(&endpoint, state).await;
                }
                Err(err) => {
                    debug!(endpoint = %endpoint.0, %err, "probe failed");
                    self.on_probe_failure(&endpoint, state).await;
                }
            }
        }
    }

    async fn on_probe_success(&mut self, endpoint: &EndpointId, state: HealthState) {
        match state {
            HealthState::Down => {
                let seen = self.probe_successes.entry(endpoint.clone()).or_insert(0);
                *seen += 1;
                if *seen >= self.config.recover_after_successes {
                    self.probe_successes.remove(endpoint);
                    self.transition(endpoint, HealthState::Healthy).await;
                }
            }
            HealthState::Degraded => {
                // A degraded endpoint that answers probes recovers; recent
                // attempt outcomes already live in the rolling window.
                if self.store.failure_streak(endpoint) == 0 {
                    self.transition(endpoint, HealthState::Healthy).await;
                }
            }
            HealthState::Healthy => {}
        }
    }

    async fn on_probe_failure(&mut self, endpoint: &EndpointId, state: HealthState) {
        self.probe_successes.remove(endpoint);
        match state {
            HealthState::Down => {}
            _ => {
                let transition = self.store.record_failure(endpoint);
                if let Some((from, to)) = transition {
                    self.publish(endpoint, from, to).await;
                }
                if self.store.failure_streak(endpoint) >= self.config.down_after_failures {
                    self.transition(endpoint, HealthState::Down).await;
                }
            }
        }
    }

    async fn transition(&self, endpoint: &EndpointId, to: HealthState) {
        if let Some(from) = self.store.set_state(endpoint, to) {
            if to == HealthState::Down {
                warn!(endpoint = %endpoint.0, "endpoint removed from rotation");
            } else {
                info!(endpoint = %endpoint.0, %from, %to, "endpoint state changed");
            }
            self.publish(endpoint, from, to).await;
        }
    }

    async fn publish(&self, endpoint: &EndpointId, from: HealthState, to: HealthState) {
        self.bus
            .publish(SwitchEvent::EndpointHealthChanged {
                endpoint: endpoint.clone(),
                from,
                to,
            })
            .await;
    }
}
