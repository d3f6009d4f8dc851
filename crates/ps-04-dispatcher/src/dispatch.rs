//! Rule selection and the cascading fallback loop.

use shared_bus::{EventPublisher, SwitchEvent};
use shared_types::{Decision, EndpointId, ResponseCode, RoutingRule};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use ps_03_broker::AdmittedTransaction;

use crate::config::DispatcherConfig;
use crate::errors::EndpointError;
use crate::health::EndpointHealthStore;
use crate::keyed_mutex::TraceLocks;
use crate::ports::EndpointConnector;
use crate::routing::RoutingTable;

/// Terminal result of routing one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// An endpoint produced a terminal decision (approval or hard decline).
    Decided {
        endpoint: EndpointId,
        decision: Decision,
        attempts: u8,
    },
    /// Every permitted attempt soft-failed.
    Exhausted { attempts: u8 },
    /// The transaction deadline expired before a terminal decision.
    DeadlineExpired { attempts: u8 },
    /// No rule matched, or every matching rule had only down endpoints.
    Unroutable,
}

impl RouteOutcome {
    /// Response code owed to the acquirer for this outcome. `Decided`
    /// outcomes defer to the decision itself.
    #[must_use]
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Self::Decided { decision, .. } => decision.response_code(),
            Self::Exhausted { .. } => ResponseCode::IssuerUnavailable,
            Self::DeadlineExpired { .. } => ResponseCode::Timeout,
            Self::Unroutable => ResponseCode::IssuerUnavailable,
        }
    }
}

pub struct Dispatcher {
    table: Arc<RoutingTable>,
    health: Arc<EndpointHealthStore>,
    connector: Arc<dyn EndpointConnector>,
    bus: Arc<dyn EventPublisher>,
    locks: TraceLocks,
    config: DispatcherConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        table: Arc<RoutingTable>,
        health: Arc<EndpointHealthStore>,
        connector: Arc<dyn EndpointConnector>,
        bus: Arc<dyn EventPublisher>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            table,
            health,
            connector,
            bus,
            locks: TraceLocks::new(),
            config,
        }
    }

    /// Routes one admitted transaction to a terminal outcome.
    ///
    /// Holds the per-trace-key lock for the whole fallback loop, so retries
    /// of the same trace are strictly sequential and a replayed request
    /// waits behind the original instead of racing it.
    pub async fn dispatch(&self, admitted: &AdmittedTransaction, deadline: Instant) -> RouteOutcome {
        let _serial = self.locks.acquire(&admitted.trace).await;

        let Some(rule) = self.select_rule(admitted) else {
            warn!(trace = %admitted.trace, "no routable rule matched");
            return RouteOutcome::Unroutable;
        };

        let candidates: Vec<EndpointId> = rule
            .endpoints
            .iter()
            .filter(|e| self.health.is_routable(e))
            .cloned()
            .collect();

        self.bus
            .publish(SwitchEvent::RouteSelected {
                trace: admitted.trace.clone(),
                rule: rule.name.clone(),
                candidates: candidates.clone(),
            })
            .await;

        self.fallback_loop(admitted, &candidates, deadline).await
    }

    /// First rule whose predicate matches and that has at least one
    /// routable endpoint. A matching rule whose endpoints are all down is
    /// skipped so lower-priority rules can absorb its traffic.
    fn select_rule(&self, admitted: &AdmittedTransaction) -> Option<RoutingRule> {
        let snapshot = self.table.snapshot();
        let selected = snapshot
            .matching(&admitted.message)
            .find(|rule| rule.endpoints.iter().any(|e| self.health.is_routable(e)))
            .cloned();
        selected
    }

    async fn fallback_loop(
        &self,
        admitted: &AdmittedTransaction,
        candidates: &[EndpointId],
        deadline: Instant,
    ) -> RouteOutcome {
        let mut attempts: u8 = 0;
        // Round-robin over the candidate list until the attempt budget or
        // the deadline runs out. The trace key never changes between
        // attempts; downstream deduplication pairs retries by it.
        let mut order = candidates.iter().cycle();
        while attempts < self.config.max_attempts {
            let Some(endpoint) = order.next() else {
                break;
            };
            let now = Instant::now();
            if now >= deadline {
                return RouteOutcome::DeadlineExpired { attempts };
            }
            let budget = self.config.attempt_timeout().min(deadline - now);
            attempts += 1;

            let result = tokio::time::timeout(
                budget,
                self.connector.authorize(endpoint, &admitted.message),
            )
            .await
            .unwrap_or(Err(EndpointError::Timeout));

            match result {
                Ok(decision) if self.is_terminal(&decision) => {
                    if let Some((from, to)) = self.health.record_success(endpoint) {
                        self.publish_health(endpoint, from, to).await;
                    }
                    debug!(trace = %admitted.trace, endpoint = %endpoint.0, attempts, "terminal decision");
                    self.bus
                        .publish(SwitchEvent::AuthorizationDecided {
                            trace: admitted.trace.clone(),
                            endpoint: endpoint.clone(),
                            decision,
                        })
                        .await;
                    return RouteOutcome::Decided {
                        endpoint: endpoint.clone(),
                        decision,
                        attempts,
                    };
                }
                Ok(soft) => {
                    // Soft decline: endpoint answered but asked us to try
                    // elsewhere. Degrades its health like a failure.
                    debug!(trace = %admitted.trace, endpoint = %endpoint.0, ?soft, "soft decline");
                    let next = order.clone().next();
                    self.note_soft_failure(admitted, endpoint, attempts, next).await;
                }
                Err(err) => {
                    debug!(trace = %admitted.trace, endpoint = %endpoint.0, %err, "attempt failed");
                    let next = order.clone().next();
                    self.note_soft_failure(admitted, endpoint, attempts, next).await;
                }
            }
        }
        info!(trace = %admitted.trace, attempts, "fallback attempts exhausted");
        RouteOutcome::Exhausted { attempts }
    }

    fn is_terminal(&self, decision: &Decision) -> bool {
        match decision {
            Decision::Approved => true,
            Decision::Declined(code) => !code.is_soft_failure(),
        }
    }

    async fn note_soft_failure(
        &self,
        admitted: &AdmittedTransaction,
        failed: &EndpointId,
        attempt: u8,
        next: Option<&EndpointId>,
    ) {
        if let Some((from, to)) = self.health.record_failure(failed) {
            self.publish_health(failed, from, to).await;
        }
        if attempt < self.config.max_attempts {
            if let Some(next) = next {
                self.bus
                    .publish(SwitchEvent::FallbackAttempted {
                        trace: admitted.trace.clone(),
                        failed: failed.clone(),
                        next: next.clone(),
                        attempt,
                    })
                    .await;
            }
        }
    }

    async fn publish_health(
        &self,
        endpoint: &EndpointId,
        from: shared_types::HealthState,
        to: shared_types::HealthState,
    ) {
        self.bus
            .publish(SwitchEvent::EndpointHealthChanged {
                endpoint: endpoint.clone(),
                from,
                to,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::ScriptedConnector;
    use ps_03_broker::Classification;
    use shared_bus::{EventFilter, InMemoryEventBus};
    use shared_types::{
        slots, ChannelId, FieldValue, HealthState, MessageCategory, MessageFunction,
        MessageOrigin, Mti, RoutePredicate, TraceKey, TransactionMessage,
    };
    use std::time::Duration;

    fn ep(name: &str) -> EndpointId {
        EndpointId(name.to_string())
    }

    fn admitted(stan: u32) -> AdmittedTransaction {
        let message = TransactionMessage::new(Mti::new(
            MessageCategory::Authorization,
            MessageFunction::Request,
            MessageOrigin::Acquirer,
        ))
            .with(
                slots::ACCOUNT_REF,
                FieldValue::Variable(b"4532015112830366".to_vec()),
            )
            .with(slots::AMOUNT, FieldValue::Numeric { value: 2_500, width: 12 })
            .with(slots::TIMESTAMP, FieldValue::Numeric { value: 1_700_000_000, width: 10 })
            .with(slots::STAN, FieldValue::Numeric { value: u64::from(stan), width: 6 });
        AdmittedTransaction {
            trace: TraceKey::new(stan, ChannelId::new("pos-1"), 1_700_000_000),
            classification: Classification {
                category: MessageCategory::Authorization,
                priority: 0,
            },
            message,
        }
    }

    fn rule(endpoints: &[&str]) -> RoutingRule {
        RoutingRule {
            name: "default".into(),
            priority: 10,
            predicate: RoutePredicate::default(),
            endpoints: endpoints.iter().map(|e| ep(e)).collect(),
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        connector: Arc<ScriptedConnector>,
        health: Arc<EndpointHealthStore>,
        bus: Arc<InMemoryEventBus>,
    }

    fn fixture(rules: Vec<RoutingRule>) -> Fixture {
        let health = Arc::new(EndpointHealthStore::new());
        for rule in &rules {
            for e in &rule.endpoints {
                health.register(e);
            }
        }
        let connector = Arc::new(ScriptedConnector::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let dispatcher = Dispatcher::new(
            Arc::new(RoutingTable::new(rules)),
            Arc::clone(&health),
            Arc::clone(&connector) as Arc<dyn EndpointConnector>,
            Arc::clone(&bus) as Arc<dyn EventPublisher>,
            DispatcherConfig::default(),
        );
        Fixture {
            dispatcher,
            connector,
            health,
            bus,
        }
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn soft_failure_cascades_to_next_endpoint() {
        let f = fixture(vec![rule(&["issuer-a", "issuer-b"])]);
        f.connector.script(
            &ep("issuer-a"),
            vec![Ok(Decision::Declined(ResponseCode::IssuerUnavailable))],
        );
        f.connector.script(&ep("issuer-b"), vec![Ok(Decision::Approved)]);

        let outcome = f.dispatcher.dispatch(&admitted(1), far_deadline()).await;
        match outcome {
            RouteOutcome::Decided {
                endpoint,
                decision,
                attempts,
            } => {
                assert_eq!(endpoint, ep("issuer-b"));
                assert_eq!(decision, Decision::Approved);
                assert_eq!(attempts, 2);
            }
            other => panic!("expected decision, got {other:?}"),
        }
        // The failing endpoint's health reflects the attempt.
        assert_eq!(f.health.state_of(&ep("issuer-a")), HealthState::Degraded);
    }

    #[tokio::test]
    async fn hard_decline_stops_the_cascade() {
        let f = fixture(vec![rule(&["issuer-a", "issuer-b"])]);
        f.connector.script(
            &ep("issuer-a"),
            vec![Ok(Decision::Declined(ResponseCode::HardDecline(
                shared_types::DeclineReason::AccountBlocked,
            )))],
        );
        f.connector.script(&ep("issuer-b"), vec![Ok(Decision::Approved)]);

        let outcome = f.dispatcher.dispatch(&admitted(2), far_deadline()).await;
        match outcome {
            RouteOutcome::Decided { endpoint, attempts, .. } => {
                assert_eq!(endpoint, ep("issuer-a"));
                assert_eq!(attempts, 1);
            }
            other => panic!("expected decision, got {other:?}"),
        }
        assert_eq!(f.connector.call_count(), 1);
        // A decisive answer is endpoint success, not failure.
        assert_eq!(f.health.state_of(&ep("issuer-a")), HealthState::Healthy);
    }

    #[tokio::test]
    async fn exhaustion_after_max_attempts() {
        let f = fixture(vec![rule(&["issuer-a", "issuer-b"])]);
        let soft = Ok(Decision::Declined(ResponseCode::SoftDecline));
        f.connector.script(&ep("issuer-a"), vec![soft.clone()]);
        f.connector.script(&ep("issuer-b"), vec![soft]);

        let outcome = f.dispatcher.dispatch(&admitted(3), far_deadline()).await;
        assert_eq!(outcome, RouteOutcome::Exhausted { attempts: 3 });
        assert_eq!(outcome.response_code(), ResponseCode::IssuerUnavailable);
        assert_eq!(f.connector.call_count(), 3);
    }

    #[tokio::test]
    async fn transport_errors_count_as_soft_failures() {
        let f = fixture(vec![rule(&["issuer-a", "issuer-b"])]);
        f.connector.script(
            &ep("issuer-a"),
            vec![Err(EndpointError::Unreachable("refused".into()))],
        );
        f.connector.script(&ep("issuer-b"), vec![Ok(Decision::Approved)]);

        let outcome = f.dispatcher.dispatch(&admitted(4), far_deadline()).await;
        assert!(matches!(outcome, RouteOutcome::Decided { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn down_endpoints_are_not_candidates() {
        let f = fixture(vec![rule(&["issuer-a", "issuer-b"])]);
        f.health.set_state(&ep("issuer-a"), HealthState::Down);
        f.connector.script(&ep("issuer-b"), vec![Ok(Decision::Approved)]);

        let outcome = f.dispatcher.dispatch(&admitted(5), far_deadline()).await;
        match outcome {
            RouteOutcome::Decided { endpoint, .. } => assert_eq!(endpoint, ep("issuer-b")),
            other => panic!("expected decision, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rule_with_all_endpoints_down_is_skipped() {
        let mut specific = rule(&["issuer-a"]);
        specific.name = "specific".into();
        specific.priority = 1;
        let mut fallback = rule(&["issuer-b"]);
        fallback.name = "fallback".into();
        fallback.priority = 100;

        let f = fixture(vec![specific, fallback]);
        f.health.set_state(&ep("issuer-a"), HealthState::Down);
        f.connector.script(&ep("issuer-b"), vec![Ok(Decision::Approved)]);

        let outcome = f.dispatcher.dispatch(&admitted(6), far_deadline()).await;
        assert!(matches!(outcome, RouteOutcome::Decided { .. }));
    }

    #[tokio::test]
    async fn no_matching_rule_is_unroutable() {
        let narrow = RoutingRule {
            name: "mastercard-only".into(),
            priority: 1,
            predicate: RoutePredicate {
                account_range: Some(("510000".into(), "559999".into())),
                ..RoutePredicate::default()
            },
            endpoints: vec![ep("issuer-a")],
        };
        let f = fixture(vec![narrow]);
        let outcome = f.dispatcher.dispatch(&admitted(7), far_deadline()).await;
        assert_eq!(outcome, RouteOutcome::Unroutable);
        assert_eq!(f.connector.call_count(), 0);
        // Same code the discard path answers with for unroutable traffic.
        assert_eq!(outcome.response_code(), ResponseCode::IssuerUnavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_beats_a_slow_endpoint() {
        let f = fixture(vec![rule(&["issuer-a"])]);
        f.connector.script(&ep("issuer-a"), vec![Ok(Decision::Approved)]);
        *f.connector.delay.lock() = Some(Duration::from_secs(30));

        let deadline = Instant::now() + Duration::from_millis(500);
        let outcome = f.dispatcher.dispatch(&admitted(8), deadline).await;
        match outcome {
            RouteOutcome::Exhausted { .. } | RouteOutcome::DeadlineExpired { .. } => {}
            other => panic!("expected timeout-driven outcome, got {other:?}"),
        }
        assert_eq!(outcome.response_code().is_soft_failure(), true);
    }

    #[tokio::test]
    async fn fallback_events_reach_the_bus() {
        let f = fixture(vec![rule(&["issuer-a", "issuer-b"])]);
        let mut sub = f.bus.subscribe(EventFilter::all());
        f.connector.script(
            &ep("issuer-a"),
            vec![Ok(Decision::Declined(ResponseCode::Timeout))],
        );
        f.connector.script(&ep("issuer-b"), vec![Ok(Decision::Approved)]);

        f.dispatcher.dispatch(&admitted(9), far_deadline()).await;

        let mut saw_route_selected = false;
        let mut saw_fallback = false;
        let mut saw_decided = false;
        while let Ok(Some(event)) = sub.try_recv() {
            match event {
                SwitchEvent::RouteSelected { candidates, .. } => {
                    assert_eq!(candidates.len(), 2);
                    saw_route_selected = true;
                }
                SwitchEvent::FallbackAttempted { failed, next, attempt, .. } => {
                    assert_eq!(failed, ep("issuer-a"));
                    assert_eq!(next, ep("issuer-b"));
                    assert_eq!(attempt, 1);
                    saw_fallback = true;
                }
                SwitchEvent::AuthorizationDecided { decision, .. } => {
                    assert_eq!(decision, Decision::Approved);
                    saw_decided = true;
                }
                _ => {}
            }
        }
        assert!(saw_route_selected && saw_fallback && saw_decided);
    }

    #[tokio::test]
    async fn retries_reuse_the_original_trace_key() {
        let f = fixture(vec![rule(&["issuer-a", "issuer-b"])]);
        let mut sub = f.bus.subscribe(EventFilter::all());
        f.connector.script(
            &ep("issuer-a"),
            vec![Ok(Decision::Declined(ResponseCode::SoftDecline))],
        );
        f.connector.script(&ep("issuer-b"), vec![Ok(Decision::Approved)]);

        let tx = admitted(10);
        f.dispatcher.dispatch(&tx, far_deadline()).await;

        while let Ok(Some(event)) = sub.try_recv() {
            if let Some(trace) = event.trace() {
                assert_eq!(trace, &tx.trace);
            }
        }
    }
}
