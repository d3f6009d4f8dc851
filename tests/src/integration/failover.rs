//! Cascading failover across issuer endpoints, and the health transitions
//! that routing and the background prober drive.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ps_04_dispatcher::{EndpointProber, HealthChecker, HealthCheckConfig};
    use shared_bus::{EventFilter, EventPublisher, EventTopic, SwitchEvent};
    use shared_types::{
        ChannelId, EndpointId, HealthState, ResponseCode, RoutePredicate, RoutingRule,
    };

    use crate::fixtures::{financial, response_code, switch, switch_config, OPENING_BALANCE, PAN};

    fn ep(name: &str) -> EndpointId {
        EndpointId::new(name)
    }

    #[tokio::test]
    async fn offline_primary_fails_over_to_secondary() {
        let (pipeline, container) = switch(switch_config());
        let channel = ChannelId::new("pos-1");
        let mut sub = container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Routing]));
        container.endpoints.set_offline(&ep("issuer-a"), true);

        let response = pipeline.process(financial(1), &channel).await;
        assert_eq!(response_code(&response), Some(ResponseCode::Approved));
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE - 2_500);

        // The failed attempt is visible on the bus and in health state.
        let mut saw_fallback = false;
        while let Ok(Some(event)) = sub.try_recv() {
            if let SwitchEvent::FallbackAttempted { failed, next, .. } = event {
                assert_eq!(failed, ep("issuer-a"));
                assert_eq!(next, ep("issuer-b"));
                saw_fallback = true;
            }
        }
        assert!(saw_fallback, "expected a fallback attempt on the bus");
        assert_eq!(container.health.state_of(&ep("issuer-a")), HealthState::Degraded);
        assert_eq!(container.health.state_of(&ep("issuer-b")), HealthState::Healthy);
    }

    #[tokio::test]
    async fn exhausted_candidates_decline_without_posting() {
        let (pipeline, container) = switch(switch_config());
        let channel = ChannelId::new("pos-1");
        container.endpoints.set_offline(&ep("issuer-a"), true);
        container.endpoints.set_offline(&ep("issuer-b"), true);

        let response = pipeline.process(financial(2), &channel).await;
        assert_eq!(
            response_code(&response),
            Some(ResponseCode::IssuerUnavailable)
        );
        assert_eq!(container.ledger.balance(PAN), OPENING_BALANCE);
        assert!(container.ledger.audit_log().is_empty());
    }

    #[tokio::test]
    async fn bin_specific_rule_wins_over_the_catch_all() {
        let mut config = switch_config();
        config.routing.push(RoutingRule {
            name: "visa-direct".into(),
            priority: 10,
            predicate: RoutePredicate {
                account_range: Some(("400000".into(), "499999".into())),
                ..RoutePredicate::default()
            },
            endpoints: vec![ep("issuer-visa")],
        });
        let (pipeline, container) = switch(config);
        let mut sub = container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Routing]));

        let response = pipeline.process(financial(3), &ChannelId::new("pos-1")).await;
        assert_eq!(response_code(&response), Some(ResponseCode::Approved));

        let mut selected = None;
        while let Ok(Some(event)) = sub.try_recv() {
            if let SwitchEvent::RouteSelected { rule, candidates, .. } = event {
                selected = Some((rule, candidates));
            }
        }
        let (rule, candidates) = selected.expect("route selection on the bus");
        assert_eq!(rule, "visa-direct");
        assert_eq!(candidates, vec![ep("issuer-visa")]);
    }

    #[tokio::test]
    async fn prober_takes_a_failing_endpoint_out_of_rotation() {
        let (pipeline, container) = switch(switch_config());
        let channel = ChannelId::new("pos-1");
        container.endpoints.set_offline(&ep("issuer-a"), true);

        let mut checker = HealthChecker::new(
            Arc::clone(&container.health),
            Arc::clone(&container.endpoints) as Arc<dyn EndpointProber>,
            Arc::clone(&container.bus) as Arc<dyn EventPublisher>,
            HealthCheckConfig::default(),
        );
        for _ in 0..3 {
            checker.probe_round().await;
        }
        assert_eq!(container.health.state_of(&ep("issuer-a")), HealthState::Down);

        // Down endpoints are not even attempted.
        let mut sub = container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Routing]));
        let response = pipeline.process(financial(4), &channel).await;
        assert_eq!(response_code(&response), Some(ResponseCode::Approved));
        while let Ok(Some(event)) = sub.try_recv() {
            assert!(
                !matches!(event, SwitchEvent::FallbackAttempted { .. }),
                "down endpoint must be filtered before the fallback loop"
            );
        }

        // A successful probe brings it back.
        container.endpoints.set_offline(&ep("issuer-a"), false);
        checker.probe_round().await;
        assert_eq!(
            container.health.state_of(&ep("issuer-a")),
            HealthState::Healthy
        );
    }
}
