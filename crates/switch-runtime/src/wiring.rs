//! Background tasks wired at startup.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use shared_bus::{EventFilter, EventTopic, SwitchEvent};
use shared_types::{Decision, HealthState};
use switch_telemetry::{DISPATCH_ATTEMPTS, ENDPOINT_HEALTH, LEDGER_REVERSALS};

use crate::container::SwitchContainer;

/// Maps health states onto the exported gauge.
fn health_gauge_value(state: HealthState) -> f64 {
    match state {
        HealthState::Healthy => 2.0,
        HealthState::Degraded => 1.0,
        HealthState::Down => 0.0,
    }
}

/// Mirrors bus events into Prometheus gauges and counters. Runs until the
/// bus closes or shutdown is signalled.
pub async fn run_metrics_mirror(
    container: Arc<SwitchContainer>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut subscription = container.bus.subscribe(EventFilter::topics(vec![
        EventTopic::Health,
        EventTopic::Execution,
        EventTopic::Routing,
        EventTopic::Authorization,
    ]));

    // Export the initial state so dashboards see every endpoint.
    for (endpoint, state) in container.health.snapshot() {
        ENDPOINT_HEALTH
            .with_label_values(&[endpoint.as_str()])
            .set(health_gauge_value(state));
    }

    info!("Metrics mirror started");
    loop {
        let event = tokio::select! {
            event = subscription.recv() => event,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
                continue;
            }
        };
        let Some(event) = event else {
            debug!("Event bus closed; metrics mirror stopping");
            return;
        };
        match event {
            SwitchEvent::EndpointHealthChanged { endpoint, to, .. } => {
                ENDPOINT_HEALTH
                    .with_label_values(&[endpoint.as_str()])
                    .set(health_gauge_value(to));
            }
            SwitchEvent::TransactionReversed {
                reversal_confirmed, ..
            } => {
                let label = if reversal_confirmed { "true" } else { "false" };
                LEDGER_REVERSALS.with_label_values(&[label]).inc();
            }
            SwitchEvent::FallbackAttempted { failed, .. } => {
                DISPATCH_ATTEMPTS
                    .with_label_values(&[failed.as_str(), "soft_failure"])
                    .inc();
            }
            SwitchEvent::AuthorizationDecided {
                endpoint, decision, ..
            } => {
                let outcome = match decision {
                    Decision::Approved => "approved",
                    Decision::Declined(_) => "declined",
                };
                DISPATCH_ATTEMPTS
                    .with_label_values(&[endpoint.as_str(), outcome])
                    .inc();
            }
            _ => {}
        }
    }
}

/// Serves the Prometheus text exposition on a plain TCP socket.
pub async fn run_metrics_endpoint(port: u16, mut shutdown: watch::Receiver<bool>) {
    use tokio::io::AsyncWriteExt;

    let listener = match tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::warn!(port, error = %e, "Metrics endpoint failed to bind");
            return;
        }
    };
    info!(port, "Metrics endpoint started");

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
                continue;
            }
        };
        let Ok((mut stream, _)) = accepted else {
            continue;
        };
        let body = switch_telemetry::encode_metrics().unwrap_or_default();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }
}
