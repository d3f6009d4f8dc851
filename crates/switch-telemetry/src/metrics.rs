//! Prometheus metrics for switch subsystems.
//!
//! All metrics follow the naming convention: `ps_<subsystem>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: monotonically increasing (e.g., transactions_received_total)
//! - **Gauge**: goes up and down (e.g., endpoint_health)
//! - **Histogram**: distribution (e.g., authorization_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, GaugeVec, Histogram, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CHANNEL / BROKER
    // =========================================================================

    /// Total messages received across all channels
    pub static ref TRANSACTIONS_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("ps_channel_transactions_received_total", "Messages received per channel"),
        &["channel"]
    ).expect("metric creation failed");

    /// Total messages disposed of by the null router
    pub static ref TRANSACTIONS_DISCARDED: CounterVec = CounterVec::new(
        Opts::new("ps_null_router_discarded_total", "Messages discarded, by reason"),
        &["reason"]
    ).expect("metric creation failed");

    // =========================================================================
    // DISPATCHER
    // =========================================================================

    /// Delivery attempts per endpoint and outcome
    pub static ref DISPATCH_ATTEMPTS: CounterVec = CounterVec::new(
        Opts::new("ps_dispatcher_attempts_total", "Delivery attempts"),
        &["endpoint", "outcome"]  // outcome: approved/declined/soft_failure
    ).expect("metric creation failed");

    /// Cascading fallback activations
    pub static ref FALLBACKS_TOTAL: Counter = Counter::new(
        "ps_dispatcher_fallbacks_total",
        "Soft failures that triggered a fallback to the next candidate"
    ).expect("metric creation failed");

    /// Endpoint health as a gauge (2 healthy, 1 degraded, 0 down)
    pub static ref ENDPOINT_HEALTH: GaugeVec = GaugeVec::new(
        Opts::new("ps_dispatcher_endpoint_health", "Endpoint health state"),
        &["endpoint"]
    ).expect("metric creation failed");

    // =========================================================================
    // AUTHORIZER / PROCESSOR
    // =========================================================================

    /// Authorization latency distribution
    pub static ref AUTHORIZATION_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "ps_authorizer_duration_seconds",
            "Time spent producing an authorization decision"
        ).buckets(exponential_buckets(0.001, 2.0, 12).expect("bucket spec"))
    ).expect("metric creation failed");

    /// Terminal outcomes
    pub static ref TRANSACTIONS_COMPLETED: CounterVec = CounterVec::new(
        Opts::new("ps_thp_completed_total", "Terminal transaction outcomes"),
        &["outcome"]  // completed/declined/reversed/failed
    ).expect("metric creation failed");

    /// Compensating reversals synthesized for unconfirmed ledger effects
    pub static ref LEDGER_REVERSALS: CounterVec = CounterVec::new(
        Opts::new("ps_thp_reversals_total", "Compensating reversals"),
        &["confirmed"]  // true/false: whether the reversal itself acked
    ).expect("metric creation failed");
}

/// Handle proving metrics were registered. Keep it alive for the process.
pub struct MetricsHandle {
    _private: (),
}

/// Registers all switch metrics with the global registry.
///
/// Re-registration (e.g., in tests that initialize telemetry twice) is
/// tolerated: `AlreadyReg` errors are ignored.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(TRANSACTIONS_RECEIVED.clone()),
        Box::new(TRANSACTIONS_DISCARDED.clone()),
        Box::new(DISPATCH_ATTEMPTS.clone()),
        Box::new(FALLBACKS_TOTAL.clone()),
        Box::new(ENDPOINT_HEALTH.clone()),
        Box::new(AUTHORIZATION_DURATION.clone()),
        Box::new(TRANSACTIONS_COMPLETED.clone()),
        Box::new(LEDGER_REVERSALS.clone()),
    ];
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(MetricsHandle { _private: () })
}

/// Text-encodes the current metric values for a scrape endpoint.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent() {
        let _first = register_metrics().expect("first registration");
        let _second = register_metrics().expect("second registration");
    }

    #[test]
    fn counters_accumulate_and_encode() {
        let _handle = register_metrics().expect("registration");
        TRANSACTIONS_RECEIVED.with_label_values(&["atm-01"]).inc();
        FALLBACKS_TOTAL.inc();
        let text = encode_metrics().expect("encode");
        assert!(text.contains("ps_dispatcher_fallbacks_total"));
        assert!(text.contains("ps_channel_transactions_received_total"));
    }
}
