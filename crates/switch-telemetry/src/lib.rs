//! # Switch Telemetry
//!
//! Structured logging and Prometheus metrics for the payment switch.
//!
//! ## Components
//!
//! - Structured logs via `tracing-subscriber` (plain or JSON, env-filtered)
//! - Prometheus metrics for scraping (`ps_<subsystem>_<metric>_<unit>`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use switch_telemetry::{TelemetryConfig, init_telemetry};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _handle = init_telemetry(&config).expect("telemetry init");
//!     // Logs and metrics are now being collected.
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PS_LOG_LEVEL` | `info` | Log level filter |
//! | `PS_LOG_JSON` | `false` | Emit JSON-formatted logs |

mod config;
mod metrics;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, AUTHORIZATION_DURATION, DISPATCH_ATTEMPTS,
    ENDPOINT_HEALTH, FALLBACKS_TOTAL, LEDGER_REVERSALS, TRANSACTIONS_COMPLETED,
    TRANSACTIONS_DISCARDED, TRANSACTIONS_RECEIVED,
};

use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A tracing subscriber is already installed.
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),

    /// A metric could not be registered.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and metrics.
///
/// Returns a handle that owns the metric registry reference. Calling this
/// twice in one process fails with [`TelemetryError::SubscriberInit`].
pub fn init_telemetry(config: &TelemetryConfig) -> Result<MetricsHandle, TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if config.json_logs {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };
    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    let handle = register_metrics()?;
    tracing::info!(
        log_level = %config.log_level,
        json = config.json_logs,
        "Telemetry initialized"
    );
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }
}
