//! Telemetry configuration.

/// Configuration for logging output.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log level filter (`trace`..`error`, or a full `EnvFilter` directive).
    pub log_level: String,
    /// Emit JSON-formatted logs for log aggregation.
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Reads configuration from `PS_LOG_LEVEL` and `PS_LOG_JSON`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: std::env::var("PS_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logs: std::env::var("PS_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.json_logs),
        }
    }
}
