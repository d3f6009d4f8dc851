//! Authorizer thresholds.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorizerConfig {
    /// Length of the sliding velocity window.
    pub velocity_window_secs: u64,
    /// Transactions admitted per account inside one window.
    pub velocity_max: u32,
    /// Risk scores at or above this value decline as suspected fraud.
    pub risk_threshold: f64,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            velocity_window_secs: 60,
            velocity_max: 10,
            risk_threshold: 0.8,
        }
    }
}

impl AuthorizerConfig {
    #[must_use]
    pub fn velocity_window(&self) -> Duration {
        Duration::from_secs(self.velocity_window_secs)
    }
}
