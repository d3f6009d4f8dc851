//! Outbound ports of the dispatcher.

use async_trait::async_trait;
use shared_types::{Decision, EndpointId, TransactionMessage};
use std::time::Duration;

use crate::errors::EndpointError;

/// Sends an authorization request to a concrete endpoint and waits for its
/// decision. Implementations must not retry internally; the fallback loop
/// owns retry policy.
#[async_trait]
pub trait EndpointConnector: Send + Sync {
    async fn authorize(
        &self,
        endpoint: &EndpointId,
        message: &TransactionMessage,
    ) -> Result<Decision, EndpointError>;
}

/// Lightweight liveness probe used by the background health checker.
#[async_trait]
pub trait EndpointProber: Send + Sync {
    /// Returns the probe round-trip time on success.
    async fn probe(&self, endpoint: &EndpointId) -> Result<Duration, EndpointError>;
}
