//! In-process endpoint connector.
//!
//! Production deployments talk to issuer endpoints over the network; the
//! bundled runtime runs one authorizer instance per configured endpoint
//! behind the same [`EndpointConnector`] port, which keeps the dispatcher
//! oblivious to where decisions come from.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use ps_04_dispatcher::{EndpointConnector, EndpointError, EndpointProber};
use ps_05_authorizer::Authorizer;
use shared_types::{Decision, EndpointId, TransactionMessage};

pub struct InProcessEndpoints {
    authorizers: HashMap<EndpointId, Arc<Authorizer>>,
    /// Endpoints currently simulating an outage; probes and calls fail.
    offline: RwLock<HashSet<EndpointId>>,
}

impl InProcessEndpoints {
    #[must_use]
    pub fn new(authorizers: HashMap<EndpointId, Arc<Authorizer>>) -> Self {
        Self {
            authorizers,
            offline: RwLock::new(HashSet::new()),
        }
    }

    /// Marks an endpoint offline or back online. Used by operational
    /// tooling and integration tests to exercise failover.
    pub fn set_offline(&self, endpoint: &EndpointId, offline: bool) {
        if offline {
            self.offline.write().insert(endpoint.clone());
        } else {
            self.offline.write().remove(endpoint);
        }
    }

    fn is_offline(&self, endpoint: &EndpointId) -> bool {
        self.offline.read().contains(endpoint)
    }
}

#[async_trait]
impl EndpointConnector for InProcessEndpoints {
    async fn authorize(
        &self,
        endpoint: &EndpointId,
        message: &TransactionMessage,
    ) -> Result<Decision, EndpointError> {
        if self.is_offline(endpoint) {
            return Err(EndpointError::Unreachable(format!(
                "{endpoint} is offline"
            )));
        }
        let authorizer = self
            .authorizers
            .get(endpoint)
            .ok_or_else(|| EndpointError::Unreachable(format!("{endpoint} is not configured")))?;
        Ok(authorizer.authorize(message).await)
    }
}

#[async_trait]
impl EndpointProber for InProcessEndpoints {
    async fn probe(&self, endpoint: &EndpointId) -> Result<Duration, EndpointError> {
        if self.is_offline(endpoint) || !self.authorizers.contains_key(endpoint) {
            return Err(EndpointError::Unreachable("probe refused".into()));
        }
        Ok(Duration::ZERO)
    }
}
