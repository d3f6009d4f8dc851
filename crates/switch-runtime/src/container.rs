//! Subsystem container with dependency injection.
//!
//! Initialization order follows the dependency levels:
//!
//! 1. Shared infrastructure: event bus, channel keyring.
//! 2. Stateless subsystems: broker, null router.
//! 3. Stateful stores: endpoint health, account directory, ledger.
//! 4. Composites: authorizers, dispatcher, processor.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use ps_02_channel::ChannelKeyring;
use ps_03_broker::Broker;
use ps_04_dispatcher::{Dispatcher, EndpointHealthStore, RoutingTable};
use ps_05_authorizer::{Authorizer, HeuristicScorer, InMemoryDirectory};
use ps_06_thp::{InMemoryLedger, Processor};
use ps_07_null_router::NullRouter;
use shared_bus::{EventPublisher, InMemoryEventBus};

use crate::config::{ConfigError, SwitchConfig};
use crate::connector::InProcessEndpoints;

/// All initialized subsystems, shared across the server and background
/// tasks.
pub struct SwitchContainer {
    pub config: SwitchConfig,
    pub bus: Arc<InMemoryEventBus>,
    pub keyring: ChannelKeyring,
    pub broker: Broker,
    pub health: Arc<EndpointHealthStore>,
    pub routing: Arc<RoutingTable>,
    pub endpoints: Arc<InProcessEndpoints>,
    pub dispatcher: Dispatcher,
    pub ledger: Arc<InMemoryLedger>,
    pub processor: Processor,
    pub null_router: NullRouter,
}

impl SwitchContainer {
    pub fn new(config: SwitchConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        // Level 1: shared infrastructure.
        let bus = Arc::new(InMemoryEventBus::new());
        let keyring = config.keyring()?;

        // Level 2: stateless subsystems.
        let broker = Broker::new(config.admission.clone());
        let null_router = NullRouter::new(Arc::clone(&bus) as Arc<dyn EventPublisher>);

        // Level 3: stateful stores.
        let health = Arc::new(EndpointHealthStore::new());
        for endpoint in config.endpoint_ids() {
            health.register(&endpoint);
        }
        let routing = Arc::new(RoutingTable::new(config.routing.clone()));

        let directory = Arc::new(InMemoryDirectory::new());
        for (account_ref, record) in &config.accounts {
            directory.insert(account_ref.clone(), record.clone());
        }
        let ledger = Arc::new(InMemoryLedger::new());
        for (account_ref, balance) in &config.opening_balances {
            ledger.credit(account_ref.clone(), *balance);
        }

        // Level 4: composites. One authorizer per endpoint, all sharing
        // the directory, so endpoint failover models issuer replicas.
        let mut authorizers = HashMap::new();
        for endpoint in config.endpoint_ids() {
            let transport = config.transport_of(&endpoint).unwrap_or("in-process");
            info!(endpoint = %endpoint, transport, "Endpoint configured");
            let authorizer = Authorizer::new(
                Arc::clone(&directory) as Arc<dyn ps_05_authorizer::AccountDirectory>,
                Arc::new(HeuristicScorer::default()),
                config.authorizer.clone(),
            );
            authorizers.insert(endpoint, Arc::new(authorizer));
        }
        let endpoints = Arc::new(InProcessEndpoints::new(authorizers));

        let dispatcher = Dispatcher::new(
            Arc::clone(&routing),
            Arc::clone(&health),
            Arc::clone(&endpoints) as Arc<dyn ps_04_dispatcher::EndpointConnector>,
            Arc::clone(&bus) as Arc<dyn EventPublisher>,
            config.dispatcher.clone(),
        );
        let processor = Processor::new(
            Arc::clone(&ledger) as Arc<dyn ps_06_thp::LedgerPort>,
            Arc::clone(&bus) as Arc<dyn EventPublisher>,
        );

        info!(
            channels = config.admission.channels.len(),
            rules = config.routing.len(),
            endpoints = config.endpoint_ids().len(),
            "Switch container initialized"
        );

        Ok(Self {
            config,
            bus,
            keyring,
            broker,
            health,
            routing,
            endpoints,
            dispatcher,
            ledger,
            processor,
            null_router,
        })
    }
}
