//! # Payment Switch Runtime
//!
//! Wires the subsystem crates into a running switch:
//!
//! - `config` - unified configuration with file and env sources
//! - `container` - subsystem container with dependency injection
//! - `connector` - in-process endpoint connector and prober
//! - `pipeline` - the end-to-end transaction pipeline
//! - `server` - ingress TCP listener
//! - `wiring` - background tasks (health checker, metrics mirror)
//!
//! ```text
//!   TCP ingress ─▶ channel adapter ─▶ pipeline ─▶ response
//!                                       │
//!                  event bus ◀──────────┘
//!                     │
//!            metrics mirror / health checker (background)
//! ```

pub mod config;
pub mod connector;
pub mod container;
pub mod pipeline;
pub mod server;
pub mod wiring;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{error, info};

use ps_04_dispatcher::{EndpointProber, HealthChecker};
use shared_bus::EventPublisher;

use crate::config::SwitchConfig;
use crate::container::SwitchContainer;
use crate::pipeline::SwitchPipeline;
use crate::server::IngressServer;

/// The running switch: container plus background task lifecycle.
pub struct SwitchRuntime {
    container: Arc<SwitchContainer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl SwitchRuntime {
    pub fn new(config: SwitchConfig) -> Result<Self> {
        let container = Arc::new(SwitchContainer::new(config)?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            container,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Starts background tasks and the ingress server. Returns once the
    /// listener is spawned; the server runs until shutdown.
    pub fn start(&self) {
        info!("===========================================");
        info!("  Payment Switch v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        // Health checker probes endpoints and owns down/up transitions.
        let checker = HealthChecker::new(
            Arc::clone(&self.container.health),
            Arc::clone(&self.container.endpoints) as Arc<dyn EndpointProber>,
            Arc::clone(&self.container.bus) as Arc<dyn EventPublisher>,
            self.container.config.health.clone(),
        );
        tokio::spawn(checker.run(self.shutdown_rx.clone()));

        // Mirror bus events into Prometheus.
        tokio::spawn(wiring::run_metrics_mirror(
            Arc::clone(&self.container),
            self.shutdown_rx.clone(),
        ));
        tokio::spawn(wiring::run_metrics_endpoint(
            self.container.config.network.metrics_port,
            self.shutdown_rx.clone(),
        ));

        // Ingress listener.
        let pipeline = Arc::new(SwitchPipeline::new(Arc::clone(&self.container)));
        let server = IngressServer::new(Arc::clone(&self.container), pipeline);
        let server_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = server.run(server_shutdown).await {
                error!(error = %e, "Ingress server failed");
            }
        });

        info!("All subsystems started");
    }

    /// Signals shutdown to every background task. In-flight transactions
    /// finish; new connections are refused.
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown");
        let _ = self.shutdown_tx.send(true);
    }

    #[must_use]
    pub fn container(&self) -> Arc<SwitchContainer> {
        Arc::clone(&self.container)
    }
}
