//! Ingress TCP server.
//!
//! One task per accepted connection. The channel adapter verifies and
//! decodes each frame; verification failures answer nothing on the wire
//! (the frame is untrusted) but are still audited through the null router.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use ps_02_channel::{ChannelAdapter, ChannelError, DeliveryOutcome, TcpChannelAdapter};
use ps_07_null_router::DiscardReason;

use crate::container::SwitchContainer;
use crate::pipeline::SwitchPipeline;

pub struct IngressServer {
    container: Arc<SwitchContainer>,
    pipeline: Arc<SwitchPipeline>,
}

impl IngressServer {
    #[must_use]
    pub fn new(container: Arc<SwitchContainer>, pipeline: Arc<SwitchPipeline>) -> Self {
        Self {
            container,
            pipeline,
        }
    }

    /// Binds the listener and serves connections until shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr = &self.container.config.network.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind ingress listener on {addr}"))?;
        info!(%addr, "Ingress listener started");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!(error = %e, "Accept failed");
                            continue;
                        }
                    };
                    debug!(%peer, "Connection accepted");
                    let container = Arc::clone(&self.container);
                    let pipeline = Arc::clone(&self.pipeline);
                    let conn_shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        serve_connection(stream, container, pipeline, conn_shutdown).await;
                    });
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Ingress listener stopping");
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    container: Arc<SwitchContainer>,
    pipeline: Arc<SwitchPipeline>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut adapter = TcpChannelAdapter::new(
        stream,
        container.config.network.framing.into(),
        container.keyring.clone(),
    );

    loop {
        let received = tokio::select! {
            received = adapter.receive() => received,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
                continue;
            }
        };
        match received {
            Ok(Some(message)) => {
                let channel = adapter.channel().clone();
                let response = pipeline.process(message, &channel).await;
                match adapter.respond(&response).await {
                    DeliveryOutcome::Delivered => {}
                    outcome => {
                        // The transaction already reached its terminal
                        // state; only the response leg is in doubt.
                        warn!(channel = %channel, ?outcome, "Response delivery not confirmed");
                    }
                }
            }
            Ok(None) => {
                debug!("Peer closed connection");
                return;
            }
            Err(ChannelError::Verification(err)) => {
                // Untrusted frame: audit, answer nothing.
                container
                    .null_router
                    .discard(None, DiscardReason::Unverified(err.to_string()))
                    .await;
            }
            Err(ChannelError::Format(err)) => {
                container
                    .null_router
                    .discard(None, DiscardReason::Malformed(err.to_string()))
                    .await;
            }
            Err(err) => {
                debug!(error = %err, "Connection failed");
                return;
            }
        }
    }
}
