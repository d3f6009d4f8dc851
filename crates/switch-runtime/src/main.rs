use anyhow::Context;
use tracing::info;

use switch_runtime::config::SwitchConfig;
use switch_runtime::SwitchRuntime;
use switch_telemetry::{init_telemetry, TelemetryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _metrics = init_telemetry(&TelemetryConfig::from_env())
        .context("failed to initialise telemetry")?;

    let config_path =
        std::env::var("PS_CONFIG").unwrap_or_else(|_| "switch.json".to_string());
    let config = SwitchConfig::load(&config_path)
        .with_context(|| format!("failed to load configuration from {config_path}"))?;

    info!(
        listen_addr = %config.network.listen_addr,
        metrics_port = config.network.metrics_port,
        rules = config.routing.len(),
        "Configuration loaded"
    );

    let runtime = SwitchRuntime::new(config)?;
    runtime.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    runtime.shutdown();
    // Give in-flight connections a moment to drain before the process exits.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    info!("Shutdown complete");
    Ok(())
}
