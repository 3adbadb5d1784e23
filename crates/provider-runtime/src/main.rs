//! # Blank Provider
//!
//! A provider with no business logic: it reads host data from stdin, answers
//! health checks, tracks links and stops on a host shutdown message or
//! Ctrl+C. Useful as a starting point and for exercising a host.

use anyhow::{Context, Result};
use lattice_telemetry::{init_logging, TelemetryConfig};
use provider_runtime::{
    lattice_connector, Bootstrapper, ProviderConfig, ProviderHandlers, ProviderRuntime,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let host = Bootstrapper::stdin()
        .read_host_data()
        .await
        .context("Failed to read host data")?;

    if let Err(e) = init_logging(&TelemetryConfig::from_host_data(&host)) {
        eprintln!("Logging not initialized: {e}");
    }

    let connector = lattice_connector(&host).context("Invalid lattice credentials")?;
    let runtime = ProviderRuntime::connect(
        host,
        ProviderConfig::new("wasmcloud:blank"),
        ProviderHandlers::new(),
        &connector,
    )
    .await
    .context("Failed to connect to the lattice")?;
    runtime.launch().await?;

    info!("Provider is running. Press Ctrl+C to stop.");
    tokio::select! {
        _ = runtime.wait_terminated() => {}
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Interrupt received");
            runtime.shutdown().await;
        }
    }

    Ok(())
}
