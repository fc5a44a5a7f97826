//! Simulated asset publisher.
//!
//! Usage: `sim-asset --config <path>`; needs `asset-latitude` and
//! `asset-longitude` under `[simulation]`.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use autorecon_core::{config_path_from_args, logging, Config};
use autorecon_lattice::LatticeClient;
use autorecon_sim::SimulatedAsset;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--version") {
        println!("sim-asset {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config_path = config_path_from_args(&args)?;
    let config = Config::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    logging::init_from_config(&config.logging);
    let location = config.asset_location()?;

    info!(asset_id = %config.simulation.asset_id, "starting simulated asset");

    let client = Arc::new(LatticeClient::new(&config).context("building lattice client")?);
    let asset = SimulatedAsset::new(
        config.simulation.asset_id.clone(),
        location,
        client.clone(),
        client.clone(),
        client,
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for shutdown signal");
        }
        info!("keyboard interrupt detected");
        signal.cancel();
    });

    asset.run(shutdown).await;
    Ok(())
}
