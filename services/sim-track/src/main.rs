//! Simulated track publisher.
//!
//! Usage: `sim-track --config <path>`; needs `track-latitude` and
//! `track-longitude` under `[simulation]`.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use autorecon_core::{config_path_from_args, logging, Config};
use autorecon_lattice::LatticeClient;
use autorecon_sim::SimulatedTrack;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--version") {
        println!("sim-track {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config_path = config_path_from_args(&args)?;
    let config = Config::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    logging::init_from_config(&config.logging);
    let location = config.track_location()?;

    let client = Arc::new(LatticeClient::new(&config).context("building lattice client")?);
    let track = SimulatedTrack::new(location, client);
    info!(entity_id = %track.entity_id(), "starting simulated track");

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for shutdown signal");
        }
        signal.cancel();
    });

    track.run(shutdown).await;
    Ok(())
}
