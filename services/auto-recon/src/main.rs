//! Auto reconnaissance service.
//!
//! Watches the platform entity stream and tasks the nearest friendly asset
//! to investigate every hostile, suspicious or unknown track.
//!
//! Usage: `auto-recon --config <path>`

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use autorecon_arbiter::{Arbiter, Collaborators, PollingStatusSource, TaskLifecycleTracker};
use autorecon_core::{config_path_from_args, logging, Config};
use autorecon_lattice::LatticeClient;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--version") {
        println!("auto-recon {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config_path = config_path_from_args(&args)?;
    let config = Config::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    logging::init_from_config(&config.logging);

    info!(endpoint = %config.lattice_endpoint, "starting entity auto reconnaissance system");

    let client = Arc::new(LatticeClient::new(&config).context("building lattice client")?);
    let tracker = Arc::new(TaskLifecycleTracker::new());
    let statuses = Arc::new(PollingStatusSource::new(
        client.clone(),
        tracker.clone(),
        config.arbiter.status_poll_interval(),
    ));
    let collaborators = Collaborators {
        events: client.clone(),
        entities: client.clone(),
        tasks: client,
        statuses,
    };

    let arbiter = Arbiter::with_tracker(collaborators, &config.arbiter, tracker);
    let shutdown = arbiter.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for shutdown signal");
        }
        info!("shutdown requested");
        shutdown.cancel();
    });

    arbiter.run().await?;
    info!("auto reconnaissance system stopped");
    Ok(())
}
