//! Structured logging infrastructure for AutoRecon.
//!
//! Centralized logging initialization with support for structured JSON
//! output and environment-based configuration.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the logging system with human-readable output.
///
/// `RUST_LOG` takes precedence over `default_level` when set.
///
/// # Example
/// ```no_run
/// use autorecon_core::logging;
///
/// logging::init("info");
/// tracing::info!("starting entity auto reconnaissance system");
/// ```
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize the logging system with JSON output for production environments.
///
/// # Example
/// ```no_run
/// use autorecon_core::logging;
///
/// logging::init_json("debug");
/// tracing::info!(service = "auto-recon", "Service started");
/// ```
pub fn init_json(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize logging from the `[logging]` config section.
pub fn init_from_config(config: &LoggingConfig) {
    if config.json {
        init_json(&config.level);
    } else {
        init(&config.level);
    }
}
