//! Configuration management for AutoRecon.
//!
//! Services and simulators share one TOML file. Keys are kebab-case:
//!
//! ```toml
//! lattice-endpoint = "example.lattice.host"
//! environment-token = "<ENVIRONMENT_TOKEN>"
//! sandboxes-token = "<SANDBOXES_TOKEN>"
//!
//! [arbiter]
//! entity-update-rate-ms = 100
//! stream-backoff-secs = 30
//!
//! [logging]
//! level = "debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::error::{CoreError, Result};

/// Placeholder shipped in sample configs for the sandbox token
pub const SANDBOXES_TOKEN_PLACEHOLDER: &str = "<SANDBOXES_TOKEN>";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub lattice_endpoint: String,
    #[serde(default)]
    pub environment_token: String,
    #[serde(default)]
    pub sandboxes_token: Option<String>,
    #[serde(default)]
    pub arbiter: ArbiterSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Timing knobs for the arbitration loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ArbiterSettings {
    /// Pause between successive long-poll requests
    pub entity_update_rate_ms: u64,
    /// Fixed delay before reconnecting the entity stream after a fault
    pub stream_backoff_secs: u64,
    /// Fixed delay before re-listening for task statuses after a fault
    pub status_backoff_secs: u64,
    /// Per-request timeout for platform calls
    pub request_timeout_secs: u64,
    /// Pause between task lookups when statuses are polled
    pub status_poll_interval_ms: u64,
    /// Capacity of the reader -> dispatcher channel
    pub channel_capacity: usize,
}

impl ArbiterSettings {
    pub fn entity_update_rate(&self) -> Duration {
        Duration::from_millis(self.entity_update_rate_ms)
    }

    pub fn stream_backoff(&self) -> Duration {
        Duration::from_secs(self.stream_backoff_secs)
    }

    pub fn status_backoff(&self) -> Duration {
        Duration::from_secs(self.status_backoff_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }
}

impl Default for ArbiterSettings {
    fn default() -> Self {
        Self {
            entity_update_rate_ms: 100,
            stream_backoff_secs: 30,
            status_backoff_secs: 5,
            request_timeout_secs: 30,
            status_poll_interval_ms: 1000,
            channel_capacity: 256,
        }
    }
}

/// Settings read by the simulated asset and track
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SimulationSettings {
    pub asset_id: String,
    pub asset_latitude: Option<f64>,
    pub asset_longitude: Option<f64>,
    pub track_latitude: Option<f64>,
    pub track_longitude: Option<f64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            asset_id: "asset-01".to_string(),
            asset_latitude: None,
            asset_longitude: None,
            track_latitude: None,
            track_longitude: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Read and validate a TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs missing connection details and normalize the sandbox token.
    pub fn validate(&mut self) -> Result<()> {
        if self.lattice_endpoint.trim().is_empty() {
            return Err(CoreError::Config("missing lattice-endpoint".to_string()));
        }
        if self.environment_token.trim().is_empty() {
            return Err(CoreError::Config("missing environment-token".to_string()));
        }

        let sandbox_unset = match self.sandboxes_token.as_deref() {
            None => true,
            Some(token) => token.trim().is_empty() || token == SANDBOXES_TOKEN_PLACEHOLDER,
        };
        if sandbox_unset {
            warn!("sandboxes-token not set - required for connecting to Lattice Sandboxes");
            self.sandboxes_token = None;
        }

        Ok(())
    }

    /// Asset coordinates, required by the simulated asset
    pub fn asset_location(&self) -> Result<(f64, f64)> {
        let latitude = self
            .simulation
            .asset_latitude
            .ok_or_else(|| CoreError::Config("missing asset-latitude".to_string()))?;
        let longitude = self
            .simulation
            .asset_longitude
            .ok_or_else(|| CoreError::Config("missing asset-longitude".to_string()))?;
        Ok((latitude, longitude))
    }

    /// Track coordinates, required by the simulated track
    pub fn track_location(&self) -> Result<(f64, f64)> {
        let latitude = self
            .simulation
            .track_latitude
            .ok_or_else(|| CoreError::Config("missing track-latitude".to_string()))?;
        let longitude = self
            .simulation
            .track_longitude
            .ok_or_else(|| CoreError::Config("missing track-longitude".to_string()))?;
        Ok((latitude, longitude))
    }
}

/// Extract the path following `--config` from process arguments
pub fn config_path_from_args<I, S>(args: I) -> Result<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg.as_ref() == "--config" {
            return match args.next() {
                Some(path) => Ok(PathBuf::from(path.as_ref())),
                None => Err(CoreError::Config(
                    "--config was provided without a path".to_string(),
                )),
            };
        }
    }

    Err(CoreError::Config(
        "missing required --config <path> argument".to_string(),
    ))
}
