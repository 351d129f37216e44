//! Engine settings loaded from `config.toml`.
//!
//! Every section is optional. A missing file means "run with defaults", which
//! matches the durations the greenhouse used before the tables were configurable.

use crate::core::dates::{DateCalculator, DurationTable};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "POLLINATION_CONFIG";

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Periodic sweep settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Days from pollination to capsule maturation
    #[serde(default = "DurationTable::maturation_defaults")]
    pub maturation: DurationTable,
    /// Days from sowing to transplant
    #[serde(default = "DurationTable::transplant_defaults")]
    pub transplant: DurationTable,
    /// Notification-side housekeeping
    #[serde(default)]
    pub inbox: InboxConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            maturation: DurationTable::maturation_defaults(),
            transplant: DurationTable::transplant_defaults(),
            inbox: InboxConfig::default(),
        }
    }
}

impl AppConfig {
    /// Builds the date calculator described by the two duration tables.
    #[must_use]
    pub fn date_calculator(&self) -> DateCalculator {
        DateCalculator::new(self.maturation.clone(), self.transplant.clone())
    }
}

/// Settings for the periodic alert sweep
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between scheduled sweeps
    pub interval_secs: u64,
    /// Extra days a confirmed record stays in the sweep after its weekly alert became due
    pub weekly_grace_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            weekly_grace_days: 7,
        }
    }
}

impl SchedulerConfig {
    /// Tick interval as a [`Duration`], never shorter than one second.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Settings for alert housekeeping on the notification side
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InboxConfig {
    /// Pending alerts older than this many days are dismissed automatically
    pub stale_after_days: i64,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            stale_after_days: 30,
        }
    }
}

/// Loads the configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads the configuration from `path`, or the built-in defaults if no such file exists.
///
/// # Errors
/// Same as [`load_config`] for a file that exists.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    if path_ref.exists() {
        load_config(path_ref)
    } else {
        info!("No configuration file at {}, using defaults", path_ref.display());
        Ok(AppConfig::default())
    }
}

/// Loads the configuration named by `POLLINATION_CONFIG` (default `./config.toml`).
///
/// A missing file is not an error; the built-in defaults are used instead.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());
    load_config_or_default(path)
}
