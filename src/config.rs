//! Configuration System using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. built-in defaults (every field has one)
//! 2. `config/ground_station.toml` (or a path given on the command line)
//! 3. environment variables prefixed with `GROUND_STATION_`, nested with `__`
//!
//! # Example
//! ```no_run
//! use ground_station::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! config.validate()?;
//! println!("Source: {}", config.source.kind());
//! # Ok::<(), ground_station::error::TelemetryError>(())
//! ```
//!
//! Environment example: `GROUND_STATION_PUMP__REFRESH_HZ=10`,
//! `GROUND_STATION_SOURCE__KIND=network`.

use crate::error::{AppResult, TelemetryError};
use crate::flight::PhaseThresholds;
use crate::logging::OutputFormat;
use crate::pump::PumpSettings;
use crate::sources::SourceConfig;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/ground_station.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "GROUND_STATION_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Source connected at startup
    pub source: SourceConfig,
    /// Refresh loop timing and buffer size
    pub pump: PumpSettings,
    /// Phase detector thresholds
    pub phase: PhaseThresholds,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: OutputFormat,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "Ground Station".to_string(),
            log_level: "info".to_string(),
            log_format: OutputFormat::Compact,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(TelemetryError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        self.source.validate()?;
        self.pump.validate()?;
        self.phase.validate().map_err(TelemetryError::Configuration)?;
        Ok(())
    }
}
