//! Telemetry Source Adapters
//!
//! A source adapter produces raw wire lines. The pump never cares where they come from;
//! it only drives the three-step capability defined by [`TelemetrySource`]:
//!
//! - `start` opens the link. It succeeds or fails as a whole; a failed start leaves
//!   nothing open.
//! - `read_line` waits for the next line. `Ok(None)` means nothing is available right
//!   now. An `Err` is a transport failure and ends the session.
//! - `stop` releases the link. It is safe to call at any time, including after a failed
//!   or missing `start`. A stopped adapter is spent: reconnecting needs a fresh instance.
//!
//! The set of adapters is closed and small:
//!
//! - [`SimulatorSource`] - deterministic synthetic flight, no external resource
//! - [`SerialSource`] - character device at a recognized baud rate (feature `serial_source`)
//! - [`NetworkSource`] - TCP stream
//!
//! Adapters are built from a [`SourceConfig`], which is also the `[source]` table of the
//! configuration file.

mod line_reader;
pub mod network;
#[cfg(feature = "serial_source")]
pub mod serial;
pub mod simulator;

pub use network::NetworkSource;
#[cfg(feature = "serial_source")]
pub use serial::SerialSource;
pub use simulator::SimulatorSource;

use crate::error::{AppResult, TelemetryError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Baud rates accepted for serial links.
pub const SUPPORTED_BAUD_RATES: [u32; 4] = [9600, 38400, 57600, 115200];

/// Default serial baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Capability shared by every telemetry source.
#[async_trait]
pub trait TelemetrySource: Send {
    /// Human-readable description of the link, e.g. `"/dev/ttyUSB0 @ 9600 baud"`.
    fn describe(&self) -> String;

    /// Open the link.
    async fn start(&mut self) -> AppResult<()>;

    /// Next raw line, `Ok(None)` when nothing is available right now.
    async fn read_line(&mut self) -> AppResult<Option<String>>;

    /// Release the link. Never fails.
    async fn stop(&mut self);
}

/// Where an adapter is in its single-use life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Lifecycle {
    #[default]
    Idle,
    Running,
    Stopped,
}

impl Lifecycle {
    /// Gate for `start`: `Ok(true)` to proceed, `Ok(false)` if already running.
    pub(crate) fn begin(self, describe: &str) -> AppResult<bool> {
        match self {
            Lifecycle::Idle => Ok(true),
            Lifecycle::Running => Ok(false),
            Lifecycle::Stopped => Err(TelemetryError::Connection(format!(
                "{describe} was stopped; create a new source to reconnect"
            ))),
        }
    }

    /// Gate for `read_line`.
    pub(crate) fn ensure_running(self, describe: &str) -> AppResult<()> {
        match self {
            Lifecycle::Running => Ok(()),
            Lifecycle::Idle => Err(TelemetryError::Connection(format!(
                "{describe} has not been started"
            ))),
            Lifecycle::Stopped => Err(TelemetryError::Connection(format!(
                "{describe} is stopped"
            ))),
        }
    }
}

/// Which source to connect to, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Built-in synthetic flight.
    Simulator {
        /// Seed for measurement noise; the same seed replays the same flight.
        #[serde(default = "default_seed")]
        seed: u64,
        /// Interval between synthetic samples.
        #[serde(
            default = "default_sample_interval",
            with = "humantime_serde"
        )]
        sample_interval: Duration,
    },
    /// Serial character device.
    Serial {
        /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
        path: String,
        /// One of [`SUPPORTED_BAUD_RATES`].
        #[serde(default = "default_baud")]
        baud: u32,
    },
    /// TCP stream.
    Network {
        /// Hostname or IP address.
        host: String,
        /// TCP port.
        port: u16,
    },
}

fn default_seed() -> u64 {
    simulator::DEFAULT_SEED
}

fn default_sample_interval() -> Duration {
    simulator::DEFAULT_SAMPLE_INTERVAL
}

fn default_baud() -> u32 {
    DEFAULT_BAUD_RATE
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Simulator {
            seed: default_seed(),
            sample_interval: default_sample_interval(),
        }
    }
}

impl SourceConfig {
    /// Short name of the source kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Simulator { .. } => "simulator",
            SourceConfig::Serial { .. } => "serial",
            SourceConfig::Network { .. } => "network",
        }
    }

    /// Reject parameters no adapter could use.
    pub fn validate(&self) -> AppResult<()> {
        match self {
            SourceConfig::Simulator {
                sample_interval, ..
            } => {
                if sample_interval.is_zero() {
                    return Err(TelemetryError::Configuration(
                        "simulator sample_interval must be non-zero".to_string(),
                    ));
                }
            }
            SourceConfig::Serial { path, baud } => {
                if path.trim().is_empty() {
                    return Err(TelemetryError::Configuration(
                        "serial path must not be empty".to_string(),
                    ));
                }
                if !SUPPORTED_BAUD_RATES.contains(baud) {
                    return Err(TelemetryError::Configuration(format!(
                        "Unsupported baud rate {baud}. Must be one of: {SUPPORTED_BAUD_RATES:?}"
                    )));
                }
            }
            SourceConfig::Network { host, port } => {
                if host.trim().is_empty() {
                    return Err(TelemetryError::Configuration(
                        "network host must not be empty".to_string(),
                    ));
                }
                if *port == 0 {
                    return Err(TelemetryError::Configuration(
                        "network port must be non-zero".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Construct a fresh, unstarted adapter.
    ///
    /// `connect_timeout` bounds the network handshake.
    pub fn build(&self, connect_timeout: Duration) -> AppResult<Box<dyn TelemetrySource>> {
        self.validate()?;
        match self {
            SourceConfig::Simulator {
                seed,
                sample_interval,
            } => Ok(Box::new(SimulatorSource::new(*seed, *sample_interval))),
            #[cfg(feature = "serial_source")]
            SourceConfig::Serial { path, baud } => {
                Ok(Box::new(SerialSource::new(path.clone(), *baud)))
            }
            #[cfg(not(feature = "serial_source"))]
            SourceConfig::Serial { .. } => Err(TelemetryError::SerialFeatureDisabled),
            SourceConfig::Network { host, port } => Ok(Box::new(
                NetworkSource::new(host.clone(), *port).with_connect_timeout(connect_timeout),
            )),
        }
    }
}
