//! Custom error types for the ground station.
//!
//! This module defines the primary error type, `TelemetryError`, shared by every stage of
//! the ingestion pipeline. Using the `thiserror` crate, it keeps the failure taxonomy in
//! one place so the pump can decide, per variant, whether a failure is local to a single
//! line or fatal to the current link.
//!
//! ## Error Hierarchy
//!
//! - **`Connection`**: A source adapter could not start, or lost its transport while
//!   reading. Fatal to the current session; the operator recovers by reconnecting.
//! - **`Parse`**: A single line is not well-formed structured text (or is empty).
//! - **`Schema`**: A line is well-formed but carries no usable telemetry channel, or a
//!   recognized channel has a non-numeric value.
//! - **`LivenessTimeout`**: The link is up but no valid sample arrived within the
//!   configured bound. Reported as a degraded link, never a crash.
//! - **`Configuration`**: Semantic errors in the configuration that pass parsing but are
//!   logically wrong (an unsupported baud rate, an empty host).
//! - **`Config`**: Wraps errors from `figment` while loading configuration files.
//! - **`Io`**: Wraps `std::io::Error`.
//!
//! Only `Parse` and `Schema` are considered line-local; see [`TelemetryError::is_line_local`].

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by the telemetry pipeline.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Adapter failed to start or lost its transport.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Line is not well-formed structured text.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Line is well-formed but carries no usable telemetry.
    #[error("Schema error: {0}")]
    Schema(String),

    /// No accepted sample within the liveness bound.
    #[error("No valid telemetry received for {0:?}")]
    LivenessTimeout(Duration),

    /// Configuration loaded but failed validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial link was requested but the crate was built without it.
    #[error("Serial support not enabled. Rebuild with --features serial_source")]
    SerialFeatureDisabled,
}

impl TelemetryError {
    /// Whether the failure only affects the line that produced it.
    ///
    /// Line-local errors are logged and skipped; everything else escalates to the
    /// connection handle.
    pub fn is_line_local(&self) -> bool {
        matches!(self, TelemetryError::Parse(_) | TelemetryError::Schema(_))
    }
}

impl From<figment::Error> for TelemetryError {
    fn from(value: figment::Error) -> Self {
        TelemetryError::Config(Box::new(value))
    }
}
