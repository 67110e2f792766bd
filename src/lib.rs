//! # Ground Station Core Library
//!
//! Ingests newline-delimited JSON telemetry from a model rocket (over a serial radio link,
//! a TCP bridge, or a built-in simulator), keeps a fixed-size rolling history of it, infers
//! the current flight phase, and publishes an immutable snapshot of all of that at a fixed
//! refresh rate for display.
//!
//! ## Crate Structure
//!
//! - **`telemetry`**: the `Sample` record and the wire-line parser.
//! - **`data`**: the bounded `RollingBuffer` and its `BufferView` copies.
//! - **`flight`**: `FlightPhase` and the `PhaseDetector` state machine.
//! - **`sources`**: the `TelemetrySource` trait and the simulator, serial and network
//!   adapters.
//! - **`pump`**: the fixed-cadence refresh loop, the connection handle and `Snapshot`.
//! - **`config`**: layered configuration (`figment`).
//! - **`logging`**: `tracing-subscriber` initialization.
//! - **`error`**: the `TelemetryError` enum shared by all of the above.
//!
//! ## Data flow
//!
//! ```text
//! source ──lines──▶ parser ──Sample──▶ RollingBuffer
//!                                  └──▶ PhaseDetector
//!            pump tick ──▶ Arc<Snapshot> ──watch──▶ display
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod flight;
pub mod logging;
pub mod pump;
pub mod sources;
pub mod telemetry;

pub use error::{AppResult, TelemetryError};
