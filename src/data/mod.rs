//! In-memory telemetry history for the display layer.
pub mod rolling_buffer;

pub use rolling_buffer::{BufferView, RollingBuffer, DEFAULT_CAPACITY};
