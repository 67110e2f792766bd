//! Telemetry records and the wire-format line parser.

pub mod parser;
pub mod sample;

pub use parser::{parse_line, Rejection, RejectionKind};
pub use sample::{Channel, Readings, Sample};
