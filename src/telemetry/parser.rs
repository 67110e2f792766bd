//! Line parser for the newline-delimited telemetry wire format.
//!
//! Each line is a flat JSON object such as
//! `{"altitude": 150.5, "velocity": 45.2, "acceleration": 2.1}`. Keys outside the known
//! channel set are ignored. Integers are accepted and widened to `f64`; `null` is treated
//! the same as an absent key.
//!
//! Parsing is total: [`parse_line`] returns either a [`Sample`] or a [`Rejection`] and
//! never panics, whatever bytes arrive on the link.

use crate::error::TelemetryError;
use crate::telemetry::sample::{Channel, Readings, Sample};
use serde_json::Value;
use std::fmt;

/// Why a line was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// Empty line or not a well-formed key/value record.
    Parse,
    /// Well-formed, but no usable numeric channel (or a channel with the wrong type).
    Schema,
}

/// A line that did not yield a sample, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Failure class.
    pub kind: RejectionKind,
    /// Operator-facing explanation.
    pub reason: String,
}

impl Rejection {
    fn parse(reason: impl Into<String>) -> Self {
        Self {
            kind: RejectionKind::Parse,
            reason: reason.into(),
        }
    }

    fn schema(reason: impl Into<String>) -> Self {
        Self {
            kind: RejectionKind::Schema,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            RejectionKind::Parse => write!(f, "ParseError: {}", self.reason),
            RejectionKind::Schema => write!(f, "SchemaError: {}", self.reason),
        }
    }
}

impl From<Rejection> for TelemetryError {
    fn from(value: Rejection) -> Self {
        match value.kind {
            RejectionKind::Parse => TelemetryError::Parse(value.reason),
            RejectionKind::Schema => TelemetryError::Schema(value.reason),
        }
    }
}

/// Decode one raw line into a sample stamped `timestamp`.
pub fn parse_line(line: &str, timestamp: f64) -> Result<Sample, Rejection> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(Rejection::parse("empty line"));
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| Rejection::parse(format!("malformed record: {e}")))?;

    let fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(Rejection::parse(format!(
                "expected a key/value record, got {}",
                describe(&other)
            )))
        }
    };

    let mut readings = Readings::default();
    for channel in Channel::ALL {
        match fields.get(channel.key()) {
            None | Some(Value::Null) => {}
            Some(Value::Number(number)) => {
                let converted = number.as_f64().ok_or_else(|| {
                    Rejection::schema(format!("'{channel}' value {number} is out of range"))
                })?;
                readings.set(channel, Some(converted));
            }
            Some(other) => {
                return Err(Rejection::schema(format!(
                    "'{channel}' must be numeric, got {}",
                    describe(other)
                )));
            }
        }
    }

    Sample::new(timestamp, readings)
        .ok_or_else(|| Rejection::schema("record has no recognized telemetry channel"))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
