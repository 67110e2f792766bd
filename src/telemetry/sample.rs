//! Decoded telemetry records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One measured quantity carried on the telemetry link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Altitude above the launch site, metres.
    Altitude,
    /// Vertical velocity, m/s (positive up).
    Velocity,
    /// Vertical acceleration, m/s².
    Acceleration,
    /// Air temperature, °C.
    Temperature,
    /// Static pressure, kPa.
    Pressure,
}

impl Channel {
    /// Every channel, in wire/display order.
    pub const ALL: [Channel; 5] = [
        Channel::Altitude,
        Channel::Velocity,
        Channel::Acceleration,
        Channel::Temperature,
        Channel::Pressure,
    ];

    /// Key used for this channel in wire records.
    pub fn key(self) -> &'static str {
        match self {
            Channel::Altitude => "altitude",
            Channel::Velocity => "velocity",
            Channel::Acceleration => "acceleration",
            Channel::Temperature => "temperature",
            Channel::Pressure => "pressure",
        }
    }

    /// Display unit.
    pub fn unit(self) -> &'static str {
        match self {
            Channel::Altitude => "m",
            Channel::Velocity => "m/s",
            Channel::Acceleration => "m/s²",
            Channel::Temperature => "°C",
            Channel::Pressure => "kPa",
        }
    }

    /// Position of this channel in [`Channel::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Per-channel values of one record. Each channel is independently present or absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Readings {
    /// Altitude, metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Vertical velocity, m/s.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
    /// Vertical acceleration, m/s².
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceleration: Option<f64>,
    /// Temperature, °C.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Pressure, kPa.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

impl Readings {
    /// Value of a single channel.
    pub fn get(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Altitude => self.altitude,
            Channel::Velocity => self.velocity,
            Channel::Acceleration => self.acceleration,
            Channel::Temperature => self.temperature,
            Channel::Pressure => self.pressure,
        }
    }

    /// Overwrite a single channel.
    pub fn set(&mut self, channel: Channel, value: Option<f64>) {
        let slot = match channel {
            Channel::Altitude => &mut self.altitude,
            Channel::Velocity => &mut self.velocity,
            Channel::Acceleration => &mut self.acceleration,
            Channel::Temperature => &mut self.temperature,
            Channel::Pressure => &mut self.pressure,
        };
        *slot = value;
    }

    /// Number of channels carrying a value.
    pub fn present(&self) -> usize {
        Channel::ALL
            .iter()
            .filter(|channel| self.get(**channel).is_some())
            .count()
    }

    /// True when no channel carries a value.
    pub fn is_empty(&self) -> bool {
        self.present() == 0
    }
}

/// A validated telemetry record.
///
/// Only the line parser builds samples from wire data; the constructor refuses a record
/// with no channel present, so every `Sample` carries at least one value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    timestamp: f64,
    #[serde(flatten)]
    readings: Readings,
}

impl Sample {
    /// Build a sample stamped `timestamp` seconds after connect.
    ///
    /// Returns `None` when `readings` is empty.
    pub fn new(timestamp: f64, readings: Readings) -> Option<Self> {
        if readings.is_empty() {
            return None;
        }
        Some(Self {
            timestamp,
            readings,
        })
    }

    /// Seconds since the link was connected.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// All channel values.
    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    /// Value of one channel, if present in this record.
    pub fn value(&self, channel: Channel) -> Option<f64> {
        self.readings.get(channel)
    }

    /// Altitude, if present.
    pub fn altitude(&self) -> Option<f64> {
        self.readings.altitude
    }

    /// Velocity, if present.
    pub fn velocity(&self) -> Option<f64> {
        self.readings.velocity
    }

    /// Acceleration, if present.
    pub fn acceleration(&self) -> Option<f64> {
        self.readings.acceleration
    }
}
