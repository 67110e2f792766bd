//! Flight phases and the per-flight state record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of flight, ordered by physical causality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightPhase {
    /// On the pad.
    PreLaunch,
    /// Motor burning.
    PoweredAscent,
    /// Motor burnt out, still climbing.
    Coasting,
    /// Vertical velocity reached zero.
    Apogee,
    /// Falling.
    Descent,
    /// Back on the ground. Terminal.
    Landed,
}

impl FlightPhase {
    /// Every phase in flight order.
    pub const ORDER: [FlightPhase; 6] = [
        FlightPhase::PreLaunch,
        FlightPhase::PoweredAscent,
        FlightPhase::Coasting,
        FlightPhase::Apogee,
        FlightPhase::Descent,
        FlightPhase::Landed,
    ];

    /// Operator-facing label.
    pub fn label(self) -> &'static str {
        match self {
            FlightPhase::PreLaunch => "Pre-Launch",
            FlightPhase::PoweredAscent => "Powered Ascent",
            FlightPhase::Coasting => "Coasting",
            FlightPhase::Apogee => "Apogee",
            FlightPhase::Descent => "Descent",
            FlightPhase::Landed => "Landed",
        }
    }

    /// True for the phase no transition leaves.
    pub fn is_terminal(self) -> bool {
        self == FlightPhase::Landed
    }

    /// True once the vehicle has left the pad.
    pub fn has_launched(self) -> bool {
        self > FlightPhase::PreLaunch
    }
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classified state of the current flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlightState {
    /// Current phase.
    pub phase: FlightPhase,
    /// Timestamp (seconds since connect) at which `phase` was entered.
    pub phase_entered_at: f64,
    /// Timestamp of launch detection, once launched.
    pub launch_time: Option<f64>,
}

impl Default for FlightState {
    fn default() -> Self {
        Self {
            phase: FlightPhase::PreLaunch,
            phase_entered_at: 0.0,
            launch_time: None,
        }
    }
}

/// One recorded phase change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseTransition {
    /// Phase left.
    pub from: FlightPhase,
    /// Phase entered.
    pub to: FlightPhase,
    /// Timestamp of the sample that triggered the change.
    pub at: f64,
}
