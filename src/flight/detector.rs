//! Flight-phase state machine.
//!
//! The detector consumes accepted samples one at a time and moves forward through
//! [`FlightPhase::ORDER`]. Transitions never go backwards; only [`PhaseDetector::reset`]
//! (issued by the pump on disconnect/reconnect) returns it to `PreLaunch`.
//!
//! Thresholds near zero crossings (burnout, apogee) are noisy, so every trigger except the
//! apogee crossing must hold for a short run of consecutive samples before the phase
//! changes. A sample lacking a channel a trigger needs withholds the decision: sustain
//! counters are left as they were.

use crate::flight::phase::{FlightPhase, FlightState, PhaseTransition};
use crate::telemetry::Sample;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Launch is declared once velocity exceeds this (m/s).
pub const LAUNCH_VELOCITY: f64 = 5.0;
/// Burnout is declared once acceleration drops to or below this (m/s²).
pub const BURNOUT_ACCELERATION: f64 = 0.0;
/// Descent requires velocity below `-DESCENT_DEADBAND` (m/s).
pub const DESCENT_DEADBAND: f64 = 1.0;
/// Landing requires altitude within this of the ground reference (m).
pub const LANDING_ALTITUDE_TOLERANCE: f64 = 10.0;
/// Landing is satisfied by speed below this (m/s) near the ground.
pub const LANDING_SPEED: f64 = 1.0;
/// Landing is also satisfied when altitude moves less than this per sample (m).
pub const LANDING_ALTITUDE_STEP: f64 = 0.5;
/// Consecutive samples required for launch, burnout and descent triggers.
pub const DEFAULT_SUSTAIN: u32 = 2;
/// Consecutive samples required for landing (one second at 20 Hz).
pub const LANDING_SUSTAIN: u32 = 20;

/// Tunable trigger levels for the phase detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseThresholds {
    /// Launch velocity threshold (m/s).
    pub launch_velocity: f64,
    /// Samples above `launch_velocity` required to declare launch.
    pub launch_sustain: u32,
    /// Burnout acceleration threshold (m/s²).
    pub burnout_acceleration: f64,
    /// Samples at or below `burnout_acceleration` required to declare burnout.
    pub burnout_sustain: u32,
    /// Negative-velocity deadband after apogee (m/s).
    pub descent_deadband: f64,
    /// Samples below `-descent_deadband` required to declare descent.
    pub descent_sustain: u32,
    /// Altitude band around the ground reference counted as "on the ground" (m).
    pub landing_altitude_tolerance: f64,
    /// Speed counted as stopped (m/s).
    pub landing_speed: f64,
    /// Per-sample altitude change counted as steady (m).
    pub landing_altitude_step: f64,
    /// Samples that must satisfy the landing condition.
    pub landing_sustain: u32,
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            launch_velocity: LAUNCH_VELOCITY,
            launch_sustain: DEFAULT_SUSTAIN,
            burnout_acceleration: BURNOUT_ACCELERATION,
            burnout_sustain: DEFAULT_SUSTAIN,
            descent_deadband: DESCENT_DEADBAND,
            descent_sustain: DEFAULT_SUSTAIN,
            landing_altitude_tolerance: LANDING_ALTITUDE_TOLERANCE,
            landing_speed: LANDING_SPEED,
            landing_altitude_step: LANDING_ALTITUDE_STEP,
            landing_sustain: LANDING_SUSTAIN,
        }
    }
}

impl PhaseThresholds {
    /// Check the thresholds are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.launch_velocity <= 0.0 {
            return Err(format!(
                "launch_velocity must be positive, got {}",
                self.launch_velocity
            ));
        }
        if self.descent_deadband < 0.0
            || self.landing_altitude_tolerance < 0.0
            || self.landing_speed < 0.0
            || self.landing_altitude_step < 0.0
        {
            return Err("deadband and landing tolerances must not be negative".to_string());
        }
        if self.launch_sustain == 0
            || self.burnout_sustain == 0
            || self.descent_sustain == 0
            || self.landing_sustain == 0
        {
            return Err("sustain windows must be at least one sample".to_string());
        }
        Ok(())
    }
}

/// Outcome of feeding one sample to a sustain counter.
fn sustain(counter: &mut u32, condition: Option<bool>, required: u32) -> bool {
    match condition {
        None => false,
        Some(false) => {
            *counter = 0;
            false
        }
        Some(true) => {
            *counter += 1;
            *counter >= required
        }
    }
}

/// Stateful flight-phase classifier.
#[derive(Debug, Clone)]
pub struct PhaseDetector {
    thresholds: PhaseThresholds,
    state: FlightState,
    /// Consecutive samples satisfying the current phase's exit condition.
    sustain_count: u32,
    /// Last altitude seen on the pad; landing is measured against it.
    ground_altitude: Option<f64>,
    last_velocity: Option<f64>,
    last_altitude: Option<f64>,
    history: Vec<PhaseTransition>,
}

impl PhaseDetector {
    /// Create a detector in `PreLaunch`.
    pub fn new(thresholds: PhaseThresholds) -> Self {
        Self {
            thresholds,
            state: FlightState::default(),
            sustain_count: 0,
            ground_altitude: None,
            last_velocity: None,
            last_altitude: None,
            history: Vec::new(),
        }
    }

    /// Current flight state.
    pub fn state(&self) -> &FlightState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> FlightPhase {
        self.state.phase
    }

    /// Thresholds in use.
    pub fn thresholds(&self) -> &PhaseThresholds {
        &self.thresholds
    }

    /// Ground reference altitude, once observed on the pad.
    pub fn ground_altitude(&self) -> Option<f64> {
        self.ground_altitude
    }

    /// Transitions of the current flight, oldest first.
    pub fn history(&self) -> &[PhaseTransition] {
        &self.history
    }

    /// Return to `PreLaunch` and forget the flight.
    pub fn reset(&mut self) {
        *self = Self::new(self.thresholds);
    }

    /// Feed one accepted sample; returns the transition it caused, if any.
    pub fn update(&mut self, sample: &Sample) -> Option<PhaseTransition> {
        let velocity = sample.velocity();
        let altitude = sample.altitude();
        let t = &self.thresholds;

        let next = match self.state.phase {
            FlightPhase::PreLaunch => {
                let launching = velocity.map(|v| v > t.launch_velocity);
                if launching == Some(false) || (launching.is_none() && self.sustain_count == 0) {
                    if let Some(alt) = altitude {
                        self.ground_altitude = Some(alt);
                    }
                }
                sustain(&mut self.sustain_count, launching, t.launch_sustain)
                    .then_some(FlightPhase::PoweredAscent)
            }
            FlightPhase::PoweredAscent => {
                if self.crossed_apogee(velocity) {
                    // Burnout went unreported; skip straight to apogee.
                    Some(FlightPhase::Apogee)
                } else {
                    let burnout = match (sample.acceleration(), velocity) {
                        (Some(a), Some(v)) => Some(a <= t.burnout_acceleration && v > 0.0),
                        _ => None,
                    };
                    sustain(&mut self.sustain_count, burnout, t.burnout_sustain)
                        .then_some(FlightPhase::Coasting)
                }
            }
            FlightPhase::Coasting => self
                .crossed_apogee(velocity)
                .then_some(FlightPhase::Apogee),
            FlightPhase::Apogee => {
                let falling = velocity.map(|v| v < -t.descent_deadband);
                sustain(&mut self.sustain_count, falling, t.descent_sustain)
                    .then_some(FlightPhase::Descent)
            }
            FlightPhase::Descent => {
                let landed = altitude.map(|alt| {
                    let ground = self.ground_altitude.unwrap_or(0.0);
                    let near_ground = (alt - ground).abs() <= t.landing_altitude_tolerance;
                    let stopped = velocity.is_some_and(|v| v.abs() < t.landing_speed);
                    let steady = self
                        .last_altitude
                        .is_some_and(|prev| (alt - prev).abs() < t.landing_altitude_step);
                    let settled = stopped || steady;
                    near_ground && settled
                });
                sustain(&mut self.sustain_count, landed, t.landing_sustain)
                    .then_some(FlightPhase::Landed)
            }
            FlightPhase::Landed => None,
        };

        if velocity.is_some() {
            self.last_velocity = velocity;
        }
        if altitude.is_some() {
            self.last_altitude = altitude;
        }

        next.map(|to| self.enter(to, sample.timestamp()))
    }

    fn crossed_apogee(&self, velocity: Option<f64>) -> bool {
        match (self.last_velocity, velocity) {
            (Some(prev), Some(v)) => prev > 0.0 && v <= 0.0,
            _ => false,
        }
    }

    fn enter(&mut self, to: FlightPhase, at: f64) -> PhaseTransition {
        let transition = PhaseTransition {
            from: self.state.phase,
            to,
            at,
        };
        debug_assert!(to > transition.from, "phase transitions are forward-only");

        self.state.phase = to;
        self.state.phase_entered_at = at;
        if to == FlightPhase::PoweredAscent {
            self.state.launch_time = Some(at);
        }
        self.sustain_count = 0;
        self.history.push(transition);

        info!(
            from = %transition.from,
            to = %transition.to,
            at,
            "flight phase changed"
        );
        if to == FlightPhase::PoweredAscent {
            debug!(ground = ?self.ground_altitude, "ground reference locked");
        }
        transition
    }
}

impl Default for PhaseDetector {
    fn default() -> Self {
        Self::new(PhaseThresholds::default())
    }
}

#[cfg(test)]
mod tests;
