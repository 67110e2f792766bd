//! Flight-phase inference.

pub mod detector;
pub mod phase;

pub use detector::{PhaseDetector, PhaseThresholds};
pub use phase::{FlightPhase, FlightState, PhaseTransition};
