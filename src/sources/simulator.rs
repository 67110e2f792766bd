//! Simulated telemetry source.
//!
//! Replays a deterministic 50-second single-stage flight so the dashboard can be
//! exercised without a radio. The flight is a pure function of time since `start`:
//!
//! | t (s)        | phase          | model                                   |
//! |--------------|----------------|-----------------------------------------|
//! | 0 – 2        | pre-launch     | on the pad                              |
//! | 2 – 6        | powered ascent | constant 20 m/s² net thrust             |
//! | 6 – ≈14.2    | coast          | ballistic, −g                           |
//! | ≈14.2        | apogee         | velocity crosses zero at ≈486 m         |
//! | ≈14.2 – ≈39.5| descent        | free fall to 20 m/s, then steady canopy |
//! | ≈39.5 – 50   | landed         | on the ground                           |
//!
//! Samples are emitted on a fixed grid (`sample_interval`, 50 ms by default) measured on
//! the tokio clock, so tests running with paused time get a reproducible stream. Small
//! measurement noise is drawn from a seeded PRNG.

use crate::error::{AppResult, TelemetryError};
use crate::sources::{Lifecycle, TelemetrySource};
use crate::telemetry::Readings;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default noise seed.
pub const DEFAULT_SEED: u64 = 0x5EED_F117;

/// Default interval between samples (20 Hz).
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

/// Standard gravity, m/s².
const G: f64 = 9.81;

/// Noise amplitudes (uniform ±).
const ALTITUDE_NOISE: f64 = 0.3;
const VELOCITY_NOISE: f64 = 0.2;
const ACCELERATION_NOISE: f64 = 0.2;
const TEMPERATURE_NOISE: f64 = 0.5;
const PRESSURE_NOISE: f64 = 0.05;

/// Noise-free kinematic state of the simulated vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrueState {
    /// Altitude above the pad, m.
    pub altitude: f64,
    /// Vertical velocity, m/s.
    pub velocity: f64,
    /// Vertical acceleration, m/s².
    pub acceleration: f64,
}

/// Piecewise flight profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightProfile {
    /// Ignition time, s.
    pub launch_at: f64,
    /// Burn duration, s.
    pub burn_time: f64,
    /// Net acceleration while the motor burns, m/s².
    pub thrust_acceleration: f64,
    /// Steady descent rate under canopy, m/s.
    pub descent_rate: f64,
}

impl Default for FlightProfile {
    fn default() -> Self {
        Self {
            launch_at: 2.0,
            burn_time: 4.0,
            thrust_acceleration: 20.0,
            descent_rate: 20.0,
        }
    }
}

impl FlightProfile {
    /// Velocity at burnout.
    pub fn burnout_velocity(&self) -> f64 {
        self.thrust_acceleration * self.burn_time
    }

    /// Altitude at burnout.
    pub fn burnout_altitude(&self) -> f64 {
        0.5 * self.thrust_acceleration * self.burn_time * self.burn_time
    }

    /// Time of burnout.
    pub fn burnout_at(&self) -> f64 {
        self.launch_at + self.burn_time
    }

    /// Time of apogee.
    pub fn apogee_at(&self) -> f64 {
        self.burnout_at() + self.burnout_velocity() / G
    }

    /// Peak altitude.
    pub fn apogee_altitude(&self) -> f64 {
        let v = self.burnout_velocity();
        self.burnout_altitude() + v * v / (2.0 * G)
    }

    /// Time at which free fall reaches the canopy descent rate.
    fn canopy_at(&self) -> f64 {
        self.apogee_at() + self.descent_rate / G
    }

    /// Altitude at which the canopy descent starts.
    fn canopy_altitude(&self) -> f64 {
        self.apogee_altitude() - self.descent_rate * self.descent_rate / (2.0 * G)
    }

    /// Touchdown time.
    pub fn landing_at(&self) -> f64 {
        self.canopy_at() + self.canopy_altitude() / self.descent_rate
    }

    /// Vehicle state `t` seconds after start.
    pub fn at(&self, t: f64) -> TrueState {
        if t < self.launch_at || t >= self.landing_at() {
            return TrueState {
                altitude: 0.0,
                velocity: 0.0,
                acceleration: 0.0,
            };
        }

        if t < self.burnout_at() {
            let dt = t - self.launch_at;
            return TrueState {
                altitude: 0.5 * self.thrust_acceleration * dt * dt,
                velocity: self.thrust_acceleration * dt,
                acceleration: self.thrust_acceleration,
            };
        }

        if t < self.canopy_at() {
            // Ballistic through apogee until the canopy rate is reached.
            let dt = t - self.burnout_at();
            let v0 = self.burnout_velocity();
            return TrueState {
                altitude: self.burnout_altitude() + v0 * dt - 0.5 * G * dt * dt,
                velocity: v0 - G * dt,
                acceleration: -G,
            };
        }

        let dt = t - self.canopy_at();
        TrueState {
            altitude: (self.canopy_altitude() - self.descent_rate * dt).max(0.0),
            velocity: -self.descent_rate,
            acceleration: 0.0,
        }
    }
}

/// Standard-atmosphere temperature at `altitude` (°C).
fn temperature_at(altitude: f64) -> f64 {
    20.0 - altitude * 0.0065
}

/// Barometric pressure at `altitude` (kPa).
fn pressure_at(altitude: f64) -> f64 {
    101.325 * (-altitude / 8500.0).exp()
}

/// Synthetic telemetry source.
pub struct SimulatorSource {
    profile: FlightProfile,
    sample_interval: Duration,
    seed: u64,
    rng: StdRng,
    started_at: Option<Instant>,
    emitted: u64,
    lifecycle: Lifecycle,
}

impl SimulatorSource {
    /// Create a simulator with the default flight profile.
    pub fn new(seed: u64, sample_interval: Duration) -> Self {
        Self {
            profile: FlightProfile::default(),
            sample_interval,
            seed,
            rng: StdRng::seed_from_u64(seed),
            started_at: None,
            emitted: 0,
            lifecycle: Lifecycle::Idle,
        }
    }

    /// Replace the flight profile.
    pub fn with_profile(mut self, profile: FlightProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Noisy readings at flight time `t`.
    fn readings_at(&mut self, t: f64) -> Readings {
        let truth = self.profile.at(t);
        let altitude =
            (truth.altitude + self.rng.gen_range(-ALTITUDE_NOISE..=ALTITUDE_NOISE)).max(0.0);

        Readings {
            altitude: Some(round2(altitude)),
            velocity: Some(round2(
                truth.velocity + self.rng.gen_range(-VELOCITY_NOISE..=VELOCITY_NOISE),
            )),
            acceleration: Some(round2(
                truth.acceleration + self.rng.gen_range(-ACCELERATION_NOISE..=ACCELERATION_NOISE),
            )),
            temperature: Some(round2(
                temperature_at(altitude) + self.rng.gen_range(-TEMPERATURE_NOISE..=TEMPERATURE_NOISE),
            )),
            pressure: Some(round2(
                pressure_at(altitude) + self.rng.gen_range(-PRESSURE_NOISE..=PRESSURE_NOISE),
            )),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
impl TelemetrySource for SimulatorSource {
    fn describe(&self) -> String {
        format!(
            "Simulator (seed {:#x}, {:?} interval)",
            self.seed, self.sample_interval
        )
    }

    async fn start(&mut self) -> AppResult<()> {
        if !self.lifecycle.begin(&self.describe())? {
            return Ok(());
        }
        self.started_at = Some(Instant::now());
        self.emitted = 0;
        self.lifecycle = Lifecycle::Running;
        debug!(landing_at = self.profile.landing_at(), "simulator started");
        Ok(())
    }

    async fn read_line(&mut self) -> AppResult<Option<String>> {
        self.lifecycle.ensure_running(&self.describe())?;
        let Some(started_at) = self.started_at else {
            return Ok(None);
        };

        let due = u32::try_from(self.emitted)
            .map_or(Duration::MAX, |n| self.sample_interval.saturating_mul(n));
        if started_at.elapsed() < due {
            return Ok(None);
        }

        let t = self.sample_interval.as_secs_f64() * self.emitted as f64;
        self.emitted += 1;
        let readings = self.readings_at(t);
        serde_json::to_string(&readings)
            .map(Some)
            .map_err(|e| TelemetryError::Connection(format!("simulator encode failed: {e}")))
    }

    async fn stop(&mut self) {
        self.lifecycle = Lifecycle::Stopped;
        self.started_at = None;
    }
}
