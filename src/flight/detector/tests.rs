use super::*;
use crate::telemetry::Readings;

fn feed(
    detector: &mut PhaseDetector,
    t: f64,
    altitude: Option<f64>,
    velocity: Option<f64>,
    acceleration: Option<f64>,
) -> Option<PhaseTransition> {
    let sample = Sample::new(
        t,
        Readings {
            altitude,
            velocity,
            acceleration,
            ..Default::default()
        },
    )
    .unwrap();
    detector.update(&sample)
}

/// Drive a detector into `phase` with clean samples.
fn detector_in(phase: FlightPhase) -> PhaseDetector {
    let mut d = PhaseDetector::default();
    let script: &[(f64, f64, f64)] = &[
        (0.0, 0.0, 0.0),
        (1.0, 10.0, 20.0),
        (5.0, 20.0, 20.0),
        (50.0, 60.0, -9.8),
        (80.0, 50.0, -9.8),
        (100.0, -0.5, -9.8),
        (99.0, -3.0, -9.8),
        (98.0, -5.0, -9.8),
    ];
    let mut t = 0.0;
    for (alt, vel, acc) in script {
        if d.phase() == phase {
            return d;
        }
        t += 0.05;
        feed(&mut d, t, Some(*alt), Some(*vel), Some(*acc));
    }
    assert_eq!(d.phase(), phase, "script did not reach {phase}");
    d
}

#[test]
fn test_initial_state() {
    let d = PhaseDetector::default();
    assert_eq!(d.phase(), FlightPhase::PreLaunch);
    assert_eq!(d.state().launch_time, None);
    assert!(d.history().is_empty());
}

#[test]
fn test_launch_needs_two_sustained_samples() {
    let mut d = PhaseDetector::default();

    // Velocity rises 0 -> 3 -> 6 -> 9 then holds.
    assert!(feed(&mut d, 0.00, Some(0.0), Some(0.0), None).is_none());
    assert!(feed(&mut d, 0.05, Some(0.1), Some(3.0), None).is_none());
    assert!(feed(&mut d, 0.10, Some(0.4), Some(6.0), None).is_none());
    assert_eq!(d.phase(), FlightPhase::PreLaunch, "single crossing must not launch");

    let transition = feed(&mut d, 0.15, Some(0.8), Some(9.0), None).unwrap();
    assert_eq!(transition.from, FlightPhase::PreLaunch);
    assert_eq!(transition.to, FlightPhase::PoweredAscent);
    assert_eq!(d.state().launch_time, Some(0.15));
    assert_eq!(d.state().phase_entered_at, 0.15);
    assert_eq!(d.ground_altitude(), Some(0.1));
}

#[test]
fn test_launch_spike_is_ignored() {
    let mut d = PhaseDetector::default();
    feed(&mut d, 0.0, None, Some(8.0), None);
    feed(&mut d, 0.1, None, Some(0.2), None);
    feed(&mut d, 0.2, None, Some(7.5), None);
    assert_eq!(d.phase(), FlightPhase::PreLaunch);
}

#[test]
fn test_missing_velocity_withholds_launch_decision() {
    let mut d = PhaseDetector::default();
    feed(&mut d, 0.0, None, Some(8.0), None);
    // Temperature-only style record: no velocity, counter untouched.
    feed(&mut d, 0.1, Some(1.0), None, None);
    feed(&mut d, 0.2, None, Some(8.5), None);
    assert_eq!(d.phase(), FlightPhase::PoweredAscent);
}

#[test]
fn test_burnout_to_coasting() {
    let mut d = detector_in(FlightPhase::PoweredAscent);
    feed(&mut d, 1.0, Some(30.0), Some(40.0), Some(-0.3));
    assert_eq!(d.phase(), FlightPhase::PoweredAscent);
    feed(&mut d, 1.1, Some(34.0), Some(39.9), Some(-9.8));
    assert_eq!(d.phase(), FlightPhase::Coasting);
}

#[test]
fn test_burnout_requires_both_channels() {
    let mut d = detector_in(FlightPhase::PoweredAscent);
    feed(&mut d, 1.0, None, None, Some(-9.8));
    feed(&mut d, 1.1, None, None, Some(-9.8));
    feed(&mut d, 1.2, None, None, Some(-9.8));
    assert_eq!(d.phase(), FlightPhase::PoweredAscent);
}

#[test]
fn test_apogee_on_velocity_zero_crossing() {
    let mut d = detector_in(FlightPhase::Coasting);
    feed(&mut d, 2.0, Some(99.0), Some(0.4), Some(-9.8));
    assert_eq!(d.phase(), FlightPhase::Coasting);
    let transition = feed(&mut d, 2.05, Some(99.1), Some(0.0), Some(-9.8)).unwrap();
    assert_eq!(transition.to, FlightPhase::Apogee);
}

#[test]
fn test_descent_needs_deadband_and_sustain() {
    let mut d = detector_in(FlightPhase::Apogee);
    feed(&mut d, 3.0, Some(99.0), Some(-0.8), None);
    feed(&mut d, 3.1, Some(98.9), Some(-1.5), None);
    assert_eq!(d.phase(), FlightPhase::Apogee);
    feed(&mut d, 3.2, Some(98.7), Some(-2.0), None);
    assert_eq!(d.phase(), FlightPhase::Descent);
}

#[test]
fn test_landing_near_ground_when_stopped() {
    let mut d = detector_in(FlightPhase::Descent);
    let window = d.thresholds().landing_sustain;
    let ground = d.ground_altitude().unwrap();

    // Still falling fast at low altitude: not landed.
    for i in 0..window {
        let alt = ground + 9.0 - f64::from(i) * 0.9;
        feed(&mut d, 10.0 + f64::from(i) * 0.05, Some(alt), Some(-20.0), None);
    }
    assert_eq!(d.phase(), FlightPhase::Descent);

    for i in 0..window {
        feed(&mut d, 20.0 + f64::from(i) * 0.05, Some(ground + 0.3), Some(0.1), None);
    }
    assert_eq!(d.phase(), FlightPhase::Landed);
}

#[test]
fn test_landing_from_steady_altitude_without_velocity() {
    let mut d = detector_in(FlightPhase::Descent);
    let window = d.thresholds().landing_sustain;
    // First sample primes the previous altitude, then the window must elapse.
    for i in 0..=window {
        feed(&mut d, 30.0 + f64::from(i) * 0.05, Some(2.0), None, None);
    }
    assert_eq!(d.phase(), FlightPhase::Landed);
}

#[test]
fn test_landing_from_steady_altitude_despite_biased_velocity() {
    let mut d = detector_in(FlightPhase::Descent);
    let window = d.thresholds().landing_sustain;
    let ground = d.ground_altitude().unwrap();

    // A stuck -2 m/s reading must not keep a resting rocket in descent.
    for i in 0..=window {
        feed(&mut d, 30.0 + f64::from(i) * 0.05, Some(ground), Some(-2.0), None);
    }
    assert_eq!(d.phase(), FlightPhase::Landed);
}

#[test]
fn test_landed_is_terminal() {
    let mut d = detector_in(FlightPhase::Descent);
    for i in 0..=d.thresholds().landing_sustain {
        feed(&mut d, 30.0 + f64::from(i) * 0.05, Some(0.0), Some(0.0), None);
    }
    assert_eq!(d.phase(), FlightPhase::Landed);

    // A later launch-like burst must not restart the flight.
    feed(&mut d, 60.0, Some(0.0), Some(50.0), Some(30.0));
    feed(&mut d, 60.1, Some(5.0), Some(55.0), Some(30.0));
    assert_eq!(d.phase(), FlightPhase::Landed);
}

#[test]
fn test_powered_ascent_can_skip_to_apogee() {
    let mut d = detector_in(FlightPhase::PoweredAscent);
    feed(&mut d, 1.0, Some(50.0), Some(3.0), None);
    feed(&mut d, 1.1, Some(50.1), Some(-0.2), None);
    assert_eq!(d.phase(), FlightPhase::Apogee);
    assert_eq!(
        d.history().iter().map(|t| t.to).collect::<Vec<_>>(),
        vec![FlightPhase::PoweredAscent, FlightPhase::Apogee]
    );
}

#[test]
fn test_reset_returns_to_pre_launch() {
    let mut d = detector_in(FlightPhase::Coasting);
    d.reset();
    assert_eq!(d.phase(), FlightPhase::PreLaunch);
    assert_eq!(d.state().launch_time, None);
    assert!(d.history().is_empty());
    assert_eq!(d.ground_altitude(), None);
}

#[test]
fn test_threshold_validation() {
    assert!(PhaseThresholds::default().validate().is_ok());

    let bad = PhaseThresholds {
        launch_velocity: 0.0,
        ..Default::default()
    };
    assert!(bad.validate().is_err());

    let bad = PhaseThresholds {
        landing_sustain: 0,
        ..Default::default()
    };
    assert!(bad.validate().is_err());
}
