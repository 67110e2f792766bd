//! End-to-end tests of the source → parser → buffer/detector → snapshot pipeline.

mod common;

use ground_station::flight::{FlightPhase, PhaseThresholds};
use ground_station::pump::{ConnectionStatus, Pump, PumpSettings};
use ground_station::sources::simulator::{DEFAULT_SAMPLE_INTERVAL, DEFAULT_SEED};
use ground_station::sources::{NetworkSource, SimulatorSource, SourceConfig};
use ground_station::telemetry::Channel;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tracing_test::traced_test;

fn pump() -> Pump {
    Pump::new(PumpSettings::default(), PhaseThresholds::default()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn simulated_flight_visits_every_phase_once() {
    let mut pump = pump();
    pump.connect(Box::new(SimulatorSource::new(
        DEFAULT_SEED,
        DEFAULT_SAMPLE_INTERVAL,
    )))
    .await
    .unwrap();

    let period = pump.settings().tick_period();
    let mut observed = vec![FlightPhase::PreLaunch];
    let mut last = None;
    for _ in 0..1000 {
        let snap = pump.tick().await;
        if observed.last() != Some(&snap.phase) {
            observed.push(snap.phase);
        }
        last = Some(snap);
        tokio::time::advance(period).await;
    }

    assert_eq!(observed, FlightPhase::ORDER.to_vec());

    let last = last.unwrap();
    assert_eq!(last.phase, FlightPhase::Landed);
    assert_eq!(last.status, ConnectionStatus::Connected);
    assert_eq!(last.accepted, 1000);
    assert_eq!(last.rejected, 0);
    assert_eq!(last.buffer.len(), 500);
    assert!(!last.link_stale);

    let phases: Vec<_> = last.transitions.iter().map(|t| t.to).collect();
    assert_eq!(phases, FlightPhase::ORDER[1..].to_vec());
    assert!(last
        .transitions
        .windows(2)
        .all(|w| w[0].at <= w[1].at));

    let launch = last.launch_time.unwrap();
    assert!((2.0..3.0).contains(&launch), "launch at {launch}");
}

#[tokio::test(start_paused = true)]
async fn buffer_keeps_the_newest_capacity_samples() {
    let mut pump = pump();
    let (source, feed) = common::scripted();
    pump.connect(source).await.unwrap();

    for _ in 0..501 {
        feed.line(r#"{"altitude": 10, "velocity": 0.1}"#);
    }
    let snap = pump.tick().await;

    assert_eq!(snap.buffer.len(), 500);
    assert!(snap
        .buffer
        .channel(Channel::Altitude)
        .iter()
        .all(|v| *v == Some(10.0)));
    assert!(snap
        .buffer
        .channel(Channel::Velocity)
        .iter()
        .all(|v| *v == Some(0.1)));
    assert_eq!(snap.phase, FlightPhase::PreLaunch);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn schema_rejection_is_logged_and_leaves_buffer_unchanged() {
    let mut pump = pump();
    let (source, feed) = common::scripted();
    pump.connect(source).await.unwrap();

    feed.line(r#"{"altitude": 12.0}"#);
    let before = pump.tick().await;

    feed.line(r#"{"altitude": "high"}"#);
    let after = pump.tick().await;

    assert_eq!(after.buffer, before.buffer);
    assert_eq!(after.rejected, 1);
    assert!(after.last_rejection.unwrap().starts_with("SchemaError"));
    assert!(logs_contain("rejected telemetry line"));
    assert!(logs_contain("SchemaError"));
}

#[tokio::test(start_paused = true)]
async fn velocity_step_launches_on_second_sustained_sample() {
    let mut pump = pump();
    let (source, feed) = common::scripted();
    pump.connect(source).await.unwrap();

    feed.line(r#"{"velocity": 0.0}"#);
    assert_eq!(pump.tick().await.phase, FlightPhase::PreLaunch);
    feed.line(r#"{"velocity": 6.0}"#);
    assert_eq!(pump.tick().await.phase, FlightPhase::PreLaunch);
    feed.line(r#"{"velocity": 7.0}"#);
    let snap = pump.tick().await;
    assert_eq!(snap.phase, FlightPhase::PoweredAscent);
    assert!(snap.launch_time.is_some());
    feed.line(r#"{"velocity": 7.5}"#);
    assert_eq!(pump.tick().await.phase, FlightPhase::PoweredAscent);
}

#[cfg(feature = "serial_source")]
#[tokio::test]
async fn bad_serial_path_reports_error_without_touching_buffer() {
    let mut pump = pump();
    let result = pump
        .connect_config(&SourceConfig::Serial {
            path: "/dev/ground-station-no-such-port".to_string(),
            baud: 9600,
        })
        .await;
    assert!(result.is_err());

    let snap = pump.tick().await;
    assert_eq!(snap.status, ConnectionStatus::Error);
    assert!(snap.buffer.is_empty());
    assert_eq!(snap.accepted, 0);
    let fault = snap.fault.unwrap();
    assert!(fault.contains("/dev/ground-station-no-such-port"), "{fault}");
}

#[tokio::test(start_paused = true)]
async fn reconnect_discards_previous_flight() {
    let mut pump = pump();
    let (source, feed) = common::scripted();
    pump.connect(source).await.unwrap();
    for v in [10.0, 12.0, 14.0] {
        feed.line(format!(r#"{{"velocity": {v}, "altitude": 30}}"#));
    }
    let snap = pump.tick().await;
    assert_eq!(snap.phase, FlightPhase::PoweredAscent);
    assert_eq!(snap.buffer.len(), 3);

    pump.connect_config(&SourceConfig::default()).await.unwrap();
    let snap = pump.snapshot();
    assert!(snap.buffer.is_empty());
    assert_eq!(snap.phase, FlightPhase::PreLaunch);
    assert!(snap.launch_time.is_none());
    assert!(snap.latest.is_none());
    assert!(snap.source.unwrap().contains("Simulator"));
}

#[tokio::test(start_paused = true)]
async fn disconnect_resets_and_keeps_publishing() {
    let mut pump = pump();
    let (source, feed) = common::scripted();
    pump.connect(source).await.unwrap();
    feed.line(r#"{"altitude": 1.0}"#);
    pump.tick().await;

    pump.disconnect().await;
    let snap = pump.tick().await;
    assert_eq!(snap.status, ConnectionStatus::Disconnected);
    assert!(snap.buffer.is_empty());
    assert!(snap.fault.is_none());
}

#[tokio::test(start_paused = true)]
async fn transport_failure_stops_ingestion() {
    let mut pump = pump();
    let (source, feed) = common::scripted();
    pump.connect(source).await.unwrap();

    feed.line(r#"{"altitude": 1.0}"#);
    feed.fail("radio unplugged");
    feed.line(r#"{"altitude": 2.0}"#);

    let snap = pump.tick().await;
    assert_eq!(snap.status, ConnectionStatus::Error);
    assert!(snap.fault.as_deref().unwrap().contains("radio unplugged"));
    assert_eq!(snap.buffer.len(), 1);

    // The adapter is gone; queued lines are never read.
    let snap = pump.tick().await;
    assert_eq!(snap.buffer.len(), 1);
    assert_eq!(snap.status, ConnectionStatus::Error);
}

#[tokio::test]
async fn network_source_feeds_the_pipeline() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket
            .write_all(
                b"{\"altitude\": 100.0, \"velocity\": 1.0}\r\nnot json\n{\"temperature\": 18.5}\n",
            )
            .await
            .unwrap();
        let _ = release_rx.await;
    });

    let mut pump = pump();
    pump.connect(Box::new(NetworkSource::new("127.0.0.1", port)))
        .await
        .unwrap();

    let mut snap = pump.tick().await;
    for _ in 0..100 {
        if snap.accepted + snap.rejected >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        snap = pump.tick().await;
    }

    assert_eq!(snap.accepted, 2);
    assert_eq!(snap.rejected, 1);
    assert_eq!(snap.current.altitude, Some(100.0));
    assert_eq!(snap.current.temperature, Some(18.5));
    assert_eq!(snap.status, ConnectionStatus::Connected);

    // Peer hangs up: the link drops to ERROR.
    let _ = release_tx.send(());
    server.await.unwrap();
    for _ in 0..100 {
        snap = pump.tick().await;
        if snap.status == ConnectionStatus::Error {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(snap.status, ConnectionStatus::Error);
    assert_eq!(snap.buffer.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn spawned_pump_serves_commands_between_ticks() {
    let handle = pump().spawn();
    let mut updates = handle.subscribe();

    let (source, feed) = common::scripted();
    handle.attach(source).await.unwrap();
    feed.line(r#"{"altitude": 5.0}"#);

    loop {
        updates.changed().await.unwrap();
        if updates.borrow().accepted == 1 {
            break;
        }
    }
    let snap = handle.latest();
    assert_eq!(snap.status, ConnectionStatus::Connected);
    assert_eq!(snap.current.altitude, Some(5.0));

    let err = handle
        .connect(SourceConfig::Network {
            host: "127.0.0.1".to_string(),
            port: 0,
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("port"));
    assert_eq!(handle.latest().status, ConnectionStatus::Error);

    handle.shutdown().await;
}
