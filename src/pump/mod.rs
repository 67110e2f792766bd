//! Scheduler/Pump: the fixed-cadence refresh loop.
//!
//! The pump owns the whole pipeline context (rolling buffer, phase detector and
//! connection handle) and is its only writer. Once per tick it:
//!
//! 1. drains every line the active source has ready, bounded by `read_budget`;
//! 2. parses each line, appending accepted samples to the buffer and feeding the detector;
//! 3. checks link liveness;
//! 4. publishes one immutable [`Snapshot`].
//!
//! A snapshot is published every tick, including while disconnected or in error. A
//! transport failure moves the link to `Error` and stops the adapter; the pump never
//! reconnects on its own.
//!
//! [`Pump::tick`] can be driven directly (tests use paused tokio time for this), or the
//! pump can be moved into its own task with [`Pump::spawn`], which returns a
//! [`PumpHandle`] for commands and a `watch` channel of snapshots.

pub mod link;
pub mod snapshot;

pub use link::{ConnectionHandle, ConnectionStatus};
pub use snapshot::Snapshot;

use crate::data::{RollingBuffer, DEFAULT_CAPACITY};
use crate::error::{AppResult, TelemetryError};
use crate::flight::{PhaseDetector, PhaseThresholds};
use crate::sources::{SourceConfig, TelemetrySource};
use crate::telemetry::{parse_line, Sample};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// Default refresh rate (Hz).
pub const DEFAULT_REFRESH_HZ: f64 = 20.0;

/// Timing and sizing of the refresh loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpSettings {
    /// Ticks per second.
    pub refresh_hz: f64,
    /// Rolling buffer capacity (samples).
    pub buffer_capacity: usize,
    /// Longest a tick may spend reading; must be below the tick period.
    #[serde(with = "humantime_serde")]
    pub read_budget: Duration,
    /// Connected with no accepted sample for this long marks the link stale.
    #[serde(with = "humantime_serde")]
    pub liveness_timeout: Duration,
    /// Bound on network handshakes.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for PumpSettings {
    fn default() -> Self {
        Self {
            refresh_hz: DEFAULT_REFRESH_HZ,
            buffer_capacity: DEFAULT_CAPACITY,
            read_budget: Duration::from_millis(30),
            liveness_timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl PumpSettings {
    /// Interval between ticks.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_hz)
    }

    /// Reject settings the refresh loop cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        if !self.refresh_hz.is_finite() || self.refresh_hz <= 0.0 || self.refresh_hz > 1000.0 {
            return Err(TelemetryError::Configuration(format!(
                "refresh_hz must be in (0, 1000], got {}",
                self.refresh_hz
            )));
        }
        if self.buffer_capacity == 0 {
            return Err(TelemetryError::Configuration(
                "buffer_capacity must be greater than 0".to_string(),
            ));
        }
        if self.read_budget.is_zero() || self.read_budget >= self.tick_period() {
            return Err(TelemetryError::Configuration(format!(
                "read_budget ({:?}) must be non-zero and below the tick period ({:?})",
                self.read_budget,
                self.tick_period()
            )));
        }
        if self.liveness_timeout.is_zero() {
            return Err(TelemetryError::Configuration(
                "liveness_timeout must be non-zero".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(TelemetryError::Configuration(
                "connect_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of one bounded read.
enum Read {
    Line(String),
    Idle,
    Failed(TelemetryError),
}

/// Pipeline context and refresh logic.
pub struct Pump {
    settings: PumpSettings,
    buffer: RollingBuffer,
    detector: PhaseDetector,
    link: ConnectionHandle,
    latest: Option<Sample>,
    last_rejection: Option<String>,
    connected_at: Option<Instant>,
    last_accept_at: Option<Instant>,
    link_stale: bool,
    tick: u64,
    accepted: u64,
    rejected: u64,
}

impl Pump {
    /// Create a disconnected pump.
    ///
    /// Fails with `Configuration` when `settings` or `thresholds` do not validate.
    pub fn new(settings: PumpSettings, thresholds: PhaseThresholds) -> AppResult<Self> {
        settings.validate()?;
        thresholds.validate().map_err(TelemetryError::Configuration)?;
        Ok(Self {
            buffer: RollingBuffer::new(settings.buffer_capacity),
            detector: PhaseDetector::new(thresholds),
            link: ConnectionHandle::new(),
            settings,
            latest: None,
            last_rejection: None,
            connected_at: None,
            last_accept_at: None,
            link_stale: false,
            tick: 0,
            accepted: 0,
            rejected: 0,
        })
    }

    /// Build from a loaded application config.
    pub fn from_config(config: &crate::config::AppConfig) -> AppResult<Self> {
        Self::new(config.pump.clone(), config.phase)
    }

    /// Timing and sizing in effect.
    pub fn settings(&self) -> &PumpSettings {
        &self.settings
    }

    /// Link status.
    pub fn status(&self) -> ConnectionStatus {
        self.link.status()
    }

    /// Rolling history of the current connection.
    pub fn buffer(&self) -> &RollingBuffer {
        &self.buffer
    }

    /// Phase detector of the current connection.
    pub fn detector(&self) -> &PhaseDetector {
        &self.detector
    }

    /// Switch to `source`: stop the old one, reset the pipeline, start the new one.
    pub async fn connect(&mut self, source: Box<dyn TelemetrySource>) -> AppResult<()> {
        self.link.close().await;
        self.reset();
        self.link.open(source).await?;
        self.connected_at = Some(Instant::now());
        Ok(())
    }

    /// Build a source from `config` and connect to it.
    ///
    /// A config that cannot produce an adapter leaves the link in `Error`.
    pub async fn connect_config(&mut self, config: &SourceConfig) -> AppResult<()> {
        self.link.close().await;
        self.reset();
        let source = match config.build(self.settings.connect_timeout) {
            Ok(source) => source,
            Err(err) => {
                error!(kind = config.kind(), error = %err, "cannot build source");
                self.link.mark_failed(&err);
                return Err(err);
            }
        };
        self.connect(source).await
    }

    /// Stop the source and reset the pipeline.
    pub async fn disconnect(&mut self) {
        self.link.close().await;
        self.reset();
    }

    /// Run one refresh cycle and return its snapshot.
    pub async fn tick(&mut self) -> Snapshot {
        self.tick += 1;
        self.ingest().await;
        self.check_liveness();
        let snapshot = self.snapshot();
        trace!(
            tick = self.tick,
            status = %snapshot.status,
            samples = snapshot.buffer.len(),
            "tick"
        );
        snapshot
    }

    /// Current state without advancing the tick counter.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.detector.state();
        let fault = match self.link.status() {
            ConnectionStatus::Error => self.link.last_error().map(str::to_string),
            ConnectionStatus::Connected if self.link_stale => {
                Some(TelemetryError::LivenessTimeout(self.settings.liveness_timeout).to_string())
            }
            _ => None,
        };

        Snapshot {
            tick: self.tick,
            status: self.link.status(),
            source: self.link.description().map(str::to_string),
            latest: self.latest,
            current: self.buffer.latest().unwrap_or_default(),
            buffer: self.buffer.snapshot(),
            phase: state.phase,
            phase_entered_at: state.phase_entered_at,
            launch_time: state.launch_time,
            transitions: self.detector.history().to_vec(),
            link_stale: self.link_stale,
            last_rejection: self.last_rejection.clone(),
            fault,
            accepted: self.accepted,
            rejected: self.rejected,
        }
    }

    /// Feed one raw line through the parser into the buffer and detector.
    ///
    /// Returns whether the line was accepted.
    pub fn accept_line(&mut self, line: &str) -> bool {
        let timestamp = self.elapsed();
        match parse_line(line, timestamp) {
            Ok(sample) => {
                self.buffer.append(&sample);
                self.detector.update(&sample);
                self.latest = Some(sample);
                self.accepted += 1;
                self.last_accept_at = Some(Instant::now());
                if self.link_stale {
                    info!("telemetry resumed");
                    self.link_stale = false;
                }
                true
            }
            Err(rejection) => {
                warn!(reason = %rejection, "rejected telemetry line");
                self.last_rejection = Some(rejection.to_string());
                self.rejected += 1;
                false
            }
        }
    }

    /// Drain ready lines until the source goes quiet or `read_budget` is spent.
    ///
    /// Lines left unread stay queued in the adapter for the next tick.
    async fn ingest(&mut self) {
        let deadline = Instant::now() + self.settings.read_budget;
        loop {
            if Instant::now() >= deadline {
                trace!("read budget spent");
                return;
            }
            let read = {
                let Some(source) = self.link.source_mut() else {
                    return;
                };
                match timeout_at(deadline, source.read_line()).await {
                    Err(_elapsed) => Read::Idle,
                    Ok(Ok(None)) => Read::Idle,
                    Ok(Ok(Some(line))) => Read::Line(line),
                    Ok(Err(err)) => Read::Failed(err),
                }
            };

            match read {
                Read::Line(line) => {
                    self.accept_line(&line);
                }
                Read::Idle => return,
                Read::Failed(err) => {
                    error!(error = %err, "transport failure");
                    self.link.fail(err).await;
                    self.link_stale = false;
                    return;
                }
            }
        }
    }

    fn check_liveness(&mut self) {
        if !self.link.is_connected() || self.link_stale {
            return;
        }
        let Some(since) = self.last_accept_at.or(self.connected_at) else {
            return;
        };
        if since.elapsed() >= self.settings.liveness_timeout {
            let err = TelemetryError::LivenessTimeout(self.settings.liveness_timeout);
            warn!(error = %err, "link stale");
            self.link_stale = true;
        }
    }

    fn elapsed(&self) -> f64 {
        self.connected_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.detector.reset();
        self.latest = None;
        self.last_rejection = None;
        self.connected_at = None;
        self.last_accept_at = None;
        self.link_stale = false;
        self.accepted = 0;
        self.rejected = 0;
        debug!("pipeline reset");
    }

    /// Move the pump into its own task.
    pub fn spawn(self) -> PumpHandle {
        let (commands, receiver) = mpsc::channel(16);
        let (publisher, snapshots) = watch::channel(Arc::new(self.snapshot()));
        let task = tokio::spawn(self.run(receiver, publisher));
        PumpHandle {
            commands,
            snapshots,
            task,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<PumpCommand>,
        publisher: watch::Sender<Arc<Snapshot>>,
    ) {
        let mut ticker = interval(self.settings.tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(refresh_hz = self.settings.refresh_hz, "pump started");

        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(PumpCommand::Connect { config, reply }) => {
                        let result = self.connect_config(&config).await;
                        publisher.send_replace(Arc::new(self.snapshot()));
                        let _ = reply.send(result);
                    }
                    Some(PumpCommand::Attach { source, reply }) => {
                        let result = self.connect(source).await;
                        publisher.send_replace(Arc::new(self.snapshot()));
                        let _ = reply.send(result);
                    }
                    Some(PumpCommand::Disconnect { reply }) => {
                        self.disconnect().await;
                        publisher.send_replace(Arc::new(self.snapshot()));
                        let _ = reply.send(());
                    }
                    Some(PumpCommand::Shutdown) | None => break,
                },
                _ = ticker.tick() => {
                    let snapshot = self.tick().await;
                    publisher.send_replace(Arc::new(snapshot));
                }
            }
        }

        self.disconnect().await;
        publisher.send_replace(Arc::new(self.snapshot()));
        info!(ticks = self.tick, "pump stopped");
    }
}

/// Commands handled between ticks.
pub enum PumpCommand {
    /// Switch to a source built from config.
    Connect {
        /// Source to build.
        config: SourceConfig,
        /// Receives the connect outcome.
        reply: oneshot::Sender<AppResult<()>>,
    },
    /// Switch to an already constructed source.
    Attach {
        /// Unstarted adapter.
        source: Box<dyn TelemetrySource>,
        /// Receives the start outcome.
        reply: oneshot::Sender<AppResult<()>>,
    },
    /// Stop the source.
    Disconnect {
        /// Signalled once the pipeline is reset.
        reply: oneshot::Sender<()>,
    },
    /// Stop the source and end the task.
    Shutdown,
}

/// Control side of a spawned pump.
pub struct PumpHandle {
    commands: mpsc::Sender<PumpCommand>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
    task: JoinHandle<()>,
}

impl PumpHandle {
    /// Build and switch to `config`, waiting for the outcome.
    pub async fn connect(&self, config: SourceConfig) -> AppResult<()> {
        let (reply, response) = oneshot::channel();
        self.send(PumpCommand::Connect { config, reply }).await?;
        response.await.map_err(|_| pump_gone())?
    }

    /// Switch to an already constructed `source`.
    pub async fn attach(&self, source: Box<dyn TelemetrySource>) -> AppResult<()> {
        let (reply, response) = oneshot::channel();
        self.send(PumpCommand::Attach { source, reply }).await?;
        response.await.map_err(|_| pump_gone())?
    }

    /// Stop the source and reset the pipeline.
    pub async fn disconnect(&self) -> AppResult<()> {
        let (reply, response) = oneshot::channel();
        self.send(PumpCommand::Disconnect { reply }).await?;
        response.await.map_err(|_| pump_gone())
    }

    /// A receiver that sees every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }

    /// Most recently published snapshot.
    pub fn latest(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    /// Stop the source and wait for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(PumpCommand::Shutdown).await;
        if let Err(err) = self.task.await {
            error!(error = %err, "pump task ended abnormally");
        }
    }

    async fn send(&self, command: PumpCommand) -> AppResult<()> {
        self.commands.send(command).await.map_err(|_| pump_gone())
    }
}

fn pump_gone() -> TelemetryError {
    TelemetryError::Connection("pump task is not running".to_string())
}
