//! Point-in-time state published once per tick.

use crate::data::BufferView;
use crate::flight::{FlightPhase, PhaseTransition};
use crate::pump::link::ConnectionStatus;
use crate::telemetry::{Channel, Readings, Sample};
use serde::Serialize;

/// Immutable copy of pipeline state for display consumers.
///
/// Holds no references into the pump; a consumer can keep one as long as it likes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Ticks since the pump started.
    pub tick: u64,
    /// Link status.
    pub status: ConnectionStatus,
    /// Description of the current or last attempted source.
    pub source: Option<String>,
    /// Most recent accepted sample.
    pub latest: Option<Sample>,
    /// Last known value of every channel, carried forward across samples.
    pub current: Readings,
    /// Rolling history.
    pub buffer: BufferView,
    /// Current flight phase.
    pub phase: FlightPhase,
    /// When `phase` was entered (seconds since connect).
    pub phase_entered_at: f64,
    /// When launch was detected.
    pub launch_time: Option<f64>,
    /// Phase changes of this flight, oldest first.
    pub transitions: Vec<PhaseTransition>,
    /// Connected, but nothing valid has arrived within the liveness bound.
    pub link_stale: bool,
    /// Reason the most recent bad line was refused.
    pub last_rejection: Option<String>,
    /// Connection or liveness fault for the operator.
    pub fault: Option<String>,
    /// Samples accepted since connect.
    pub accepted: u64,
    /// Lines rejected since connect.
    pub rejected: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            tick: 0,
            status: ConnectionStatus::Disconnected,
            source: None,
            latest: None,
            current: Readings::default(),
            buffer: BufferView::default(),
            phase: FlightPhase::PreLaunch,
            phase_entered_at: 0.0,
            launch_time: None,
            transitions: Vec::new(),
            link_stale: false,
            last_rejection: None,
            fault: None,
            accepted: 0,
            rejected: 0,
        }
    }
}

impl Snapshot {
    /// One-line status summary for console output.
    pub fn status_line(&self) -> String {
        let fmt = |channel: Channel| match self.current.get(channel) {
            Some(v) => format!("{v:.1} {}", channel.unit()),
            None => "--".to_string(),
        };
        let mut line = format!(
            "[{}] {:<14} alt {:>10}  vel {:>10}  acc {:>10}  samples {}",
            self.status,
            self.phase.label(),
            fmt(Channel::Altitude),
            fmt(Channel::Velocity),
            fmt(Channel::Acceleration),
            self.buffer.len(),
        );
        if self.link_stale {
            line.push_str("  STALE");
        }
        if let Some(fault) = &self.fault {
            line.push_str("  ");
            line.push_str(fault);
        }
        line
    }
}
