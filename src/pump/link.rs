//! Connection handle: the single active source and its status.

use crate::error::{AppResult, TelemetryError};
use crate::sources::TelemetrySource;
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

/// Link state as shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    /// No source.
    #[default]
    Disconnected,
    /// `start` in progress.
    Connecting,
    /// Source running.
    Connected,
    /// Start failed or the transport broke. Holds no adapter.
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Disconnected => "DISCONNECTED",
            ConnectionStatus::Connecting => "CONNECTING",
            ConnectionStatus::Connected => "CONNECTED",
            ConnectionStatus::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Owns at most one adapter. Only `Connected` holds a running one.
#[derive(Default)]
pub struct ConnectionHandle {
    status: ConnectionStatus,
    source: Option<Box<dyn TelemetrySource>>,
    description: Option<String>,
    last_error: Option<String>,
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("status", &self.status)
            .field("description", &self.description)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl ConnectionHandle {
    /// A disconnected handle with no source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current link state.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Description of the current (or last attempted) source.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Reason for the last failure, cleared by a successful connect.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Whether a started adapter is attached.
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    /// Stop the previous adapter (if any), then start `source`.
    ///
    /// On failure the new adapter is stopped and dropped and the handle is left in
    /// `Error` with the reason recorded.
    pub async fn open(&mut self, mut source: Box<dyn TelemetrySource>) -> AppResult<()> {
        self.close().await;

        let description = source.describe();
        self.description = Some(description.clone());
        self.status = ConnectionStatus::Connecting;
        info!(source = %description, "connecting");

        match source.start().await {
            Ok(()) => {
                self.source = Some(source);
                self.status = ConnectionStatus::Connected;
                self.last_error = None;
                info!(source = %description, "connected");
                Ok(())
            }
            Err(err) => {
                source.stop().await;
                error!(source = %description, error = %err, "failed to start source");
                self.mark_failed(&err);
                Err(err)
            }
        }
    }

    /// Record a failure that happened before any adapter existed (e.g. a bad config).
    pub fn mark_failed(&mut self, err: &TelemetryError) {
        self.status = ConnectionStatus::Error;
        self.last_error = Some(err.to_string());
    }

    /// Tear down after a transport failure.
    pub async fn fail(&mut self, err: TelemetryError) {
        if let Some(mut source) = self.source.take() {
            source.stop().await;
        }
        warn!(
            source = self.description.as_deref().unwrap_or("-"),
            error = %err,
            "link lost"
        );
        self.mark_failed(&err);
    }

    /// Stop the adapter and return to `Disconnected`. Idempotent.
    pub async fn close(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.stop().await;
            info!(
                source = self.description.as_deref().unwrap_or("-"),
                "disconnected"
            );
        }
        self.status = ConnectionStatus::Disconnected;
        self.last_error = None;
    }

    /// The running adapter, if connected.
    pub fn source_mut(&mut self) -> Option<&mut Box<dyn TelemetrySource>> {
        if self.status == ConnectionStatus::Connected {
            self.source.as_mut()
        } else {
            None
        }
    }
}
