//! TCP telemetry link.
//!
//! Connects to a receiver bridge that relays the radio stream over TCP, one JSON object
//! per line.

use crate::error::{AppResult, TelemetryError};
use crate::sources::line_reader::LineReader;
use crate::sources::{Lifecycle, TelemetrySource};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

/// Default handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP source adapter.
pub struct NetworkSource {
    host: String,
    port: u16,
    connect_timeout: Duration,
    stream: Option<LineReader<TcpStream>>,
    lifecycle: Lifecycle,
}

impl NetworkSource {
    /// # Arguments
    /// * `host` - hostname or IP address
    /// * `port` - TCP port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            stream: None,
            lifecycle: Lifecycle::Idle,
        }
    }

    /// Bound the TCP handshake.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

#[async_trait]
impl TelemetrySource for NetworkSource {
    fn describe(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn start(&mut self) -> AppResult<()> {
        if !self.lifecycle.begin(&self.describe())? {
            return Ok(());
        }

        let stream = timeout(
            self.connect_timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| {
            TelemetryError::Connection(format!(
                "Connection timeout to {} after {:?}",
                self.describe(),
                self.connect_timeout
            ))
        })?
        .map_err(|e| {
            TelemetryError::Connection(format!("Failed to connect to {}: {}", self.describe(), e))
        })?;

        stream.set_nodelay(true)?;

        self.stream = Some(LineReader::new(stream));
        self.lifecycle = Lifecycle::Running;
        info!(host = %self.host, port = self.port, "network link open");
        Ok(())
    }

    async fn read_line(&mut self) -> AppResult<Option<String>> {
        self.lifecycle.ensure_running(&self.describe())?;
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        let line = stream.next_line().await.map_err(|e| {
            TelemetryError::Connection(format!(
                "network read from {}:{} failed: {}",
                self.host, self.port, e
            ))
        })?;
        Ok(Some(line))
    }

    async fn stop(&mut self) {
        if self.stream.take().is_some() {
            debug!(host = %self.host, port = self.port, "network link closed");
        }
        self.lifecycle = Lifecycle::Stopped;
    }
}
