//! Serial telemetry link.
//!
//! Opens the receiver's character device at 8N1, no flow control, and frames the byte
//! stream into newline-terminated lines.

use crate::error::{AppResult, TelemetryError};
use crate::sources::line_reader::LineReader;
use crate::sources::{Lifecycle, TelemetrySource, SUPPORTED_BAUD_RATES};
use async_trait::async_trait;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

/// Serial port source adapter.
pub struct SerialSource {
    path: String,
    baud: u32,
    port: Option<LineReader<SerialStream>>,
    lifecycle: Lifecycle,
}

impl SerialSource {
    /// # Arguments
    /// * `path` - device path (e.g., "/dev/ttyUSB0", "COM3")
    /// * `baud` - one of [`SUPPORTED_BAUD_RATES`]
    pub fn new(path: impl Into<String>, baud: u32) -> Self {
        Self {
            path: path.into(),
            baud,
            port: None,
            lifecycle: Lifecycle::Idle,
        }
    }
}

#[async_trait]
impl TelemetrySource for SerialSource {
    fn describe(&self) -> String {
        format!("{} @ {} baud", self.path, self.baud)
    }

    async fn start(&mut self) -> AppResult<()> {
        if !self.lifecycle.begin(&self.describe())? {
            return Ok(());
        }
        if !SUPPORTED_BAUD_RATES.contains(&self.baud) {
            return Err(TelemetryError::Connection(format!(
                "Unsupported baud rate {}. Must be one of: {:?}",
                self.baud, SUPPORTED_BAUD_RATES
            )));
        }

        let stream = tokio_serial::new(&self.path, self.baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                TelemetryError::Connection(format!("Failed to open {}: {}", self.describe(), e))
            })?;

        self.port = Some(LineReader::new(stream));
        self.lifecycle = Lifecycle::Running;
        info!(port = %self.path, baud = self.baud, "serial link open");
        Ok(())
    }

    async fn read_line(&mut self) -> AppResult<Option<String>> {
        self.lifecycle.ensure_running(&self.describe())?;
        let Some(port) = self.port.as_mut() else {
            return Ok(None);
        };
        let line = port.next_line().await.map_err(|e| {
            TelemetryError::Connection(format!("serial read on {} failed: {}", self.path, e))
        })?;
        Ok(Some(line))
    }

    async fn stop(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.path, "serial link closed");
        }
        self.lifecycle = Lifecycle::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_names_port_and_baud() {
        let source = SerialSource::new("/dev/ttyUSB0", 115200);
        assert_eq!(source.describe(), "/dev/ttyUSB0 @ 115200 baud");
    }

    #[tokio::test]
    async fn missing_device_fails_to_start() {
        let mut source = SerialSource::new("/dev/does-not-exist-ground-station", 9600);
        let err = source.start().await.unwrap_err();
        assert!(matches!(err, TelemetryError::Connection(_)));
        assert!(source.read_line().await.is_err());
        source.stop().await;
    }

    #[tokio::test]
    async fn unsupported_baud_fails_to_start() {
        let mut source = SerialSource::new("/dev/ttyUSB0", 12345);
        assert!(source.start().await.is_err());
    }

    #[tokio::test]
    async fn stopped_source_refuses_restart() {
        let mut source = SerialSource::new("/dev/ttyUSB0", 9600);
        source.stop().await;
        let err = source.start().await.unwrap_err();
        assert!(err.to_string().contains("stopped"));
    }
}
