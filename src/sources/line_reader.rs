//! Newline framing shared by the serial and network links.
//!
//! [`LineReader::next_line`] is cancel-safe: bytes received before the future is dropped
//! stay in the pending buffer and are completed by the next call. The pump relies on this
//! when its per-tick read budget expires mid-line.

use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Longest line accepted before the pending bytes are flushed as-is.
pub const MAX_LINE_BYTES: usize = 4096;

/// Buffered newline splitter over an async byte stream.
pub(crate) struct LineReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::with_capacity(256),
        }
    }

    /// Wait for the next complete line, without its terminator.
    ///
    /// End of stream is reported as `UnexpectedEof`: the telemetry links never close
    /// cleanly while a flight is in progress. A run of more than [`MAX_LINE_BYTES`]
    /// without a newline is returned as one line so the parser can reject it.
    pub(crate) async fn next_line(&mut self) -> io::Result<String> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "link closed by peer",
                ));
            }

            if let Some(pos) = available.iter().position(|b| *b == b'\n') {
                self.pending.extend_from_slice(&available[..pos]);
                self.reader.consume(pos + 1);
                return Ok(self.take_line());
            }

            let len = available.len();
            self.pending.extend_from_slice(available);
            self.reader.consume(len);

            if self.pending.len() > MAX_LINE_BYTES {
                return Ok(self.take_line());
            }
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending)
            .trim_end_matches('\r')
            .to_string();
        self.pending.clear();
        line
    }
}
