//! Line-oriented channel
//!
//! `LineChannel` wraps a raw `Transport` (which only moves bytes) and adds the
//! request/response vocabulary of the protocol: command rendering, "wait up to
//! T for a full line", multi-field record reads in either field mode, and
//! draining stale input.
//!
//! ```text
//! [SerialTransport / MockTransport]  ← implements Transport (raw I/O)
//!                |
//!          [LineChannel]              ← lines, records, bounded waits
//!                |
//!         [DeviceSession]
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::codec::{split_fields, LineCodec};
use crate::error::TransportError;
use crate::protocol::{cmd, timing, Command};
use crate::types::{FieldMode, TransportDeviceInfo};
use crate::Transport;

/// Read chunk size; the longest reply (a pin record) is well under this
const READ_CHUNK: usize = 256;

// ============================================================================
// LineChannel
// ============================================================================

/// A transport wrapper that speaks in lines and records
pub struct LineChannel {
    inner: Box<dyn Transport>,
    codec: LineCodec,
    mode: FieldMode,
    write_timeout: Duration,
}

impl LineChannel {
    pub fn new(inner: Box<dyn Transport>) -> Self {
        Self {
            inner,
            codec: LineCodec::new(),
            mode: FieldMode::default(),
            write_timeout: Duration::from_millis(timing::WRITE_TIMEOUT_MS),
        }
    }

    /// Bound on waiting for a command's bytes to be written
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn field_mode(&self) -> FieldMode {
        self.mode
    }

    pub fn set_field_mode(&mut self, mode: FieldMode) {
        if mode != self.mode {
            debug!("Field mode {:?} -> {:?}", self.mode, mode);
        }
        self.mode = mode;
    }

    pub fn device_info(&self) -> &TransportDeviceInfo {
        self.inner.device_info()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Send a command without waiting for any reply
    pub fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        let wire = command.to_wire();
        if wire != cmd::HEARTBEAT {
            debug!("TX {} ({})", wire, cmd::name(&wire));
        } else {
            trace!("TX heartbeat");
        }
        self.inner.send(&LineCodec::encode(command), self.write_timeout)
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Wait up to `timeout` for one complete line
    ///
    /// Returns `Ok(None)` when the wait expires. Lines already buffered are
    /// returned without touching the transport.
    pub fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        if let Some(line) = self.codec.next_line() {
            debug!("RX {}", line);
            return Ok(Some(line));
        }

        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let n = self.inner.recv(&mut buf, remaining)?;
            if n == 0 {
                return Ok(None);
            }
            self.codec.push(&buf[..n]);
            if let Some(line) = self.codec.next_line() {
                debug!("RX {}", line);
                return Ok(Some(line));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    /// Return a line only if one is available right now
    pub fn poll_line(&mut self) -> Result<Option<String>, TransportError> {
        self.read_line(Duration::ZERO)
    }

    /// Send a command and wait for the first reply line
    pub fn query(
        &mut self,
        command: &Command,
        timeout: Duration,
    ) -> Result<Option<String>, TransportError> {
        self.send(command)?;
        self.read_line(timeout)
    }

    /// Read one multi-field record in the current field mode
    ///
    /// In comma mode this is one line split on `,`. In per-line mode it is up
    /// to `expected` lines, one field each, each bounded by `timeout`.
    ///
    /// # Returns
    /// `None` if nothing arrived at all; otherwise the fields that did arrive,
    /// which may be fewer or more than `expected` (the caller decides)
    pub fn read_record(
        &mut self,
        expected: usize,
        timeout: Duration,
    ) -> Result<Option<Vec<String>>, TransportError> {
        let Some(first) = self.read_line(timeout)? else {
            return Ok(None);
        };
        match self.mode {
            FieldMode::Comma => Ok(Some(split_fields(&first))),
            FieldMode::PerLine => {
                let mut fields = vec![first];
                while fields.len() < expected {
                    match self.read_line(timeout)? {
                        Some(line) => fields.push(line),
                        None => break,
                    }
                }
                Ok(Some(fields))
            }
        }
    }

    /// Send a command and read its record reply
    pub fn query_record(
        &mut self,
        command: &Command,
        expected: usize,
        timeout: Duration,
    ) -> Result<Option<Vec<String>>, TransportError> {
        self.send(command)?;
        self.read_record(expected, timeout)
    }

    /// Throw away everything received but not yet consumed
    pub fn discard_input(&mut self) -> Result<usize, TransportError> {
        let dropped = self.codec.reset();
        self.inner.clear_input()?;
        if dropped > 0 {
            debug!("Discarded {} stale lines", dropped);
        }
        Ok(dropped)
    }

    /// Read lines until the board stays quiet for `quiet` or `limit` elapses
    pub fn drain(&mut self, quiet: Duration, limit: Duration) -> Result<Vec<String>, TransportError> {
        let deadline = Instant::now() + limit;
        let mut lines = Vec::new();
        while Instant::now() < deadline {
            let wait = quiet.min(deadline.saturating_duration_since(Instant::now()));
            match self.read_line(wait)? {
                Some(line) => lines.push(line),
                None => break,
            }
        }
        Ok(lines)
    }

    /// Close the underlying transport and drop buffered input
    pub fn close(&mut self) -> Result<(), TransportError> {
        self.codec.reset();
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::protocol::WriteCategory;

    const T: Duration = Duration::from_millis(100);

    #[test]
    fn test_query_returns_first_line() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.expect("Xlb", "0,1,0,0,0,0,0,0,0\r\n");
        let mut channel = LineChannel::new(Box::new(mock));

        let fields = channel.query_record(&Command::ReadBools, 9, T).unwrap().unwrap();
        assert_eq!(fields.len(), 9);
        assert_eq!(fields[1], "1");
    }

    #[test]
    fn test_read_line_times_out() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.push_rx_delayed(Duration::from_millis(150), "late\r\n");
        let mut channel = LineChannel::new(Box::new(mock));

        assert_eq!(channel.read_line(T).unwrap(), None);
        assert_eq!(channel.read_line(T).unwrap().as_deref(), Some("late"));
    }

    #[test]
    fn test_per_line_record() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.expect("Xli", "1234\r\nFIRECon\r\n");
        let mut channel = LineChannel::new(Box::new(mock));
        channel.set_field_mode(FieldMode::PerLine);

        let fields = channel.query_record(&Command::ReadIdentity, 2, T).unwrap().unwrap();
        assert_eq!(fields, vec!["1234", "FIRECon"]);
    }

    #[test]
    fn test_per_line_record_short() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.expect("Xli", "1234\r\n");
        let mut channel = LineChannel::new(Box::new(mock));
        channel.set_field_mode(FieldMode::PerLine);

        let fields = channel.query_record(&Command::ReadIdentity, 2, T).unwrap().unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_discard_and_drain() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.push_rx("Pressed:01\r\nReleased:01\r\n");
        let mut channel = LineChannel::new(Box::new(mock));

        assert_eq!(channel.read_line(T).unwrap().as_deref(), Some("Pressed:01"));
        assert_eq!(channel.discard_input().unwrap(), 1);
        assert_eq!(channel.poll_line().unwrap(), None);

        handle.respond_to_prefix("Xm.", "OK:\r\n");
        channel
            .send(&Command::write(WriteCategory::Bool, 0, 1))
            .unwrap();
        let lines = channel.drain(T, Duration::from_secs(1)).unwrap();
        assert_eq!(lines, vec!["OK:"]);
    }

    #[test]
    fn test_send_after_close_fails() {
        let mut channel = LineChannel::new(Box::new(MockTransport::new()));
        channel.close().unwrap();
        assert!(!channel.is_connected());
        assert!(matches!(
            channel.send(&Command::Heartbeat),
            Err(TransportError::Disconnected)
        ));
    }
}
