//! Scripted in-memory transport
//!
//! `MockTransport` plays the board's side of a conversation: each command the
//! host sends can be answered with scripted reply bytes, optionally delayed.
//! Delays are virtual. A reply delayed past a read's timeout makes that read
//! return no data immediately, and the remaining delay carries over to the
//! next read, so timeout paths run without sleeping.
//!
//! ```ignore
//! let mock = MockTransport::new();
//! let handle = mock.handle();
//! handle.expect("XP", "OpenFIRE,5.2,Dawn,rpipico,0\r\n");
//! let session = DeviceSession::connect(Box::new(mock), config)?;
//! assert_eq!(handle.sent()[0], "XP");
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::types::TransportDeviceInfo;
use crate::Transport;

#[derive(Debug)]
struct Chunk {
    delay: Duration,
    data: Vec<u8>,
}

#[derive(Debug)]
struct Expectation {
    command: String,
    /// Match any command starting with `command`, and never expire
    persistent: bool,
    replies: Vec<Chunk>,
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<Expectation>,
    rx: VecDeque<Chunk>,
    sent: Vec<String>,
    fail_sends: bool,
    closed: bool,
}

impl MockState {
    fn answer(&mut self, sent: &str) {
        let pos = self
            .expectations
            .iter()
            .position(|e| !e.persistent && e.command == sent)
            .or_else(|| {
                self.expectations
                    .iter()
                    .position(|e| e.persistent && sent.starts_with(&e.command))
            });
        let Some(pos) = pos else {
            return;
        };
        if self.expectations[pos].persistent {
            let replies: Vec<Chunk> = self.expectations[pos]
                .replies
                .iter()
                .map(|c| Chunk {
                    delay: c.delay,
                    data: c.data.clone(),
                })
                .collect();
            self.rx.extend(replies);
        } else {
            let expectation = self.expectations.remove(pos);
            self.rx.extend(expectation.replies);
        }
    }
}

/// Scripted transport for tests and dry runs
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    info: TransportDeviceInfo,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            info: TransportDeviceInfo::mock(),
        }
    }

    /// Handle for scripting and inspection that stays valid after the
    /// transport is moved into a session
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Shared scripting handle for a [`MockTransport`]
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Answer the next send of exactly `command` with `reply`
    pub fn expect(&self, command: &str, reply: &str) {
        self.expect_delayed(command, Duration::ZERO, reply);
    }

    /// Answer the next send of exactly `command` with `reply` after `delay`
    pub fn expect_delayed(&self, command: &str, delay: Duration, reply: &str) {
        self.state.lock().expectations.push(Expectation {
            command: command.to_string(),
            persistent: false,
            replies: vec![Chunk {
                delay,
                data: reply.as_bytes().to_vec(),
            }],
        });
    }

    /// Answer every send starting with `prefix` with `reply`
    pub fn respond_to_prefix(&self, prefix: &str, reply: &str) {
        self.state.lock().expectations.push(Expectation {
            command: prefix.to_string(),
            persistent: true,
            replies: vec![Chunk {
                delay: Duration::ZERO,
                data: reply.as_bytes().to_vec(),
            }],
        });
    }

    /// Queue bytes the board sends on its own
    pub fn push_rx(&self, data: &str) {
        self.push_rx_delayed(Duration::ZERO, data);
    }

    pub fn push_rx_delayed(&self, delay: Duration, data: &str) {
        self.state.lock().rx.push_back(Chunk {
            delay,
            data: data.as_bytes().to_vec(),
        });
    }

    /// Every command sent so far, in order
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    /// Make every following send fail as if the cable was pulled
    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().fail_sends = fail;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Bytes queued but not yet read
    pub fn pending_rx(&self) -> usize {
        self.state.lock().rx.iter().map(|c| c.data.len()).sum()
    }

    /// One-shot expectations nobody triggered
    pub fn unmet_expectations(&self) -> Vec<String> {
        self.state
            .lock()
            .expectations
            .iter()
            .filter(|e| !e.persistent)
            .map(|e| e.command.clone())
            .collect()
    }
}

impl Transport for MockTransport {
    fn send(&mut self, data: &[u8], _timeout: Duration) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.closed || state.fail_sends {
            return Err(TransportError::Disconnected);
        }
        let text = String::from_utf8_lossy(data).into_owned();
        state.answer(&text);
        state.sent.push(text);
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TransportError::Disconnected);
        }
        let Some(front) = state.rx.front_mut() else {
            return Ok(0);
        };
        if front.delay > timeout {
            front.delay -= timeout;
            return Ok(0);
        }
        let n = front.data.len().min(buf.len());
        buf[..n].copy_from_slice(&front.data[..n]);
        let exhausted = n == front.data.len();
        if !exhausted {
            front.data.drain(..n);
            front.delay = Duration::ZERO;
        }
        if exhausted {
            state.rx.pop_front();
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        while state.rx.front().is_some_and(|c| c.delay.is_zero()) {
            state.rx.pop_front();
        }
        Ok(())
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    fn is_connected(&self) -> bool {
        !self.state.lock().closed
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.state.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(mock: &mut MockTransport, timeout: Duration) -> String {
        let mut out = Vec::new();
        let mut buf = [0u8; 8];
        loop {
            let n = mock.recv(&mut buf, timeout).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_expectation_fires_once() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.expect("Xlb", "0,1,0\r\n");

        mock.send(b"Xlb", Duration::ZERO).unwrap();
        assert_eq!(read_all(&mut mock, Duration::ZERO), "0,1,0\r\n");
        mock.send(b"Xlb", Duration::ZERO).unwrap();
        assert_eq!(read_all(&mut mock, Duration::ZERO), "");
        assert!(handle.unmet_expectations().is_empty());
    }

    #[test]
    fn test_delay_exceeding_timeout_yields_nothing() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.expect_delayed("XP", Duration::from_millis(2500), "OpenFIRE\r\n");

        mock.send(b"XP", Duration::ZERO).unwrap();
        let mut buf = [0u8; 32];
        assert_eq!(mock.recv(&mut buf, Duration::from_secs(2)).unwrap(), 0);
        // 500ms left on the clock
        assert_eq!(mock.recv(&mut buf, Duration::from_millis(400)).unwrap(), 0);
        assert_eq!(mock.recv(&mut buf, Duration::from_millis(100)).unwrap(), 10);
    }

    #[test]
    fn test_prefix_responder_is_persistent() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.respond_to_prefix("Xm.", "OK:\r\n");

        mock.send(b"Xm.0.1.1", Duration::ZERO).unwrap();
        mock.send(b"Xm.2.0.255", Duration::ZERO).unwrap();
        mock.send(b"Xm", Duration::ZERO).unwrap();
        assert_eq!(read_all(&mut mock, Duration::ZERO), "OK:\r\nOK:\r\n");
        assert_eq!(handle.sent(), vec!["Xm.0.1.1", "Xm.2.0.255", "Xm"]);
    }

    #[test]
    fn test_closed_and_failing() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.fail_sends(true);
        assert!(matches!(
            mock.send(b".", Duration::ZERO),
            Err(TransportError::Disconnected)
        ));
        handle.fail_sends(false);
        mock.close().unwrap();
        assert!(handle.is_closed());
        assert!(!mock.is_connected());
    }

    #[test]
    fn test_clear_input_keeps_future_bytes() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.push_rx("stale\r\n");
        handle.push_rx_delayed(Duration::from_millis(50), "fresh\r\n");
        mock.clear_input().unwrap();
        assert_eq!(handle.pending_rx(), 7);
    }
}
