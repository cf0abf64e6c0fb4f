//! MonitorTransport middleware for tracing serial traffic
//!
//! Wraps any `Transport` and logs every chunk written to or read from the
//! board under the `wire` target.
//!
//! # Example
//!
//! ```ignore
//! use openfire_transport::{MonitorConfig, MonitorTransport, SerialTransport};
//!
//! let transport = Box::new(SerialTransport::open("/dev/ttyACM0")?);
//! let monitored = MonitorTransport::wrap(transport, MonitorConfig::default());
//! // Now all traffic shows up with RUST_LOG=wire=info
//! ```

use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::{Transport, TransportDeviceInfo, TransportError};

/// Direction filter for selective display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrafficFilter {
    #[default]
    All,
    /// Host → board only
    Sent,
    /// Board → host only
    Received,
}

impl FromStr for TrafficFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "sent" | "tx" => Ok(Self::Sent),
            "received" | "rx" => Ok(Self::Received),
            _ => Err(format!("Unknown filter: {}", s)),
        }
    }
}

/// Configuration for the MonitorTransport
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// Show raw hex alongside the escaped text
    pub show_hex: bool,
    /// Log the heartbeat ping (noisy)
    pub show_heartbeat: bool,
    /// Direction filter
    pub filter: TrafficFilter,
}

impl MonitorConfig {
    pub fn with_hex(mut self, show: bool) -> Self {
        self.show_hex = show;
        self
    }

    pub fn with_heartbeat(mut self, show: bool) -> Self {
        self.show_heartbeat = show;
        self
    }

    pub fn with_filter(mut self, filter: TrafficFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Transport middleware that logs all traffic
pub struct MonitorTransport {
    inner: Box<dyn Transport>,
    config: MonitorConfig,
}

impl MonitorTransport {
    /// Wrap a transport with logging middleware
    pub fn wrap(transport: Box<dyn Transport>, config: MonitorConfig) -> Box<dyn Transport> {
        Box::new(Self {
            inner: transport,
            config,
        })
    }

    fn log(&self, arrow: &str, data: &[u8]) {
        if self.config.show_hex {
            info!(target: "wire", "{} {:<40} [{}]", arrow, escape(data), hex(data));
        } else {
            info!(target: "wire", "{} {}", arrow, escape(data));
        }
    }
}

/// Render bytes as printable text with `\r`, `\n` and non-ASCII escaped
pub fn escape(data: &[u8]) -> String {
    data.iter()
        .flat_map(|&b| std::ascii::escape_default(b))
        .map(char::from)
        .collect()
}

fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Transport for MonitorTransport {
    fn send(&mut self, data: &[u8], timeout: Duration) -> Result<(), TransportError> {
        let is_heartbeat = data == crate::protocol::cmd::HEARTBEAT.as_bytes();
        if self.config.filter != TrafficFilter::Received
            && (!is_heartbeat || self.config.show_heartbeat)
        {
            self.log("→", data);
        }
        let result = self.inner.send(data, timeout);
        if let Err(e) = &result {
            info!(target: "wire", "→ send failed: {}", e);
        }
        result
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let n = self.inner.recv(buf, timeout)?;
        if n > 0 && self.config.filter != TrafficFilter::Sent {
            self.log("←", &buf[..n]);
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.inner.clear_input()
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        self.inner.device_info()
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        info!(target: "wire", "closed {}", self.inner.device_info().port);
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    #[test]
    fn test_filter_from_str() {
        assert_eq!("tx".parse::<TrafficFilter>(), Ok(TrafficFilter::Sent));
        assert_eq!("".parse::<TrafficFilter>(), Ok(TrafficFilter::All));
        assert!("both".parse::<TrafficFilter>().is_err());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(b"OK:\r\n"), "OK:\\r\\n");
        assert_eq!(hex(b"XP"), "58 50");
    }

    #[test]
    fn test_passthrough() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.expect("XP", "OpenFIRE,5.2,Dawn,rpipico,0\r\n");
        let mut monitored = MonitorTransport::wrap(Box::new(mock), MonitorConfig::default());

        monitored.send(b"XP", Duration::from_millis(10)).unwrap();
        let mut buf = [0u8; 64];
        let n = monitored.recv(&mut buf, Duration::from_millis(10)).unwrap();
        assert!(buf[..n].starts_with(b"OpenFIRE"));
        assert_eq!(handle.sent(), vec!["XP"]);
    }
}
