//! Transport layer for OpenFIRE light gun configuration
//!
//! This crate moves bytes and lines between the host and an OpenFIRE board:
//!
//! - `Transport`: raw byte I/O with bounded waits (serial port, or a scripted
//!   mock in tests)
//! - `LineChannel`: line buffering, command rendering and record reads on top
//!   of any `Transport`
//! - `MonitorTransport`: middleware that logs all traffic
//! - `event_parser`: classification of unsolicited lines and test-mode telemetry

pub mod channel;
pub mod codec;
pub mod error;
pub mod event_parser;
pub mod mock;
pub mod monitor;
pub mod protocol;
pub mod types;

mod discovery;
mod serial;

pub use channel::LineChannel;
pub use codec::{split_fields, LineCodec};
pub use error::TransportError;
pub use event_parser::{
    parse_notification, parse_telemetry, AnalogDirection, Notification, Point, TelemetryFrame,
    TemperatureLevel,
};
pub use mock::{MockHandle, MockTransport};
pub use monitor::{MonitorConfig, MonitorTransport, TrafficFilter};
pub use protocol::{Command, FeatureTest, ProfileField, WriteCategory};
pub use types::{DiscoveredPort, FieldMode, TransportDeviceInfo, TransportType};

pub use discovery::SerialDiscovery;
pub use serial::SerialTransport;

use std::time::Duration;

/// The core transport trait - all backends implement this
///
/// Every call is bounded: nothing blocks longer than the timeout it is given,
/// and a timeout on read is not an error, just "no data".
pub trait Transport: Send {
    /// Write all bytes to the device
    ///
    /// # Arguments
    /// * `data` - Raw bytes, already encoded
    /// * `timeout` - Upper bound on waiting for the bytes to be written
    fn send(&mut self, data: &[u8], timeout: Duration) -> Result<(), TransportError>;

    /// Wait for incoming bytes
    ///
    /// # Arguments
    /// * `buf` - Destination buffer
    /// * `timeout` - Upper bound on waiting for data to become available
    ///
    /// # Returns
    /// Number of bytes read; `0` means the whole timeout elapsed with nothing
    /// to read
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    /// Discard bytes the OS has buffered but nobody has read yet
    fn clear_input(&mut self) -> Result<(), TransportError>;

    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;

    /// Check if the port is still open
    fn is_connected(&self) -> bool;

    /// Close the port; further sends fail with `Disconnected`
    fn close(&mut self) -> Result<(), TransportError>;
}
