//! Common types for transport layer

use serde::Serialize;

/// Transport type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransportType {
    /// USB CDC serial port
    Serial,
    /// Scripted in-memory transport (tests, dry runs)
    Mock,
}

/// Device identification information
#[derive(Debug, Clone, Serialize)]
pub struct TransportDeviceInfo {
    /// Transport type
    pub transport_type: TransportType,
    /// Port name or identifier (transport-specific)
    pub port: String,
    /// USB Vendor ID, if the port is a USB device
    pub vid: Option<u16>,
    /// USB Product ID, if the port is a USB device
    pub pid: Option<u16>,
    /// Serial number if available
    pub serial: Option<String>,
    /// Product name if available
    pub product_name: Option<String>,
}

impl TransportDeviceInfo {
    pub fn mock() -> Self {
        Self {
            transport_type: TransportType::Mock,
            port: "mock".to_string(),
            vid: None,
            pid: None,
            serial: None,
            product_name: None,
        }
    }
}

/// A serial port found during discovery
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredPort {
    pub info: TransportDeviceInfo,
    /// Whether the port's vendor id matches OpenFIRE firmware
    pub is_openfire: bool,
}

/// How multi-field records are laid out on the wire
///
/// Current firmware sends a record as one comma-separated line. Older
/// firmware sent each field on its own line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FieldMode {
    #[default]
    Comma,
    PerLine,
}

impl std::str::FromStr for FieldMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comma" => Ok(Self::Comma),
            "per-line" | "perline" | "legacy" => Ok(Self::PerLine),
            _ => Err(format!("Unknown field mode: {s} (comma, per-line)")),
        }
    }
}
