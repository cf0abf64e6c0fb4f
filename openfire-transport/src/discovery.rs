//! Serial port discovery for OpenFIRE boards

use serialport::SerialPortType;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::monitor::{MonitorConfig, MonitorTransport};
use crate::protocol::{BAUD_RATE, VENDOR_ID};
use crate::serial::SerialTransport;
use crate::types::{DiscoveredPort, TransportDeviceInfo, TransportType};
use crate::Transport;

/// Serial port discovery
pub struct SerialDiscovery {
    /// Vendor id that marks a port as an OpenFIRE board
    vendor_id: u16,
    baud_rate: u32,
    /// Optional monitor config - wraps opened transports automatically
    monitor_config: Option<MonitorConfig>,
}

impl Default for SerialDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialDiscovery {
    pub fn new() -> Self {
        Self {
            vendor_id: VENDOR_ID,
            baud_rate: BAUD_RATE,
            monitor_config: None,
        }
    }

    pub fn with_vendor_id(mut self, vendor_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Create with monitor config for traffic logging
    pub fn with_monitor(mut self, config: MonitorConfig) -> Self {
        self.monitor_config = Some(config);
        self
    }

    /// List every serial port, flagging the ones that look like OpenFIRE boards
    pub fn list_ports(&self) -> Result<Vec<DiscoveredPort>, TransportError> {
        let ports = serialport::available_ports()?;
        let discovered: Vec<DiscoveredPort> = ports
            .into_iter()
            .map(|p| {
                let mut info = TransportDeviceInfo {
                    transport_type: TransportType::Serial,
                    port: p.port_name,
                    vid: None,
                    pid: None,
                    serial: None,
                    product_name: None,
                };
                if let SerialPortType::UsbPort(usb) = p.port_type {
                    info.vid = Some(usb.vid);
                    info.pid = Some(usb.pid);
                    info.serial = usb.serial_number;
                    info.product_name = usb.product;
                }
                let is_openfire = info.vid == Some(self.vendor_id);
                debug!(
                    "Port {} vid={:?} pid={:?} openfire={}",
                    info.port, info.vid, info.pid, is_openfire
                );
                DiscoveredPort { info, is_openfire }
            })
            .collect();
        Ok(discovered)
    }

    /// List only ports whose vendor id matches
    pub fn list_boards(&self) -> Result<Vec<DiscoveredPort>, TransportError> {
        Ok(self
            .list_ports()?
            .into_iter()
            .filter(|p| p.is_openfire)
            .collect())
    }

    /// Open a port by name
    pub fn open(&self, port_name: &str) -> Result<Box<dyn Transport>, TransportError> {
        let transport: Box<dyn Transport> =
            Box::new(SerialTransport::open_with_baud(port_name, self.baud_rate)?);
        Ok(match &self.monitor_config {
            Some(config) => MonitorTransport::wrap(transport, config.clone()),
            None => transport,
        })
    }

    /// Open the first board found
    pub fn open_any(&self) -> Result<Box<dyn Transport>, TransportError> {
        let boards = self.list_boards()?;
        let first = boards.first().ok_or_else(|| {
            TransportError::DeviceNotFound(format!(
                "No serial port with vendor id 0x{:04X}",
                self.vendor_id
            ))
        })?;
        info!("Found board on {}", first.info.port);
        self.open(&first.info.port)
    }
}
