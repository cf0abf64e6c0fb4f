//! USB CDC serial transport

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort, SerialPortType};
use tracing::{debug, info};

use crate::error::TransportError;
use crate::protocol::BAUD_RATE;
use crate::types::{TransportDeviceInfo, TransportType};
use crate::Transport;

/// Serial port transport for an OpenFIRE board
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    info: TransportDeviceInfo,
}

impl SerialTransport {
    /// Open a port at the default baud rate
    pub fn open(port_name: &str) -> Result<Self, TransportError> {
        Self::open_with_baud(port_name, BAUD_RATE)
    }

    /// Open a port, assert DTR (the firmware waits for it) and drop stale input
    pub fn open_with_baud(port_name: &str, baud_rate: u32) -> Result<Self, TransportError> {
        info!("Opening {} at {} baud", port_name, baud_rate);

        let mut port = serialport::new(port_name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| TransportError::Open {
                port: port_name.to_string(),
                reason: e.to_string(),
            })?;

        port.write_data_terminal_ready(true)?;
        port.clear(ClearBuffer::All)?;

        Ok(Self {
            port: Some(port),
            info: lookup_port_info(port_name),
        })
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::Disconnected)
    }
}

/// Fill in USB details for a port name, if the OS reports any
fn lookup_port_info(port_name: &str) -> TransportDeviceInfo {
    let mut info = TransportDeviceInfo {
        transport_type: TransportType::Serial,
        port: port_name.to_string(),
        vid: None,
        pid: None,
        serial: None,
        product_name: None,
    };

    let Ok(ports) = serialport::available_ports() else {
        return info;
    };
    if let Some(SerialPortType::UsbPort(usb)) = ports
        .into_iter()
        .find(|p| p.port_name == port_name)
        .map(|p| p.port_type)
    {
        info.vid = Some(usb.vid);
        info.pid = Some(usb.pid);
        info.serial = usb.serial_number;
        info.product_name = usb.product;
    }
    info
}

impl Transport for SerialTransport {
    fn send(&mut self, data: &[u8], timeout: Duration) -> Result<(), TransportError> {
        let port = self.port()?;
        port.set_timeout(timeout)?;
        match port.write_all(data).and_then(|_| port.flush()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::TimedOut => Err(TransportError::Timeout),
            Err(e) => Err(e.into()),
        }
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let port = self.port()?;
        port.set_timeout(timeout)?;
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn clear_input(&mut self) -> Result<(), TransportError> {
        self.port()?.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.port.take().is_some() {
            debug!("Closed {}", self.info.port);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_port_fails() {
        let err = SerialTransport::open("/dev/definitely-not-a-gun").err().unwrap();
        assert!(matches!(err, TransportError::Open { .. }));
    }

    #[test]
    #[ignore] // requires hardware
    fn test_open_first_board() {
        let ports = crate::SerialDiscovery::new().list_ports().unwrap();
        let port = ports.iter().find(|p| p.is_openfire).unwrap();
        let mut transport = SerialTransport::open(&port.info.port).unwrap();
        assert!(transport.is_connected());
        transport.close().unwrap();
        assert!(!transport.is_connected());
    }
}
