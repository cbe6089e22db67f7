//! Serial port enumeration

use anyhow::{Context, Result};
use serialport::{available_ports, SerialPortType};

/// A serial port the radar could be attached to
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub name: String,
    /// `vid:pid` and product string for USB adapters
    pub usb: Option<String>,
}

impl PortInfo {
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        let usb = match port_type {
            SerialPortType::UsbPort(usb) => Some(format!(
                "{:04x}:{:04x} {}",
                usb.vid,
                usb.pid,
                usb.product.as_deref().unwrap_or("")
            )),
            _ => None,
        };
        Self { name, usb }
    }
}

/// Enumerate serial ports, skipping Bluetooth links
pub fn list() -> Result<Vec<PortInfo>> {
    let ports = available_ports().context("Failed to enumerate serial ports")?;
    Ok(ports
        .into_iter()
        .filter(|p| !matches!(p.port_type, SerialPortType::BluetoothPort))
        .map(|p| PortInfo::from_serialport(p.port_name, &p.port_type))
        .collect())
}
