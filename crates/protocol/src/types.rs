//! Wire type definitions
//!
//! A `UsbDevice` is a snapshot of one exportable device on a server at scan
//! time. The `bus_id` (sysfs form, e.g. "1-2.1") together with the server it
//! came from is the identity used for attach/detach; the serial number is
//! preferred for human selection when present but may be absent or repeated
//! across identical hardware.

use serde::{Deserialize, Serialize};

/// Whether a device is currently exported to a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachState {
    /// Device is available on the server
    Free,
    /// Device is bound to the usbip host driver and in use
    Attached,
}

/// One USB device as reported by a server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbDevice {
    /// Sysfs bus id on the server (e.g. "1-2.1")
    pub bus_id: String,
    /// USB vendor ID
    pub vendor_id: u16,
    /// USB product ID
    pub product_id: u16,
    /// Serial number string, if the device reports one
    pub serial: Option<String>,
    /// Human-readable description (manufacturer and product strings)
    pub description: String,
    /// Export state at scan time
    pub state: AttachState,
}

impl UsbDevice {
    /// The "vid:pid" rendering used throughout the CLI
    pub fn id_string(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

impl std::fmt::Display for UsbDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<8} {} {}",
            self.bus_id,
            self.id_string(),
            self.description
        )?;
        if let Some(serial) = &self.serial {
            write!(f, " (serial: {})", serial)?;
        }
        if self.state == AttachState::Attached {
            write!(f, " [attached]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> UsbDevice {
        UsbDevice {
            bus_id: "1-2.1".to_string(),
            vendor_id: 0x0bda,
            product_id: 0x5400,
            serial: Some("ABC123".to_string()),
            description: "Realtek Billboard Device".to_string(),
            state: AttachState::Free,
        }
    }

    #[test]
    fn test_id_string_zero_padded() {
        let dev = device();
        assert_eq!(dev.id_string(), "0bda:5400");
    }

    #[test]
    fn test_display_includes_serial() {
        let rendered = device().to_string();
        assert!(rendered.contains("1-2.1"));
        assert!(rendered.contains("0bda:5400"));
        assert!(rendered.contains("serial: ABC123"));
        assert!(!rendered.contains("[attached]"));
    }

    #[test]
    fn test_display_marks_attached() {
        let mut dev = device();
        dev.state = AttachState::Attached;
        dev.serial = None;
        let rendered = dev.to_string();
        assert!(rendered.contains("[attached]"));
        assert!(!rendered.contains("serial"));
    }
}
