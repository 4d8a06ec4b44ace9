//! Device filter matching
//!
//! A filter is a predicate over serial, vendor:product id, bus location, and
//! description substring. All present criteria must hold (logical AND); there
//! is no OR composition. A filter with no criteria matches nothing and is
//! rejected as a usage error before any scan runs.

use awusb_common::{Error, Result};
use awusb_protocol::UsbDevice;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    /// Exact, case-sensitive serial number
    pub serial: Option<String>,
    /// Exact vendor/product id pair
    pub id: Option<(u16, u16)>,
    /// Exact bus location (e.g. "1-2.1")
    pub bus: Option<String>,
    /// Case-insensitive description substring. The empty string matches
    /// every device; allowed, but there is always a better filter.
    pub desc: Option<String>,
}

impl DeviceFilter {
    /// Build a filter from CLI-style arguments, parsing the "vid:pid" form
    pub fn from_args(
        id: Option<&str>,
        serial: Option<&str>,
        bus: Option<&str>,
        desc: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            serial: serial.map(str::to_string),
            id: id.map(parse_id).transpose()?,
            bus: bus.map(str::to_string),
            desc: desc.map(str::to_string),
        })
    }

    /// True when no criterion is set
    pub fn is_empty(&self) -> bool {
        self.serial.is_none() && self.id.is_none() && self.bus.is_none() && self.desc.is_none()
    }

    /// Evaluate the filter against one device record
    pub fn matches(&self, device: &UsbDevice) -> bool {
        if let Some(serial) = &self.serial {
            if device.serial.as_deref() != Some(serial.as_str()) {
                return false;
            }
        }
        if let Some((vendor_id, product_id)) = self.id {
            if device.vendor_id != vendor_id || device.product_id != product_id {
                return false;
            }
        }
        if let Some(bus) = &self.bus {
            if device.bus_id != *bus {
                return false;
            }
        }
        if let Some(desc) = &self.desc {
            if !device
                .description
                .to_lowercase()
                .contains(&desc.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}

/// Parse a "vid:pid" device id (hex, as printed by lsusb)
fn parse_id(input: &str) -> Result<(u16, u16)> {
    let parse = |part: &str| u16::from_str_radix(part, 16).ok();
    input
        .split_once(':')
        .and_then(|(vid, pid)| Some((parse(vid)?, parse(pid)?)))
        .ok_or_else(|| {
            Error::Config(format!(
                "invalid device id '{}', expected hex vid:pid (e.g. 0bda:5400)",
                input
            ))
        })
}

impl std::fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(serial) = &self.serial {
            parts.push(format!("serial={}", serial));
        }
        if let Some((vid, pid)) = self.id {
            parts.push(format!("id={:04x}:{:04x}", vid, pid));
        }
        if let Some(bus) = &self.bus {
            parts.push(format!("bus={}", bus));
        }
        if let Some(desc) = &self.desc {
            parts.push(format!("desc~'{}'", desc));
        }
        if parts.is_empty() {
            write!(f, "<empty>")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}
