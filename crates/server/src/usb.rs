//! Local USB device enumeration
//!
//! Builds the exportable inventory from libusb, one record per physical
//! device. The bus id is reconstructed in sysfs form (`bus-port.port...`,
//! e.g. "1-2.1") because that is the name `usbip bind` addresses devices by.
//! Hubs and root hubs are not exportable and are skipped.

use anyhow::{Context as _, Result};
use awusb_protocol::{AttachState, UsbDevice};
use rusb::{Device, DeviceDescriptor, DeviceHandle, GlobalContext};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, warn};

const USB_CLASS_HUB: u8 = 0x09;

/// Snapshot the exportable devices currently on this host
///
/// Devices that fail to describe themselves are logged and skipped rather
/// than failing the whole enumeration; a flaky device must not hide the
/// rest of the inventory.
pub fn enumerate() -> Result<Vec<UsbDevice>> {
    let list = rusb::devices().context("libusb enumeration failed")?;

    let mut devices = Vec::new();
    for device in list.iter() {
        match snapshot(&device) {
            Ok(Some(snapshot)) => devices.push(snapshot),
            Ok(None) => {}
            Err(e) => warn!(
                "Skipping device on bus {} address {}: {}",
                device.bus_number(),
                device.address(),
                e
            ),
        }
    }

    devices.sort_by(|a, b| a.bus_id.cmp(&b.bus_id));
    debug!("Enumerated {} exportable devices", devices.len());
    Ok(devices)
}

fn snapshot(device: &Device<GlobalContext>) -> Result<Option<UsbDevice>> {
    let descriptor = device
        .device_descriptor()
        .context("could not read device descriptor")?;
    if descriptor.class_code() == USB_CLASS_HUB {
        return Ok(None);
    }
    let Some(bus_id) = bus_id_for(device) else {
        // no port chain: root hub
        return Ok(None);
    };

    let (description, serial) = describe(device, &descriptor);
    Ok(Some(UsbDevice {
        vendor_id: descriptor.vendor_id(),
        product_id: descriptor.product_id(),
        serial,
        description,
        state: attach_state(&bus_id),
        bus_id,
    }))
}

/// Sysfs bus id: bus number, then the port chain joined with dots
fn bus_id_for(device: &Device<GlobalContext>) -> Option<String> {
    let ports = device.port_numbers().ok()?;
    if ports.is_empty() {
        return None;
    }
    let chain: Vec<String> = ports.iter().map(u8::to_string).collect();
    Some(format!("{}-{}", device.bus_number(), chain.join(".")))
}

/// Read the human-readable strings, falling back to the numeric id
///
/// Opening can fail (permissions, device busy); the device is still listed,
/// just with less to show.
fn describe(
    device: &Device<GlobalContext>,
    descriptor: &DeviceDescriptor,
) -> (String, Option<String>) {
    match device.open() {
        Ok(handle) => {
            let serial = read_string(&handle, |h| h.read_serial_number_string_ascii(descriptor));
            let manufacturer =
                read_string(&handle, |h| h.read_manufacturer_string_ascii(descriptor));
            let product = read_string(&handle, |h| h.read_product_string_ascii(descriptor));

            let description = match (manufacturer, product) {
                (Some(m), Some(p)) => format!("{} {}", m, p),
                (None, Some(p)) => p,
                (Some(m), None) => m,
                (None, None) => fallback_description(descriptor.vendor_id(), descriptor.product_id()),
            };
            (description, serial)
        }
        Err(e) => {
            debug!(
                "Could not open {:04x}:{:04x} for string descriptors: {}",
                descriptor.vendor_id(),
                descriptor.product_id(),
                e
            );
            (
                fallback_description(descriptor.vendor_id(), descriptor.product_id()),
                None,
            )
        }
    }
}

fn read_string<F>(handle: &DeviceHandle<GlobalContext>, read: F) -> Option<String>
where
    F: Fn(&DeviceHandle<GlobalContext>) -> rusb::Result<String>,
{
    read(handle)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn fallback_description(vendor_id: u16, product_id: u16) -> String {
    format!("USB device {:04x}:{:04x}", vendor_id, product_id)
}

/// Export state from sysfs: bound to usbip-host means attached
pub fn attach_state(bus_id: &str) -> AttachState {
    attach_state_under(Path::new("/sys/bus/usb/devices"), bus_id)
}

fn attach_state_under(devices_root: &Path, bus_id: &str) -> AttachState {
    let link = devices_root.join(bus_id).join("driver");
    match std::fs::read_link(&link) {
        Ok(target) if target.file_name() == Some(OsStr::new("usbip-host")) => {
            AttachState::Attached
        }
        _ => AttachState::Free,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    #[test]
    fn test_fallback_description_zero_padded() {
        assert_eq!(fallback_description(0x46d, 0x825), "USB device 046d:0825");
    }

    #[test]
    fn test_attach_state_missing_device_is_free() {
        assert_eq!(
            attach_state_under(Path::new("/nonexistent"), "1-2"),
            AttachState::Free
        );
    }

    #[test]
    fn test_attach_state_from_driver_link() {
        let root = tempfile::tempdir().unwrap();

        let bound = root.path().join("1-2");
        std::fs::create_dir(&bound).unwrap();
        symlink("../../drivers/usbip-host", bound.join("driver")).unwrap();

        let native = root.path().join("1-3");
        std::fs::create_dir(&native).unwrap();
        symlink("../../drivers/usb-storage", native.join("driver")).unwrap();

        let unbound = root.path().join("1-4");
        std::fs::create_dir(&unbound).unwrap();

        assert_eq!(attach_state_under(root.path(), "1-2"), AttachState::Attached);
        assert_eq!(attach_state_under(root.path(), "1-3"), AttachState::Free);
        assert_eq!(attach_state_under(root.path(), "1-4"), AttachState::Free);
    }
}
