//! Host-system operations behind the request dispatcher
//!
//! The dispatcher only needs three things from the machine it runs on:
//! enumerate devices, export one, withdraw one. `SystemHost` is the real
//! implementation (libusb plus the usbip userspace tool); tests substitute
//! their own.

use anyhow::{Result, bail};
use awusb_protocol::UsbDevice;
use tokio::process::Command;
use tracing::debug;

pub trait DeviceHost {
    /// Current exportable inventory
    fn list_devices(&self) -> Result<Vec<UsbDevice>>;

    /// Bind a device to the usbip host driver, making it importable
    async fn export(&self, bus_id: &str) -> Result<()>;

    /// Unbind a device from the usbip host driver
    async fn withdraw(&self, bus_id: &str) -> Result<()>;
}

pub struct SystemHost;

impl DeviceHost for SystemHost {
    fn list_devices(&self) -> Result<Vec<UsbDevice>> {
        crate::usb::enumerate()
    }

    async fn export(&self, bus_id: &str) -> Result<()> {
        run_usbip(&["bind", "-b", bus_id]).await
    }

    async fn withdraw(&self, bus_id: &str) -> Result<()> {
        run_usbip(&["unbind", "-b", bus_id]).await
    }
}

/// Run one usbip subcommand, failing with its own stderr text
///
/// The stderr text is what ends up in the client-facing error payload, so
/// usbip's diagnostics (already bound, no such device) pass through as-is.
async fn run_usbip(args: &[&str]) -> Result<()> {
    debug!("Running: usbip {}", args.join(" "));
    let output = Command::new("sudo")
        .arg("usbip")
        .args(args)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("usbip {} failed: {}", args.join(" "), stderr.trim());
    }
    Ok(())
}
