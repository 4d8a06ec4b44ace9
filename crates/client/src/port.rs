//! Local usbip port discovery
//!
//! After `usbip attach`, the kernel vhci-hcd driver exposes the imported
//! device on a numbered local port. `usbip port` reports the mapping back to
//! `usbip://server:port/busid`; this module parses that output to find the
//! port for a given remote device (needed for detach and for reporting the
//! local device nodes an attach produced).
//!
//! Expected output shape:
//!
//! ```text
//! Imported USB devices
//! ====================
//! Port 00: <Port in Use> at Full Speed(12Mbps)
//!        Logitech, Inc. : Webcam C270 (046d:0825)
//!        3-1 -> usbip://10.0.0.5:3240/1-2.1
//!            -> remote bus/dev 001/003
//! ```

use crate::command::run_command_unchecked;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// One in-use local usbip port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    /// Local vhci port number
    pub port: u32,
    /// Server host the device is imported from
    pub server: String,
    /// Device description as printed by usbip
    pub description: String,
    /// Bus id of the device on the remote server
    pub remote_bus_id: String,
}

impl Port {
    /// List the local usbip ports currently in use
    ///
    /// Returns an empty list when vhci-hcd is not loaded or usbip fails;
    /// "no ports" is the honest answer in both cases.
    pub async fn list() -> Vec<Port> {
        match run_command_unchecked("sudo", &["usbip", "port"]).await {
            Ok(output) if output.status_ok => {
                let ports = parse_ports(&output.stdout);
                debug!("Found {} active usbip ports", ports.len());
                ports
            }
            Ok(output) => {
                debug!("usbip port failed: {}", output.stderr.trim());
                Vec::new()
            }
            Err(e) => {
                debug!("Could not run usbip port: {}", e);
                Vec::new()
            }
        }
    }

    /// Find the local port importing `remote_bus_id` from `server`
    ///
    /// A freshly attached device can take a moment to show up, so the lookup
    /// retries with a short delay. Port ids are unique per server, so at
    /// most one port can match.
    pub async fn by_remote_bus_id(remote_bus_id: &str, server: &str, retries: u32) -> Option<Port> {
        for attempt in 0..=retries {
            if let Some(port) = Self::list()
                .await
                .into_iter()
                .find(|p| p.remote_bus_id == remote_bus_id && p.server == server)
            {
                return Some(port);
            }
            if attempt < retries {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
        None
    }

    /// Release this port locally
    pub async fn detach(&self) -> awusb_common::Result<()> {
        // unchecked: the port may already be gone, which is fine
        run_command_unchecked("sudo", &["usbip", "detach", "-p", &self.port.to_string()]).await?;
        Ok(())
    }

    /// Best-effort discovery of the /dev nodes created for this port
    ///
    /// Walks the vhci sysfs tree for this port and collects DEVNAME entries
    /// from uevent files. Vhci port N appears as device {bus}-{N+1} under
    /// its controller's USB bus.
    pub fn local_devices(&self) -> Vec<String> {
        self.local_devices_under(Path::new("/sys/devices/platform"))
    }

    fn local_devices_under(&self, platform: &Path) -> Vec<String> {
        let mut found = Vec::new();
        let Ok(entries) = std::fs::read_dir(platform) else {
            return found;
        };

        for vhci in entries.flatten() {
            if !vhci.file_name().to_string_lossy().starts_with("vhci_hcd.") {
                continue;
            }
            let Ok(buses) = std::fs::read_dir(vhci.path()) else {
                continue;
            };
            for bus in buses.flatten() {
                let bus_name = bus.file_name().to_string_lossy().into_owned();
                let Some(bus_num) = bus_name.strip_prefix("usb") else {
                    continue;
                };
                let device_dir = bus.path().join(format!("{}-{}", bus_num, self.port + 1));
                if device_dir.is_dir() {
                    collect_dev_names(&device_dir, 0, &mut found);
                }
            }
        }

        found.sort();
        found.dedup();
        found
    }
}

/// Recursively gather DEVNAME entries from uevent files
fn collect_dev_names(dir: &Path, depth: u32, found: &mut Vec<String>) {
    if depth > 6 {
        return;
    }

    let uevent = dir.join("uevent");
    if let Ok(content) = std::fs::read_to_string(&uevent) {
        for line in content.lines() {
            if let Some(name) = line.strip_prefix("DEVNAME=") {
                found.push(format!("/dev/{}", name.trim_start_matches('/')));
            }
        }
    }

    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        // stay inside this device: a child with its own busnum is another
        // USB device, not one of our interfaces
        if path.is_dir()
            && !path.is_symlink()
            && !path.join("busnum").exists()
        {
            collect_dev_names(&path, depth + 1, found);
        }
    }
}

/// Parse `usbip port` output into port records
fn parse_ports(output: &str) -> Vec<Port> {
    let mut ports = Vec::new();
    let mut lines = output.lines().peekable();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed.strip_prefix("Port ") else {
            continue;
        };
        let Some((number, _)) = rest.split_once(':') else {
            continue;
        };
        let Ok(port) = number.trim().parse::<u32>() else {
            continue;
        };

        // next non-empty line is the device description
        let description = match lines.next() {
            Some(desc) => desc.trim().to_string(),
            None => break,
        };

        // then a "{local} -> usbip://server:port/busid" line somewhere
        // before the next Port header
        let mut origin = None;
        while let Some(next) = lines.peek() {
            if next.trim_start().starts_with("Port ") {
                break;
            }
            let line = lines.next().unwrap_or_default();
            if origin.is_none() {
                origin = parse_usbip_url(line);
            }
        }

        if let Some((server, remote_bus_id)) = origin {
            ports.push(Port {
                port,
                server,
                description,
                remote_bus_id,
            });
        }
    }

    ports
}

/// Extract (server, remote busid) from a "-> usbip://server:port/busid" line
fn parse_usbip_url(line: &str) -> Option<(String, String)> {
    let (_, url) = line.split_once("usbip://")?;
    let (server, rest) = url.split_once(':')?;
    let (_, bus_id) = rest.split_once('/')?;
    let bus_id = bus_id.trim();
    if server.is_empty() || bus_id.is_empty() {
        return None;
    }
    Some((server.to_string(), bus_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Imported USB devices
====================
Port 00: <Port in Use> at Full Speed(12Mbps)
       Logitech, Inc. : Webcam C270 (046d:0825)
       3-1 -> usbip://10.0.0.5:3240/1-2.1
           -> remote bus/dev 001/003
Port 01: <Port in Use> at High Speed(480Mbps)
       Realtek Semiconductor Corp. : unknown product (0bda:5400)
       3-2 -> usbip://pi-lab:3240/2-1
           -> remote bus/dev 002/002
";

    #[test]
    fn test_parse_ports_sample_output() {
        let ports = parse_ports(SAMPLE);
        assert_eq!(ports.len(), 2);

        assert_eq!(ports[0].port, 0);
        assert_eq!(ports[0].server, "10.0.0.5");
        assert_eq!(ports[0].remote_bus_id, "1-2.1");
        assert!(ports[0].description.contains("Webcam C270"));

        assert_eq!(ports[1].port, 1);
        assert_eq!(ports[1].server, "pi-lab");
        assert_eq!(ports[1].remote_bus_id, "2-1");
    }

    #[test]
    fn test_parse_ports_empty_output() {
        assert!(parse_ports("Imported USB devices\n====================\n").is_empty());
        assert!(parse_ports("").is_empty());
    }

    #[test]
    fn test_parse_ports_ignores_garbage() {
        let garbled = "Port xx: nonsense\nsomething\nPort 03: ok\n  desc\n  3-1 -> usbip://h:1/9-9\n";
        let ports = parse_ports(garbled);
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 3);
        assert_eq!(ports[0].remote_bus_id, "9-9");
    }

    #[test]
    fn test_parse_usbip_url() {
        assert_eq!(
            parse_usbip_url("   3-1 -> usbip://10.0.0.5:3240/1-2.1"),
            Some(("10.0.0.5".to_string(), "1-2.1".to_string()))
        );
        assert_eq!(parse_usbip_url("no url here"), None);
        assert_eq!(parse_usbip_url("usbip://:3240/1-1"), None);
    }

    #[test]
    fn test_local_devices_missing_sysfs_is_empty() {
        let port = Port {
            port: 0,
            server: "s1".to_string(),
            description: "dev".to_string(),
            remote_bus_id: "1-1".to_string(),
        };
        assert!(
            port.local_devices_under(Path::new("/nonexistent/sysfs"))
                .is_empty()
        );
    }
}
