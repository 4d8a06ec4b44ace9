//! Aggregated device inventory
//!
//! Merges the per-server scan results into one addressable snapshot. Order
//! is load-bearing: entries follow server configuration order, then each
//! server's own enumeration order, and that ordering is the `--first`
//! tie-break. Everything here is an explicitly ordered sequence; a hash
//! container would make `--first` irreproducible.

use crate::filter::DeviceFilter;
use crate::net::ScanReport;
use awusb_common::ServerSpec;
use awusb_protocol::UsbDevice;

/// One device on one server, tagged with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub server: ServerSpec,
    pub device: UsbDevice,
}

impl std::fmt::Display for InventoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}", self.device, self.server)
    }
}

/// The merged per-invocation snapshot across all scanned servers
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
}

impl Inventory {
    /// Flatten all successful per-server lists, preserving order
    ///
    /// Failed servers contribute nothing here; their warnings stay on the
    /// scan report for final reporting.
    pub fn aggregate(report: &ScanReport) -> Self {
        let entries = report
            .results()
            .iter()
            .filter_map(|(spec, result)| result.as_ref().ok().map(|devices| (spec, devices)))
            .flat_map(|(spec, devices)| {
                devices.iter().map(|device| InventoryEntry {
                    server: spec.clone(),
                    device: device.clone(),
                })
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply a filter, producing the ordered match set
    pub fn matching(&self, filter: &DeviceFilter) -> MatchSet {
        MatchSet {
            entries: self
                .entries
                .iter()
                .filter(|entry| filter.matches(&entry.device))
                .cloned()
                .collect(),
        }
    }
}

/// Ordered filter result; never mutated after construction
#[derive(Debug, Clone)]
pub struct MatchSet {
    entries: Vec<InventoryEntry>,
}

impl MatchSet {
    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&InventoryEntry> {
        self.entries.first()
    }

    /// Distinct origin servers, in first-appearance order
    ///
    /// Identity here is the full spec (host and port): two servers on one
    /// host are still two servers. Host-level normalization already happened
    /// at config load.
    pub fn distinct_servers(&self) -> Vec<&ServerSpec> {
        let mut servers: Vec<&ServerSpec> = Vec::new();
        for entry in &self.entries {
            if !servers.iter().any(|s| **s == entry.server) {
                servers.push(&entry.server);
            }
        }
        servers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awusb_protocol::AttachState;

    fn device(bus_id: &str, desc: &str) -> UsbDevice {
        UsbDevice {
            bus_id: bus_id.to_string(),
            vendor_id: 0x1234,
            product_id: 0x5678,
            serial: None,
            description: desc.to_string(),
            state: AttachState::Free,
        }
    }

    fn entry(host: &str, bus_id: &str, desc: &str) -> InventoryEntry {
        InventoryEntry {
            server: ServerSpec::new(host),
            device: device(bus_id, desc),
        }
    }

    fn inventory(entries: Vec<InventoryEntry>) -> Inventory {
        Inventory { entries }
    }

    #[test]
    fn test_matching_preserves_order() {
        let inv = inventory(vec![
            entry("s1", "1-1", "Camera"),
            entry("s1", "1-2", "Keyboard"),
            entry("s2", "2-1", "Camera"),
        ]);
        let filter = DeviceFilter::from_args(None, None, None, Some("camera")).unwrap();
        let matches = inv.matching(&filter);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches.entries()[0].server.host, "s1");
        assert_eq!(matches.entries()[1].server.host, "s2");
    }

    #[test]
    fn test_every_match_satisfies_filter() {
        let inv = inventory(vec![
            entry("s1", "1-1", "Camera"),
            entry("s1", "1-2", "Keyboard"),
            entry("s2", "2-1", "Hub"),
        ]);
        let filter = DeviceFilter::from_args(None, None, None, Some("e")).unwrap();
        let matches = inv.matching(&filter);
        assert!(
            matches
                .entries()
                .iter()
                .all(|entry| filter.matches(&entry.device))
        );
    }

    #[test]
    fn test_distinct_servers_first_appearance_order() {
        let matches = MatchSet {
            entries: vec![
                entry("s2", "1-1", "A"),
                entry("s1", "1-2", "B"),
                entry("s2", "1-3", "C"),
            ],
        };
        let hosts: Vec<&str> = matches
            .distinct_servers()
            .iter()
            .map(|s| s.host.as_str())
            .collect();
        assert_eq!(hosts, vec!["s2", "s1"]);
    }

    #[test]
    fn test_distinct_servers_same_host_different_ports() {
        let on_port = |port: u16, bus_id: &str| InventoryEntry {
            server: ServerSpec {
                host: "127.0.0.1".to_string(),
                port: Some(port),
            },
            device: device(bus_id, "Camera"),
        };
        let matches = MatchSet {
            entries: vec![on_port(6001, "1-1"), on_port(6002, "2-1")],
        };
        // one host, two configured servers: still two origins
        assert_eq!(matches.distinct_servers().len(), 2);
    }

    #[test]
    fn test_empty_inventory() {
        let inv = Inventory::default();
        assert!(inv.is_empty());
        let filter = DeviceFilter::from_args(None, None, None, Some("")).unwrap();
        assert!(inv.matching(&filter).is_empty());
    }
}
