//! Concurrent scan across the configured servers
//!
//! One task per server, no shared mutable state: each task produces only its
//! own result, and results are re-keyed by configuration index afterwards so
//! the report order never depends on which server answered first. A slow or
//! dead server costs at most its own timeout and never delays the others.

use crate::net::ServerClient;
use awusb_common::{Error, Result, ServerSpec};
use awusb_protocol::UsbDevice;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub struct ServerPool {
    servers: Vec<ServerSpec>,
    timeout: Duration,
}

/// Per-server scan results, in configuration order
pub struct ScanReport {
    results: Vec<(ServerSpec, Result<Vec<UsbDevice>>)>,
}

impl ServerPool {
    /// Build a pool over the given servers
    ///
    /// An empty server set is a configuration error, raised here so no
    /// network activity ever happens for a misconfigured invocation.
    pub fn new(servers: Vec<ServerSpec>, timeout: Duration) -> Result<Self> {
        if servers.is_empty() {
            return Err(Error::Config(
                "no servers configured; add servers to the config file or pass --host".to_string(),
            ));
        }
        Ok(Self { servers, timeout })
    }

    pub fn servers(&self) -> &[ServerSpec] {
        &self.servers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// A client for one member server
    pub fn client(&self, spec: &ServerSpec) -> ServerClient {
        ServerClient::new(spec.clone(), self.timeout)
    }

    /// List devices on every server concurrently
    pub async fn scan(&self) -> ScanReport {
        debug!(
            "Scanning {} servers (timeout {:.1}s each)",
            self.servers.len(),
            self.timeout.as_secs_f64()
        );

        let mut tasks = JoinSet::new();
        for (index, spec) in self.servers.iter().enumerate() {
            let client = self.client(spec);
            tasks.spawn(async move { (index, client.list().await) });
        }

        let mut slots: Vec<Option<Result<Vec<UsbDevice>>>> =
            (0..self.servers.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!("Scan task failed to complete: {}", e),
            }
        }

        let results = self
            .servers
            .iter()
            .cloned()
            .zip(slots)
            .map(|(spec, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(Error::Connection {
                        server: spec.to_string(),
                        message: "scan task vanished".to_string(),
                    })
                });
                (spec, result)
            })
            .collect();

        let report = ScanReport { results };
        for warning in report.warnings() {
            warn!("{}", warning);
        }
        report
    }
}

impl ScanReport {
    /// Build a report from already-computed per-server results
    ///
    /// The scan produces reports itself; this exists for callers that fake a
    /// scan (tests, mainly). Order of `results` is taken as configuration
    /// order.
    pub fn from_results(results: Vec<(ServerSpec, Result<Vec<UsbDevice>>)>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[(ServerSpec, Result<Vec<UsbDevice>>)] {
        &self.results
    }

    /// Servers that answered, in configuration order
    pub fn reachable_servers(&self) -> Vec<&ServerSpec> {
        self.results
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(spec, _)| spec)
            .collect()
    }

    /// One warning line per failed server
    pub fn warnings(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|(_, r)| r.as_ref().err())
            .map(|e| e.to_string())
            .collect()
    }

    /// True when not a single server answered
    pub fn all_failed(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_is_config_error() {
        let result = ServerPool::new(Vec::new(), Duration::from_secs(5));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_report_accessors() {
        let s1 = ServerSpec::new("s1");
        let s2 = ServerSpec::new("s2");
        let report = ScanReport {
            results: vec![
                (s1.clone(), Ok(Vec::new())),
                (
                    s2.clone(),
                    Err(Error::Connection {
                        server: "s2".to_string(),
                        message: "connection refused".to_string(),
                    }),
                ),
            ],
        };

        assert!(!report.all_failed());
        assert_eq!(report.reachable_servers(), vec![&s1]);
        let warnings = report.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("s2"));
    }

    #[test]
    fn test_all_failed() {
        let report = ScanReport {
            results: vec![(
                ServerSpec::new("s1"),
                Err(Error::Timeout {
                    server: "s1".to_string(),
                    timeout: Duration::from_secs(5),
                }),
            )],
        };
        assert!(report.all_failed());
        assert!(report.reachable_servers().is_empty());
    }
}
