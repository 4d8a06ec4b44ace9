//! Server address value type
//!
//! A `ServerSpec` identifies one configured USB server. Identity is the
//! normalized host string, so "Pi-Lab" and "pi-lab " configured twice
//! collapse to one server instead of producing duplicate scan slots.

use crate::config::DEFAULT_PORT;
use crate::error::Error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerSpec {
    /// Hostname or IP address, normalized to lowercase
    pub host: String,
    /// Control port; `None` means [`DEFAULT_PORT`]
    #[serde(default)]
    pub port: Option<u16>,
}

impl ServerSpec {
    /// Create a spec from a host, normalizing the identity
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim().to_ascii_lowercase(),
            port: None,
        }
    }

    /// Parse "host" or "host:port"
    pub fn parse(input: &str) -> Result<Self, Error> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::Config("empty server host".to_string()));
        }

        match input.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => {
                let port: u16 = port.parse().map_err(|_| {
                    Error::Config(format!("invalid port in server address '{}'", input))
                })?;
                Ok(Self {
                    port: Some(port),
                    ..Self::new(host)
                })
            }
            Some(_) => Err(Error::Config(format!(
                "invalid server address '{}'",
                input
            ))),
            None => Ok(Self::new(input)),
        }
    }

    /// The port to connect to
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// "host:port" form for socket connection
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }

    /// Collapse duplicate hosts, preserving first-occurrence order
    pub fn dedup(servers: Vec<ServerSpec>) -> Vec<ServerSpec> {
        let mut seen = std::collections::HashSet::new();
        servers
            .into_iter()
            .filter(|s| seen.insert(s.host.clone()))
            .collect()
    }
}

impl std::fmt::Display for ServerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}
