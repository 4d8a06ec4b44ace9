//! Configuration management
//!
//! The core only consumes `{servers, timeout}`; discovery order follows the
//! usual convention: explicit `--config` path, then the user config dir,
//! then `/etc/awusb/config.toml`, then built-in defaults.

use crate::error::{Error, Result};
use crate::server_spec::ServerSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default control port of a USB server
pub const DEFAULT_PORT: u16 = 5055;

/// Default per-server timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// On-disk configuration format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    /// Server addresses ("host" or "host:port"), scanned in this order
    #[serde(default)]
    servers: Vec<String>,
    /// Per-server connection/response timeout in seconds
    #[serde(default = "default_timeout_secs")]
    timeout_secs: f64,
    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_timeout_secs() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_level: default_log_level(),
        }
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Ordered, deduplicated server list; the scan and all tie-breaks follow
    /// this order
    pub servers: Vec<ServerSpec>,
    /// Per-server timeout
    pub timeout: Duration,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        ConfigFile::default()
            .into_config()
            .expect("default config is valid")
    }
}

impl ConfigFile {
    fn into_config(self) -> Result<Config> {
        if !(self.timeout_secs > 0.0) {
            return Err(Error::Config(format!(
                "timeout_secs must be positive, got {}",
                self.timeout_secs
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(Error::Config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        let servers = self
            .servers
            .iter()
            .map(|s| ServerSpec::parse(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Config {
            servers: ServerSpec::dedup(servers),
            timeout: Duration::from_secs_f64(self.timeout_secs),
            log_level: self.log_level,
        })
    }

    fn from_config(config: &Config) -> Self {
        Self {
            servers: config.servers.iter().map(|s| s.to_string()).collect(),
            timeout_secs: config.timeout.as_secs_f64(),
            log_level: config.log_level.clone(),
        }
    }
}

impl Config {
    /// Load configuration from the given path, or search standard locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => {
                let expanded = shellexpand::tilde(&p.to_string_lossy()).into_owned();
                PathBuf::from(expanded)
            }
            None => {
                let candidates = [Self::default_path(), PathBuf::from("/etc/awusb/config.toml")];
                match candidates.into_iter().find(|p| p.exists()) {
                    Some(p) => p,
                    None => {
                        tracing::debug!("No configuration file found, using defaults");
                        return Ok(Self::default());
                    }
                }
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| {
            Error::Config(format!(
                "failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let file: ConfigFile = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "failed to parse config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let config = file.into_config()?;
        tracing::info!(
            "Loaded configuration from {} ({} servers, timeout {:.1}s)",
            config_path.display(),
            config.servers.len(),
            config.timeout.as_secs_f64()
        );
        Ok(config)
    }

    /// Load configuration or fall back to defaults on failure
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                // stderr because logging may not be initialized yet
                eprintln!("Config: {}", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(&ConfigFile::from_config(self))
            .map_err(|e| Error::Config(format!("failed to serialize configuration: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;

        tracing::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Default configuration file path (user config dir)
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("awusb").join("config.toml")
        } else {
            PathBuf::from(".config/awusb/config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.servers.is_empty());
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let file: ConfigFile = toml::from_str(
            r#"
            servers = ["pi-lab", "10.0.0.5:6000", "PI-LAB"]
            timeout_secs = 2.5
            log_level = "debug"
            "#,
        )
        .unwrap();
        let config = file.into_config().unwrap();

        // duplicate host collapses, order preserved
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].host, "pi-lab");
        assert_eq!(config.servers[1].address(), "10.0.0.5:6000");
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let file: ConfigFile = toml::from_str(r#"servers = ["s1"]"#).unwrap();
        let config = file.into_config().unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_rejects_nonpositive_timeout() {
        let file: ConfigFile = toml::from_str(r#"timeout_secs = 0.0"#).unwrap();
        assert!(matches!(file.into_config(), Err(Error::Config(_))));

        let file: ConfigFile = toml::from_str(r#"timeout_secs = -1.0"#).unwrap();
        assert!(matches!(file.into_config(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let file: ConfigFile = toml::from_str(r#"log_level = "loud""#).unwrap();
        assert!(matches!(file.into_config(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_malformed_server() {
        let file: ConfigFile = toml::from_str(r#"servers = ["host:badport"]"#).unwrap();
        assert!(matches!(file.into_config(), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = ConfigFile {
            servers: vec!["s1".to_string(), "s2:7000".to_string()],
            timeout_secs: 1.5,
            log_level: "warn".to_string(),
        }
        .into_config()
        .unwrap();
        config.save(&path).unwrap();

        let loaded = Config::load(Some(path)).unwrap();
        assert_eq!(loaded.servers, config.servers);
        assert_eq!(loaded.timeout, config.timeout);
        assert_eq!(loaded.log_level, "warn");
    }

    #[test]
    fn test_load_missing_explicit_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(path)),
            Err(Error::Config(_))
        ));
    }
}
