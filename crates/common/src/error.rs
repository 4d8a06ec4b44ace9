//! Common error types
//!
//! Transport and configuration failures shared by client and server.
//! Resolution failures (no match, ambiguity) live with the resolver in the
//! client crate because they carry match-set context.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Server refused the connection or is unreachable
    #[error("Connection to {server} failed: {message}")]
    Connection { server: String, message: String },

    /// Server did not answer within the per-server bound
    #[error("Server {server} did not respond within {:.1}s", timeout.as_secs_f64())]
    Timeout { server: String, timeout: Duration },

    /// The server answered with its own error payload
    #[error("Server {server} returned an error: {message}")]
    Server { server: String, message: String },

    /// Invalid configuration or usage (detected before any network activity)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A local command (usbip) failed
    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    #[error("Protocol error: {0}")]
    Protocol(#[from] awusb_protocol::ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the failures the scan phase downgrades to warnings
    pub fn is_scan_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. } | Error::Timeout { .. } | Error::Server { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
