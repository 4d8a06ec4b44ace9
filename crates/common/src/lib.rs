//! Common utilities for awusb
//!
//! Shared functionality between the client and the server: the error
//! taxonomy, configuration loading, logging setup, and the server-address
//! value type used to key everything from scan results to warnings.

pub mod config;
pub mod error;
pub mod logging;
pub mod server_spec;

pub use config::{Config, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS};
pub use error::{Error, Result};
pub use logging::setup_logging;
pub use server_spec::ServerSpec;
