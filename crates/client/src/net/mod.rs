//! Networking: per-server client and the concurrent scan pool

mod pool;
mod server_client;

pub use pool::{ScanReport, ServerPool};
pub use server_client::ServerClient;
