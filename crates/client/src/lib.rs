//! awusb client library
//!
//! The multi-server device directory and attach/detach resolver: scans every
//! configured USB server concurrently, merges the inventories, matches a
//! device filter against the merged view, disambiguates, and drives the one
//! winning device through attach or detach on the server that owns it.
//!
//! The pipeline, in call order:
//! [`net::ServerPool`] → [`inventory::Inventory`] → [`filter::DeviceFilter`]
//! → [`resolver::resolve`] → [`coordinator::execute`].

pub mod command;
pub mod coordinator;
pub mod filter;
pub mod inventory;
pub mod net;
pub mod port;
pub mod resolver;

pub use coordinator::{Action, ActionOutcome};
pub use filter::DeviceFilter;
pub use inventory::{Inventory, InventoryEntry, MatchSet};
pub use net::{ScanReport, ServerClient, ServerPool};
pub use resolver::{ResolveError, resolve};
