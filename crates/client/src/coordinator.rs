//! Attach/detach execution
//!
//! Drives the one resolved device through its transition on the server that
//! owns it, then performs the matching local usbip step. Attach state is
//! never pre-checked locally: it can change between scan and action, so
//! acting on an already-attached or already-free device surfaces the
//! server's own response.

use crate::command::run_command;
use crate::inventory::InventoryEntry;
use crate::net::ServerClient;
use crate::port::Port;
use awusb_common::Result;
use awusb_protocol::UsbDevice;
use std::time::Duration;
use tracing::{info, warn};

/// The mutating operation to perform on the resolved target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Attach,
    Detach,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Attach => write!(f, "attach"),
            Action::Detach => write!(f, "detach"),
        }
    }
}

/// Result of a completed attach or detach
#[derive(Debug)]
pub struct ActionOutcome {
    /// The target that was acted on
    pub entry: InventoryEntry,
    /// The device as the server reported it after the transition
    pub device: UsbDevice,
    /// Local device nodes created by an attach (best effort, may be empty)
    pub local_devices: Vec<String>,
}

/// Execute the resolved action against the owning server
///
/// Exactly one mutating remote call is made per invocation; everything
/// after it is local.
pub async fn execute(action: Action, entry: InventoryEntry, timeout: Duration) -> Result<ActionOutcome> {
    let client = ServerClient::new(entry.server.clone(), timeout);

    match action {
        Action::Attach => {
            info!("Attaching {} from {}", entry.device.bus_id, entry.server);
            let device = client.attach(&entry.device.bus_id).await?;

            // import into the local kernel via vhci-hcd
            run_command(
                "sudo",
                &[
                    "usbip",
                    "attach",
                    "-r",
                    &entry.server.host,
                    "-b",
                    &entry.device.bus_id,
                ],
            )
            .await?;

            let local_devices =
                match Port::by_remote_bus_id(&entry.device.bus_id, &entry.server.host, 20).await {
                    Some(port) => {
                        let nodes = port.local_devices();
                        info!(
                            "Device attached on local port {} (local devices: {})",
                            port.port,
                            if nodes.is_empty() {
                                "none yet".to_string()
                            } else {
                                nodes.join(", ")
                            }
                        );
                        nodes
                    }
                    None => {
                        warn!("Local port not found yet (device may still be initializing)");
                        Vec::new()
                    }
                };

            Ok(ActionOutcome {
                entry,
                device,
                local_devices,
            })
        }
        Action::Detach => {
            info!("Detaching {} from {}", entry.device.bus_id, entry.server);

            // release the local import first, if there is one
            if let Some(port) =
                Port::by_remote_bus_id(&entry.device.bus_id, &entry.server.host, 0).await
            {
                port.detach().await?;
                info!("Released local port {}", port.port);
            }

            let device = client.detach(&entry.device.bus_id).await?;
            Ok(ActionOutcome {
                entry,
                device,
                local_devices: Vec::new(),
            })
        }
    }
}
