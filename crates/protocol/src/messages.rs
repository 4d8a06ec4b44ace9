//! Protocol message definitions
//!
//! Every message is a request/response pair wrapped in a versioned envelope.
//! Attach and detach address a device by its server-side bus id; device
//! selection (filters, disambiguation) happens entirely on the client, so the
//! server surface stays minimal.

use crate::types::UsbDevice;
use crate::version::ProtocolVersion;
use serde::{Deserialize, Serialize};

/// Top-level message envelope
///
/// All protocol messages carry the protocol version for compatibility
/// checking on both ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Protocol version of this message
    pub version: ProtocolVersion,
    /// Message payload
    pub payload: MessagePayload,
}

impl Message {
    /// Wrap a payload in an envelope with the current protocol version
    pub fn new(payload: MessagePayload) -> Self {
        Self {
            version: crate::CURRENT_VERSION,
            payload,
        }
    }
}

/// All message types in the protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessagePayload {
    /// Request the server's current device inventory
    ListRequest,

    /// Device inventory, in the server's enumeration order
    ListResponse {
        /// Devices currently present on the server
        devices: Vec<UsbDevice>,
    },

    /// Request to export the device with the given bus id
    AttachRequest {
        /// Sysfs bus id on the server
        bus_id: String,
    },

    /// Successful attach; echoes the device that was bound
    AttachResponse {
        /// The device as the server saw it when binding
        device: UsbDevice,
    },

    /// Request to stop exporting the device with the given bus id
    DetachRequest {
        /// Sysfs bus id on the server
        bus_id: String,
    },

    /// Successful detach; echoes the device that was unbound
    DetachResponse {
        /// The device as the server saw it when unbinding
        device: UsbDevice,
    },

    /// Server-side failure, in the server's own words
    Error {
        /// Human-readable error message
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CURRENT_VERSION;

    #[test]
    fn test_message_new_uses_current_version() {
        let msg = Message::new(MessagePayload::ListRequest);
        assert_eq!(msg.version, CURRENT_VERSION);
    }
}
