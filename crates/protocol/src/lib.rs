//! Control protocol for awusb
//!
//! This crate defines the request/response messages exchanged between the
//! awusb client and each USB server, serialized with postcard and framed
//! with a length prefix for use over TCP streams. It deliberately covers
//! only the control plane (list/attach/detach); the USB data plane is
//! carried by the kernel usbip facility and never passes through here.
//!
//! # Example
//!
//! ```
//! use awusb_protocol::{Message, MessagePayload, CURRENT_VERSION};
//! use awusb_protocol::{encode_framed, decode_framed};
//!
//! let msg = Message {
//!     version: CURRENT_VERSION,
//!     payload: MessagePayload::ListRequest,
//! };
//!
//! let framed = encode_framed(&msg).unwrap();
//! let decoded = decode_framed(&framed).unwrap();
//! assert_eq!(decoded.version, CURRENT_VERSION);
//! ```

pub mod codec;
pub mod error;
pub mod messages;
pub mod types;
pub mod version;

pub use codec::{
    MAX_FRAME_SIZE, decode_framed, decode_message, encode_framed, encode_message, read_framed,
    validate_version, write_framed,
};

#[cfg(feature = "async")]
pub use codec::{read_framed_async, write_framed_async};
pub use error::{ProtocolError, Result};
pub use messages::{Message, MessagePayload};
pub use types::{AttachState, UsbDevice};
pub use version::{CURRENT_VERSION, ProtocolVersion};
