//! Codec and framing failures
//!
//! Everything that can go wrong between a `Message` value and bytes on a
//! TCP stream. Transport-level classification (timeout vs refused vs remote
//! error) happens above this crate; here a frame either decodes or it
//! doesn't.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Postcard could not encode or decode the message body
    #[error("Serialization error: {0}")]
    Serialization(#[from] postcard::Error),

    /// The peer speaks a different major version
    #[error(
        "Incompatible protocol version: {major}.{minor} (expected {expected_major}.{expected_minor})"
    )]
    IncompatibleVersion {
        major: u8,
        minor: u8,
        expected_major: u8,
        expected_minor: u8,
    },

    /// Length prefix exceeds [`crate::codec::MAX_FRAME_SIZE`]
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Buffer ended before the announced frame length
    #[error("Incomplete frame: expected {expected} bytes, got {actual}")]
    IncompleteFrame { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatible_version_names_both_versions() {
        let err = ProtocolError::IncompatibleVersion {
            major: 2,
            minor: 0,
            expected_major: 1,
            expected_minor: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("2.0"));
        assert!(msg.contains("1.0"));
    }

    #[test]
    fn test_frame_too_large_display() {
        let err = ProtocolError::FrameTooLarge {
            size: 2_000_000,
            max: 1_048_576,
        };
        assert!(err.to_string().contains("Frame too large"));
    }
}
