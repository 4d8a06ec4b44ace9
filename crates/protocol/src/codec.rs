//! Message serialization and framing
//!
//! Messages are serialized with postcard and framed for TCP as
//! `[length: u32 big-endian][postcard bytes]`. A list response for a fully
//! loaded hub is a few KiB, so the frame cap is deliberately small; anything
//! bigger than [`MAX_FRAME_SIZE`] is a protocol violation, not a real
//! inventory.

use crate::{CURRENT_VERSION, Message, ProtocolVersion, error::ProtocolError, error::Result};
use std::io::{Read, Write};

#[cfg(feature = "async")]
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Maximum allowed frame size (1 MiB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Encode a message to bytes using postcard
pub fn encode_message(message: &Message) -> Result<Vec<u8>> {
    postcard::to_allocvec(message).map_err(ProtocolError::from)
}

/// Decode a message from bytes using postcard
pub fn decode_message(bytes: &[u8]) -> Result<Message> {
    postcard::from_bytes(bytes).map_err(ProtocolError::from)
}

/// Reject messages this build cannot exchange with
///
/// The policy lives on [`ProtocolVersion::is_compatible_with`]; this adds
/// the error detail for the reply.
pub fn validate_version(message_version: &ProtocolVersion) -> Result<()> {
    if !message_version.is_compatible_with(&CURRENT_VERSION) {
        return Err(ProtocolError::IncompatibleVersion {
            major: message_version.major,
            minor: message_version.minor,
            expected_major: CURRENT_VERSION.major,
            expected_minor: CURRENT_VERSION.minor,
        });
    }
    Ok(())
}

/// Encode a message with its length prefix
pub fn encode_framed(message: &Message) -> Result<Vec<u8>> {
    let body = encode_message(message)?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: body.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decode a framed message from a complete buffer
pub fn decode_framed(frame: &[u8]) -> Result<Message> {
    if frame.len() < 4 {
        return Err(ProtocolError::IncompleteFrame {
            expected: 4,
            actual: frame.len(),
        });
    }

    let length = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    if length > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: length,
            max: MAX_FRAME_SIZE,
        });
    }
    if frame.len() < 4 + length {
        return Err(ProtocolError::IncompleteFrame {
            expected: 4 + length,
            actual: frame.len(),
        });
    }

    decode_message(&frame[4..4 + length])
}

/// Write a framed message to a blocking writer
pub fn write_framed<W: Write>(writer: &mut W, message: &Message) -> Result<()> {
    let framed = encode_framed(message)?;
    writer.write_all(&framed)?;
    Ok(())
}

/// Read a framed message from a blocking reader
pub fn read_framed<R: Read>(reader: &mut R) -> Result<Message> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let length = u32::from_be_bytes(len_bytes) as usize;

    if length > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: length,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body)?;
    decode_message(&body)
}

/// Async: write a framed message to an async writer (e.g. a TCP stream)
#[cfg(feature = "async")]
pub async fn write_framed_async<W>(writer: &mut W, message: &Message) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
{
    let framed = encode_framed(message)?;
    writer.write_all(&framed).await?;
    Ok(())
}

/// Async: read and decode a framed message from an async reader
#[cfg(feature = "async")]
pub async fn read_framed_async<R>(reader: &mut R) -> Result<Message>
where
    R: AsyncReadExt + Unpin,
{
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let length = u32::from_be_bytes(len_bytes) as usize;

    if length > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: length,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    decode_message(&body)
}
