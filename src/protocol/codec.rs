//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - ADD:    pool_id (8) + count (4) + count × f64 (8)
//! - QUERY:  pool_id (8) + percentile f64 (8)
//! - DELETE: pool_id (8)
//! - PING:   empty
//!
//! All integers and floats are big-endian.
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{PoolError, Result};
use crate::types::{Percentile, PoolId};

use super::{Command, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut payload = BytesMut::new();

    match command {
        Command::Add { pool_id, values } => {
            payload.reserve(12 + values.len() * 8);
            payload.put_u64(pool_id.get());
            payload.put_u32(values.len() as u32);
            for value in values {
                payload.put_f64(*value);
            }
        }
        Command::Query { pool_id, percentile } => {
            payload.put_u64(pool_id.get());
            payload.put_f64(percentile.get());
        }
        Command::Delete { pool_id } => {
            payload.put_u64(pool_id.get());
        }
        Command::Ping => {}
    }

    frame(command.command_type() as u8, &payload)
}

/// Decode a command from bytes
///
/// Malformed frames are `Protocol` errors; well-formed frames carrying an
/// invalid pool ID or percentile are `InvalidInput`.
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "")?;

    match cmd_type {
        0x01 => decode_add_command(payload),
        0x02 => decode_query_command(payload),
        0x03 => decode_delete_command(payload),
        0x04 => decode_ping_command(payload),
        _ => Err(PoolError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

/// Decode ADD command payload
fn decode_add_command(payload: &[u8]) -> Result<Command> {
    if payload.len() < 12 {
        return Err(PoolError::Protocol(format!(
            "ADD command: expected at least 12 bytes, got {}",
            payload.len()
        )));
    }

    let mut buf = payload;
    let raw_id = buf.get_u64();
    let count = buf.get_u32() as usize;

    if buf.remaining() != count * 8 {
        return Err(PoolError::Protocol(format!(
            "ADD command: {} values declared but {} bytes follow",
            count,
            buf.remaining()
        )));
    }

    let pool_id = PoolId::new(raw_id)?;
    let mut values = Vec::with_capacity(count);
    while buf.has_remaining() {
        values.push(buf.get_f64());
    }

    Ok(Command::Add { pool_id, values })
}

/// Decode QUERY command payload
fn decode_query_command(payload: &[u8]) -> Result<Command> {
    if payload.len() != 16 {
        return Err(PoolError::Protocol(format!(
            "QUERY command: expected 16 bytes, got {}",
            payload.len()
        )));
    }

    let mut buf = payload;
    let pool_id = PoolId::new(buf.get_u64())?;
    let percentile = Percentile::new(buf.get_f64())?;

    Ok(Command::Query { pool_id, percentile })
}

/// Decode DELETE command payload
fn decode_delete_command(payload: &[u8]) -> Result<Command> {
    if payload.len() != 8 {
        return Err(PoolError::Protocol(format!(
            "DELETE command: expected 8 bytes, got {}",
            payload.len()
        )));
    }

    let mut buf = payload;
    let pool_id = PoolId::new(buf.get_u64())?;

    Ok(Command::Delete { pool_id })
}

/// Decode PING command payload
fn decode_ping_command(payload: &[u8]) -> Result<Command> {
    if !payload.is_empty() {
        return Err(PoolError::Protocol(format!(
            "PING command: unexpected payload of {} bytes",
            payload.len()
        )));
    }
    Ok(Command::Ping)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response ")?;

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::InvalidInput,
        0x03 => Status::Error,
        _ => {
            return Err(PoolError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Framing helpers
// =============================================================================

fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(kind);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.to_vec()
}

/// Validate a complete frame and split it into (kind, payload)
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(PoolError::Protocol(format!(
            "Incomplete {}header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let kind = header.get_u8();
    let payload_len = header.get_u32() as usize;

    check_payload_len(payload_len, what)?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(PoolError::Protocol(format!(
            "Incomplete {}payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((kind, &bytes[HEADER_SIZE..total_len]))
}

fn check_payload_len(payload_len: usize, what: &str) -> Result<()> {
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(PoolError::Protocol(format!(
            "{}payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    check_payload_len(payload_len, what)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }

    Ok(message)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs. The whole
/// frame is consumed even when its fields fail validation.
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let message = read_frame(reader, "")?;
    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader, "response ")?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
