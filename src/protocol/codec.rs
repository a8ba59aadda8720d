//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! All integers are 4-byte big-endian, signed 32-bit on the wire and
//! treated as non-negative lengths.
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - LOGIN:       JSON object `{"u": user, "p": password}`
//! - IMAGE:       count (4) + repeated [len (4) + bytes]
//! - VIDEO:       raw file bytes
//! - GET_BY_HASH: UTF-8 hash string
//!
//! ### Response Format
//! ```text
//! LOGIN / GET_BY_HASH:
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │           Data              │
//! └──────────┴─────────────────────────────┘
//!
//! IMAGE / VIDEO:
//! ┌────────────┬──────────┬────────────┬──────────┐
//! │NameLen (4) │   Name   │ DataLen (4)│   Data   │
//! └────────────┴──────────┴────────────┴──────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use bytes::{Buf, BufMut};

use super::{
    CommandType, Credentials, LoginResult, Request, Response, ResponseShape, PLACEHOLDER_NAME,
};
use crate::error::{Result, TwinError};

/// Request header size: 1 byte command + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Size of every length prefix
pub const LENGTH_SIZE: usize = 4;

/// Largest filename length accepted in an IMAGE/VIDEO response
pub const MAX_NAME_LEN: usize = 1024;

/// GET_BY_HASH bodies shorter than this are checked for an error sentinel
pub const ERROR_SENTINEL_THRESHOLD: usize = 1024;

/// Prefix marking an application-level error body
pub const ERROR_PREFIX: &str = "ERROR_";

/// Upper bound on the initial allocation for a length-prefixed read
const READ_CAPACITY_HINT: usize = 64 * 1024;

// =============================================================================
// Length Prefixes
// =============================================================================

/// Encode a length as a 4-byte big-endian prefix
///
/// Fails if the length does not fit the signed 32-bit wire range.
pub fn encode_length(len: usize) -> Result<[u8; LENGTH_SIZE]> {
    let len = i32::try_from(len).map_err(|_| {
        TwinError::FramingViolation(format!(
            "Length {} exceeds the 32-bit wire limit",
            len
        ))
    })?;
    Ok(len.to_be_bytes())
}

/// Read a 4-byte big-endian length, rejecting negative values
pub fn read_length<R: Read>(reader: &mut R, what: &str) -> Result<usize> {
    let bytes = read_exact_bytes(reader, LENGTH_SIZE)?;
    let value = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if value < 0 {
        return Err(TwinError::FramingViolation(format!(
            "Invalid {} length: {}",
            what, value
        )));
    }
    Ok(value as usize)
}

/// Read exactly `len` bytes, blocking until they arrive
///
/// A stream that ends early yields `ShortRead`; any other socket failure
/// yields `Connection`.
pub fn read_exact_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(READ_CAPACITY_HINT));
    let received = reader
        .by_ref()
        .take(len as u64)
        .read_to_end(&mut buf)
        .map_err(|e| TwinError::from_transport("read failed", e))?;

    if received < len {
        return Err(TwinError::ShortRead {
            expected: len,
            received,
        });
    }
    Ok(buf)
}

/// Write a length-prefixed frame
pub fn write_frame<W: Write>(writer: &mut W, data: &[u8]) -> Result<()> {
    let prefix = encode_length(data.len())?;
    write_all(writer, &prefix)?;
    write_all(writer, data)
}

/// Read a length-prefixed frame
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_length(reader, "data")?;
    read_exact_bytes(reader, len)
}

fn write_all<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    writer
        .write_all(bytes)
        .map_err(|e| TwinError::from_transport("write failed", e))
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode the 5-byte request header: cmd_type (1) + payload_len (4)
pub fn encode_request_header(request: &Request) -> Result<[u8; HEADER_SIZE]> {
    let prefix = encode_length(request.payload.len())?;
    let mut header = [0u8; HEADER_SIZE];
    header[0] = request.command.tag();
    header[1..].copy_from_slice(&prefix);
    Ok(header)
}

/// Encode a request to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    let header = encode_request_header(request)?;

    let mut message = Vec::with_capacity(HEADER_SIZE + request.payload.len());
    message.put_slice(&header);
    message.put_slice(&request.payload);
    Ok(message)
}

/// Write a request to a stream
///
/// The payload is written straight from the request buffer.
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let header = encode_request_header(request)?;
    write_all(writer, &header)?;
    write_all(writer, &request.payload)?;
    writer
        .flush()
        .map_err(|e| TwinError::from_transport("flush failed", e))?;

    tracing::trace!(
        command = request.command.name(),
        payload_len = request.payload.len(),
        "request written"
    );
    Ok(())
}

/// Read a complete request from a stream
///
/// Returns `Ok(None)` when the peer closed the connection before sending
/// another header byte.
pub fn read_request<R: Read>(reader: &mut R, max_payload: usize) -> Result<Option<Request>> {
    let mut tag = [0u8; 1];
    loop {
        match reader.read(&mut tag) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TwinError::from_transport("read failed", e)),
        }
    }

    let command = CommandType::from_tag(tag[0])?;
    let payload_len = read_length(reader, "request body")?;

    if payload_len > max_payload {
        return Err(TwinError::FramingViolation(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, max_payload
        )));
    }

    let payload = read_exact_bytes(reader, payload_len)?;
    Ok(Some(Request::new(command, payload)))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Read a complete response framed per `shape`
pub fn read_response<R: Read>(reader: &mut R, shape: ResponseShape) -> Result<Response> {
    match shape {
        ResponseShape::Data => {
            let data = read_frame(reader)?;
            Ok(Response::data(data))
        }
        ResponseShape::NamedData => {
            let name_len = read_length(reader, "filename")?;
            if name_len > MAX_NAME_LEN {
                return Err(TwinError::FramingViolation(format!(
                    "Invalid filename length: {} (max {})",
                    name_len, MAX_NAME_LEN
                )));
            }

            let filename = if name_len > 0 {
                let name_bytes = read_exact_bytes(reader, name_len)?;
                Some(String::from_utf8_lossy(&name_bytes).into_owned())
            } else {
                None
            };

            let data = read_frame(reader)?;
            Ok(Response { filename, data })
        }
    }
}

/// Encode a response to bytes, framed per `shape`
///
/// A named response without a filename is sent with the placeholder name.
pub fn encode_response(shape: ResponseShape, response: &Response) -> Result<Vec<u8>> {
    let mut message = encode_response_header(shape, response)?;
    message.reserve(response.data.len());
    message.put_slice(&response.data);
    Ok(message)
}

/// Everything in a response before the data bytes
fn encode_response_header(shape: ResponseShape, response: &Response) -> Result<Vec<u8>> {
    let mut message = Vec::with_capacity(2 * LENGTH_SIZE);

    if shape == ResponseShape::NamedData {
        let name = match response.filename.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => PLACEHOLDER_NAME,
        };
        if name.len() > MAX_NAME_LEN {
            return Err(TwinError::FramingViolation(format!(
                "Filename too long: {} bytes (max {})",
                name.len(),
                MAX_NAME_LEN
            )));
        }
        message.put_slice(&encode_length(name.len())?);
        message.put_slice(name.as_bytes());
    }

    message.put_slice(&encode_length(response.data.len())?);
    Ok(message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(
    writer: &mut W,
    shape: ResponseShape,
    response: &Response,
) -> Result<()> {
    let header = encode_response_header(shape, response)?;
    write_all(writer, &header)?;
    write_all(writer, &response.data)?;
    writer
        .flush()
        .map_err(|e| TwinError::from_transport("flush failed", e))
}

// =============================================================================
// Payload Bodies
// =============================================================================

/// Encode LOGIN credentials as `{"u": ..., "p": ...}`
pub fn encode_credentials(credentials: &Credentials) -> Result<Vec<u8>> {
    serde_json::to_vec(credentials)
        .map_err(|e| TwinError::Decode(format!("failed to encode credentials: {}", e)))
}

/// Decode a LOGIN request body
pub fn decode_credentials(payload: &[u8]) -> Result<Credentials> {
    serde_json::from_slice(payload)
        .map_err(|e| TwinError::Decode(format!("invalid credentials body: {}", e)))
}

/// Encode a LOGIN result as `[authenticated, server_reachable]`
pub fn encode_login_result(result: LoginResult) -> Vec<u8> {
    // Two booleans always serialize
    serde_json::to_vec(&[result.authenticated, result.server_reachable]).unwrap_or_default()
}

/// Decode a LOGIN response body, which must be exactly two booleans
pub fn decode_login_result(data: &[u8]) -> Result<LoginResult> {
    let flags: Vec<bool> = serde_json::from_slice(data)
        .map_err(|e| TwinError::Decode(format!("invalid login response: {}", e)))?;

    match flags.as_slice() {
        [authenticated, server_reachable] => Ok(LoginResult {
            authenticated: *authenticated,
            server_reachable: *server_reachable,
        }),
        other => Err(TwinError::Decode(format!(
            "login response must hold 2 booleans, got {}",
            other.len()
        ))),
    }
}

/// Encode an IMAGE batch: count (4) + repeated [len (4) + bytes], in order
pub fn encode_image_batch<B: AsRef<[u8]>>(images: &[B]) -> Result<Vec<u8>> {
    let total: usize = images
        .iter()
        .map(|image| LENGTH_SIZE + image.as_ref().len())
        .sum();

    let mut payload = Vec::with_capacity(LENGTH_SIZE + total);
    payload.put_slice(&encode_length(images.len())?);
    for image in images {
        let image = image.as_ref();
        payload.put_slice(&encode_length(image.len())?);
        payload.put_slice(image);
    }

    Ok(payload)
}

/// Decode an IMAGE batch back into its images
pub fn decode_image_batch(payload: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut buf = payload;

    let count = take_length(&mut buf, "image count")?;
    // Each image needs at least its own length prefix
    if count > buf.remaining() / LENGTH_SIZE {
        return Err(TwinError::FramingViolation(format!(
            "Image count {} exceeds payload of {} bytes",
            count,
            payload.len()
        )));
    }

    let mut images = Vec::with_capacity(count);
    for index in 0..count {
        let len = take_length(&mut buf, "image")?;
        if buf.remaining() < len {
            return Err(TwinError::FramingViolation(format!(
                "Image {}: incomplete data (expected {}, got {})",
                index,
                len,
                buf.remaining()
            )));
        }
        images.push(buf[..len].to_vec());
        buf.advance(len);
    }

    Ok(images)
}

fn take_length(buf: &mut &[u8], what: &str) -> Result<usize> {
    if buf.remaining() < LENGTH_SIZE {
        return Err(TwinError::FramingViolation(format!(
            "Missing {} length",
            what
        )));
    }
    let value = buf.get_i32();
    if value < 0 {
        return Err(TwinError::FramingViolation(format!(
            "Invalid {} length: {}",
            what, value
        )));
    }
    Ok(value as usize)
}

/// Return the error text if a GET_BY_HASH body is an `ERROR_*` sentinel
///
/// Only bodies strictly shorter than [`ERROR_SENTINEL_THRESHOLD`] are
/// inspected; anything larger is always data.
pub fn error_sentinel(data: &[u8]) -> Option<String> {
    if data.len() >= ERROR_SENTINEL_THRESHOLD {
        return None;
    }
    let text = String::from_utf8_lossy(data);
    if text.starts_with(ERROR_PREFIX) {
        Some(text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace()).to_string())
    } else {
        None
    }
}
