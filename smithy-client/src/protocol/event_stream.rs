//! Event stream payload framing.
//!
//! A streaming union payload is carried as a sequence of frames:
//!
//! ```text
//! [flags:1][length:4][payload:length]
//! ```
//!
//! Each message frame holds one codec-encoded union value. An end-of-stream
//! frame with an empty payload terminates the sequence.

use bytes::Bytes;
use smithy_client_core::{BoxedCodec, Document, Schema};

use crate::error::ClientError;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "application/vnd.amazon.eventstream";

/// Frame flags.
pub mod frame_flags {
    /// A single event.
    pub const MESSAGE: u8 = 0x00;
    /// End of stream.
    pub const END_STREAM: u8 = 0x02;
}

/// Frame header size (flags + length).
pub const FRAME_HEADER_SIZE: usize = 5;

/// Wrap a payload in a frame.
pub fn wrap_frame(payload: &[u8], flags: u8) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.push(flags);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Parse a frame header. Returns `(flags, length)`.
pub fn parse_frame_header(data: &[u8]) -> Result<(u8, u32), ClientError> {
    if data.len() < FRAME_HEADER_SIZE {
        return Err(ClientError::deserialization(format!(
            "incomplete event stream frame header: expected {} bytes, got {}",
            FRAME_HEADER_SIZE,
            data.len()
        )));
    }
    let flags = data[0];
    let length = u32::from_be_bytes([data[1], data[2], data[3], data[4]]);
    Ok((flags, length))
}

/// Encode union events followed by an end-of-stream frame.
pub fn encode_events(
    codec: &BoxedCodec,
    union: &Schema,
    events: &[Document],
) -> Result<Bytes, ClientError> {
    let mut body = Vec::new();
    for event in events {
        let payload = codec.serialize(union, event)?;
        body.extend_from_slice(&wrap_frame(&payload, frame_flags::MESSAGE));
    }
    body.extend_from_slice(&wrap_frame(&[], frame_flags::END_STREAM));
    Ok(Bytes::from(body))
}

/// Decode union events up to the end-of-stream frame or the end of input.
pub fn decode_events(
    codec: &BoxedCodec,
    union: &Schema,
    body: &[u8],
) -> Result<Vec<Document>, ClientError> {
    let mut events = Vec::new();
    let mut rest = body;
    while !rest.is_empty() {
        let (flags, length) = parse_frame_header(rest)?;
        let end = FRAME_HEADER_SIZE + length as usize;
        if rest.len() < end {
            return Err(ClientError::deserialization(format!(
                "truncated event stream frame: expected {} payload bytes, got {}",
                length,
                rest.len() - FRAME_HEADER_SIZE
            )));
        }
        match flags {
            frame_flags::END_STREAM => break,
            frame_flags::MESSAGE => {
                events.push(codec.deserialize(union, &rest[FRAME_HEADER_SIZE..end])?);
            }
            other => {
                return Err(ClientError::deserialization(format!(
                    "invalid event stream frame flags: 0x{other:02x}"
                )));
            }
        }
        rest = &rest[end..];
    }
    Ok(events)
}
