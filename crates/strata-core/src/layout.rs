//! Byte layout of strata buffers.
//!
//! ## Layout Overview
//!
//! ```text
//! Buffer := [Header][Data]
//! Header := [type id: i32 LE] * field_count
//! Data   := [Frame] * written_fields [zero fill up to capacity]
//! Frame  := [payload length: u32 LE] [payload bytes]
//! ```
//!
//! Frames appear in descriptor order. Every built-in payload is at least one
//! byte long, so a zero length prefix marks the end of the written frames.

use crate::error::{Error, Result};
use crate::registry::CodecId;
use bytes::{Buf, BufMut, BytesMut};
use std::ops::Range;

/// Width of one header entry
pub const ID_WIDTH: usize = 4;

/// Width of a frame's length prefix
pub const LENGTH_PREFIX: usize = 4;

/// Byte length of a header for `field_count` fields
pub fn header_len(field_count: usize) -> usize {
    field_count * ID_WIDTH
}

/// Encode type IDs as a header
pub fn encode_header(ids: &[CodecId]) -> BytesMut {
    let mut header = BytesMut::with_capacity(header_len(ids.len()));
    for &id in ids {
        header.put_i32_le(id);
    }
    header
}

/// Decode the first `field_count` type IDs of `data`
pub fn decode_header(data: &[u8], field_count: usize) -> Result<Vec<CodecId>> {
    let len = header_len(field_count);
    if data.len() < len {
        return Err(Error::truncated(len, data.len()));
    }

    let mut buf = &data[..len];
    let mut ids = Vec::with_capacity(field_count);
    while buf.has_remaining() {
        ids.push(buf.get_i32_le());
    }
    Ok(ids)
}

/// Concatenate two byte sequences without reordering or truncating either
pub fn concat(head: &[u8], tail: &[u8]) -> BytesMut {
    let mut out = BytesMut::with_capacity(head.len() + tail.len());
    out.put_slice(head);
    out.put_slice(tail);
    out
}

/// Total frame size for a payload of `payload_len` bytes
pub fn frame_len(payload_len: usize) -> usize {
    LENGTH_PREFIX + payload_len
}

/// Write a frame at `at` and return the frame's range.
///
/// The caller guarantees the frame fits in `region`.
pub fn write_frame(region: &mut [u8], at: usize, payload: &[u8]) -> Range<usize> {
    let end = at + frame_len(payload.len());
    let mut dst = &mut region[at..end];
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    at..end
}

/// Payload range of the frame starting at `at`.
///
/// Returns `None` for a zero length prefix or when fewer than
/// [`LENGTH_PREFIX`] bytes remain.
pub fn read_frame(region: &[u8], at: usize) -> Result<Option<Range<usize>>> {
    let Some(mut prefix) = region.get(at..at + LENGTH_PREFIX) else {
        return Ok(None);
    };

    let len = prefix.get_u32_le() as usize;
    if len == 0 {
        return Ok(None);
    }

    let start = at + LENGTH_PREFIX;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= region.len())
        .ok_or_else(|| {
            Error::invalid_data(
                at,
                format!(
                    "frame length {} runs past the data region ({} bytes)",
                    len,
                    region.len()
                ),
            )
        })?;
    Ok(Some(start..end))
}

/// Locate up to `max_frames` consecutive frames from the start of `region`.
///
/// Returns the full range (prefix included) of each frame found.
pub fn scan_frames(region: &[u8], max_frames: usize) -> Result<Vec<Range<usize>>> {
    let mut frames = Vec::new();
    let mut position = 0;

    while frames.len() < max_frames {
        match read_frame(region, position)? {
            Some(payload) => {
                let frame = position..payload.end;
                position = payload.end;
                frames.push(frame);
            }
            None => break,
        }
    }

    Ok(frames)
}
