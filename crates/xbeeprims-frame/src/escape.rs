//! Reserved-byte escaping.
//!
//! Every byte after the start delimiter that collides with a reserved value
//! is replaced by `ESCAPE, byte ^ ESCAPE_MASK`. The delimiter itself is never
//! escaped, so a literal 0x7E on the wire always starts a frame.

use bytes::{BufMut, BytesMut};

use crate::api::{is_reserved, ESCAPE, ESCAPE_MASK};
use crate::error::{FrameError, Result};

/// Number of bytes `frame` occupies once escaped.
pub fn escaped_len(frame: &[u8]) -> usize {
    match frame.split_first() {
        Some((_, rest)) => 1 + rest.len() + rest.iter().filter(|&&b| is_reserved(b)).count(),
        None => 0,
    }
}

/// Escape a complete frame (starting with its delimiter) into `dst`.
///
/// Byte 0 is copied verbatim; every later reserved byte becomes an escape pair.
pub fn escape(frame: &[u8], dst: &mut BytesMut) {
    let Some((&first, rest)) = frame.split_first() else {
        return;
    };

    dst.reserve(escaped_len(frame));
    dst.put_u8(first);
    for &byte in rest {
        if is_reserved(byte) {
            dst.put_u8(ESCAPE);
            dst.put_u8(byte ^ ESCAPE_MASK);
        } else {
            dst.put_u8(byte);
        }
    }
}

/// Undo escaping on the bytes that followed a start delimiter.
///
/// Fails with [`FrameError::TruncatedEscape`] when the input ends in the
/// middle of an escape pair; callers treat that as "wait for more data".
pub fn unescape(src: &[u8]) -> Result<BytesMut> {
    let mut out = BytesMut::with_capacity(src.len());
    let mut bytes = src.iter();
    while let Some(&byte) = bytes.next() {
        if byte == ESCAPE {
            let &next = bytes.next().ok_or(FrameError::TruncatedEscape)?;
            out.put_u8(next ^ ESCAPE_MASK);
        } else {
            out.put_u8(byte);
        }
    }
    Ok(out)
}
