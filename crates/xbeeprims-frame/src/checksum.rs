//! Single-byte frame checksum.
//!
//! The checksum covers the frame content (type + body) only: neither the
//! start delimiter nor the two length bytes take part.

use crate::error::{FrameError, Result};

fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Compute the checksum byte for `content`.
pub fn compute(content: &[u8]) -> Result<u8> {
    if content.is_empty() {
        return Err(FrameError::InvalidFrame("checksum over empty content"));
    }
    Ok(0xFF - sum(content))
}

/// Check `content` followed by its checksum byte.
pub fn validate(content_with_checksum: &[u8]) -> Result<bool> {
    if content_with_checksum.is_empty() {
        return Err(FrameError::InvalidFrame("checksum over empty content"));
    }
    Ok(sum(content_with_checksum) == 0xFF)
}

/// Sum of `content_with_checksum` modulo 256; 0xFF for a valid frame.
pub(crate) fn residue(content_with_checksum: &[u8]) -> u8 {
    sum(content_with_checksum)
}
