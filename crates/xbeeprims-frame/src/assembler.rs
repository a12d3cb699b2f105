//! Stream-oriented frame assembly.
//!
//! Bytes arrive in arbitrary chunks. The assembler appends them to a receive
//! buffer, splits the buffer on start delimiters and validates each
//! candidate. A candidate followed by another delimiter is final: it either
//! becomes a frame or is discarded. The last candidate may still be growing,
//! so it is kept when it merely looks incomplete (too short, dangling
//! escape, declared length not yet satisfied) and discarded only when it is
//! complete but wrong.

use bytes::{Buf, Bytes, BytesMut};
use tracing::debug;

use crate::api::{ESCAPE, ESCAPE_MASK, START_DELIMITER};
use crate::checksum;
use crate::codec::{AddressingMode, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::escape::unescape;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// A candidate that could not become a frame.
#[derive(Debug)]
pub struct Discard {
    /// The bytes as received, leading delimiter included when there was one.
    pub bytes: Bytes,
    /// Why the candidate was rejected.
    pub reason: FrameError,
}

/// Outcome of one candidate in an [`Assembler::ingest`] pass.
#[derive(Debug)]
pub enum Assembled {
    /// A validated frame.
    Frame(Frame),
    /// A candidate that was dropped.
    Discarded(Discard),
}

impl Assembled {
    /// The frame, if this outcome is one.
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Assembled::Frame(frame) => Some(frame),
            Assembled::Discarded(_) => None,
        }
    }
}

/// Validate the escaped bytes that followed one start delimiter.
///
/// Checks, in order: minimum length for `mode`, escaping, the big-endian
/// length field against the bytes present, and the checksum over the
/// declared span. Bytes after the checksum are ignored.
pub fn decode_candidate(candidate: &[u8], mode: AddressingMode) -> Result<Frame> {
    let min = mode.min_frame_len();
    if candidate.len() < min {
        return Err(FrameError::TooShort {
            len: candidate.len(),
            min,
        });
    }

    let unescaped = unescape(candidate)?;
    if unescaped.len() < 3 {
        return Err(FrameError::TooShort {
            len: unescaped.len(),
            min: 3,
        });
    }

    let declared = usize::from(u16::from_be_bytes([unescaped[0], unescaped[1]]));
    if declared == 0 {
        return Err(FrameError::InvalidFrame("zero length"));
    }

    // Length field and checksum are not part of the declared span.
    let available = unescaped.len() - 3;
    if declared > available {
        return Err(FrameError::MalformedLength {
            declared,
            available,
        });
    }

    let span = &unescaped[2..3 + declared];
    if !checksum::validate(span)? {
        return Err(FrameError::ChecksumMismatch {
            sum: checksum::residue(span),
        });
    }

    if available > declared {
        debug!(extra = available - declared, "ignoring bytes after checksum");
    }

    let mut content = unescaped.freeze();
    content.advance(2);
    content.truncate(declared);
    let frame_type = content.get_u8();

    Ok(Frame {
        frame_type,
        data: content,
    })
}

/// Read the big-endian length field at the start of an escaped candidate.
///
/// Looks at no more than four bytes. Returns `None` until both length bytes
/// have arrived.
pub fn declared_length(candidate: &[u8]) -> Option<usize> {
    let mut field = [0u8; 2];
    let mut bytes = candidate.iter();
    for slot in &mut field {
        let &byte = bytes.next()?;
        *slot = if byte == ESCAPE {
            *bytes.next()? ^ ESCAPE_MASK
        } else {
            byte
        };
    }
    Some(usize::from(u16::from_be_bytes(field)))
}

/// Turns a byte stream into frames.
///
/// Owns its receive buffer; not meant to be shared between threads.
#[derive(Debug)]
pub struct Assembler {
    buf: BytesMut,
    config: FrameConfig,
}

impl Assembler {
    /// Create an assembler for `mode` with default limits.
    pub fn new(mode: AddressingMode) -> Self {
        Self::with_config(FrameConfig::for_mode(mode))
    }

    /// Create an assembler with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Append `data` and return every candidate it completed, in stream order.
    pub fn ingest(&mut self, data: &[u8]) -> Vec<Assembled> {
        self.buf.extend_from_slice(data);

        let mut out = Vec::new();
        self.drop_unsynchronized(&mut out);

        while !self.buf.is_empty() {
            let next = self.buf[1..]
                .iter()
                .position(|&b| b == START_DELIMITER);

            let Some(pos) = next else {
                self.settle_tail(&mut out);
                break;
            };

            let segment = self.buf.split_to(pos + 1).freeze();
            out.push(match decode_candidate(&segment[1..], self.config.mode) {
                Ok(frame) => Assembled::Frame(frame),
                Err(reason) => Assembled::Discarded(Discard {
                    bytes: segment,
                    reason,
                }),
            });
        }

        out
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Drop any partially received frame.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Addressing mode used for validation.
    pub fn mode(&self) -> AddressingMode {
        self.config.mode
    }

    /// Current assembler configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    // Leaves the buffer empty or starting with a delimiter.
    fn drop_unsynchronized(&mut self, out: &mut Vec<Assembled>) {
        let junk = self
            .buf
            .iter()
            .position(|&b| b == START_DELIMITER)
            .unwrap_or(self.buf.len());
        if junk == 0 {
            return;
        }

        let bytes = self.buf.split_to(junk).freeze();
        out.push(Assembled::Discarded(Discard {
            reason: FrameError::Unsynchronized { len: bytes.len() },
            bytes,
        }));
    }

    fn settle_tail(&mut self, out: &mut Vec<Assembled>) {
        let candidate = &self.buf[1..];
        // Escaping never shrinks a span, so a raw tail shorter than length
        // field plus declared span plus checksum cannot be complete yet.
        let outcome = match declared_length(candidate) {
            Some(declared) if candidate.len() < declared + 3 => {
                Err(FrameError::MalformedLength {
                    declared,
                    available: candidate.len().saturating_sub(3),
                })
            }
            _ => decode_candidate(candidate, self.config.mode),
        };

        match outcome {
            Ok(frame) => {
                self.buf.clear();
                out.push(Assembled::Frame(frame));
            }
            Err(reason) if reason.is_incomplete() => {
                if self.buf.len() > self.config.max_pending {
                    let bytes = self.buf.split().freeze();
                    out.push(Assembled::Discarded(Discard {
                        reason: FrameError::FrameTooLarge {
                            size: bytes.len(),
                            max: self.config.max_pending,
                        },
                        bytes,
                    }));
                } else {
                    debug!(pending = self.buf.len(), %reason, "holding partial frame");
                }
            }
            Err(reason) => {
                let bytes = self.buf.split().freeze();
                out.push(Assembled::Discarded(Discard { bytes, reason }));
            }
        }
    }
}
