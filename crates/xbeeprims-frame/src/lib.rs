//! XBee API-mode framing over byte streams.
//!
//! Every frame on the wire is:
//! - A `0x7E` start delimiter
//! - A 2-byte big-endian length covering the frame type and body
//! - The frame type, the body, then a 1-byte checksum
//!
//! Everything after the delimiter is escaped so that `0x7E`, `0x7D`, `0x11`
//! and `0x13` never appear raw. The [`Assembler`] turns arbitrarily chunked
//! input back into validated frames and reports what it had to throw away.

pub mod api;
pub mod assembler;
#[cfg(feature = "async")]
pub mod async_codec;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod escape;
pub mod packet;
pub mod reader;
pub mod writer;

pub use api::{frame_type_name, START_DELIMITER};
pub use assembler::{decode_candidate, declared_length, Assembled, Assembler, Discard};
#[cfg(feature = "async")]
pub use async_codec::XBeeCodec;
pub use codec::{
    encode_frame, AddressingMode, Frame, FrameConfig, HexBytes, TransmitRequest, FRAME_OVERHEAD,
    MAX_WIRE_FRAME,
};
pub use error::{FrameError, Result};
pub use packet::{ApiFrame, ReceivePacket, SourceAddress, TransmitStatus};
pub use reader::FrameReader;
pub use writer::FrameWriter;
