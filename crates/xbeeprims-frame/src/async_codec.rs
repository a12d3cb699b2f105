//! `tokio_util::codec` adapter over the stream assembler.

use std::collections::VecDeque;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::assembler::{Assembled, Assembler};
use crate::codec::{encode_frame, AddressingMode, Frame, FrameConfig, HexBytes, TransmitRequest};
use crate::error::FrameError;

/// Decodes inbound frames and encodes transmit requests for async streams.
///
/// Decoding drains the whole read buffer into an [`Assembler`], so discarded
/// candidates never surface as stream errors.
#[derive(Debug)]
pub struct XBeeCodec {
    assembler: Assembler,
    ready: VecDeque<Frame>,
}

impl XBeeCodec {
    #[must_use]
    pub fn new(mode: AddressingMode) -> Self {
        Self::with_config(FrameConfig::for_mode(mode))
    }

    #[must_use]
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            assembler: Assembler::with_config(config),
            ready: VecDeque::new(),
        }
    }

    pub fn mode(&self) -> AddressingMode {
        self.assembler.mode()
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> &[u8] {
        self.assembler.pending()
    }
}

impl Default for XBeeCodec {
    fn default() -> Self {
        Self::new(AddressingMode::default())
    }
}

impl Decoder for XBeeCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.ready.is_empty() && !src.is_empty() {
            let chunk = src.split();
            for item in self.assembler.ingest(&chunk) {
                match item {
                    Assembled::Frame(frame) => self.ready.push_back(frame),
                    Assembled::Discarded(discard) => warn!(
                        reason = %discard.reason,
                        bytes = %HexBytes(&discard.bytes),
                        "discarded candidate"
                    ),
                }
            }
        }
        Ok(self.ready.pop_front())
    }
}

impl Encoder<TransmitRequest> for XBeeCodec {
    type Error = FrameError;

    fn encode(&mut self, item: TransmitRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = self.mode().transmit_frame(&item)?;
        encode_frame(&frame, dst)
    }
}

impl Encoder<Frame> for XBeeCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, dst)
    }
}
