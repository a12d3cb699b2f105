use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::api::{
    BROADCAST_16, BROADCAST_64, MAX_CONTENT_LEN, OPTION_DISABLE_ACK, START_DELIMITER,
    TRANSMIT_REQUEST, TX_REQUEST_16, UNKNOWN_ADDRESS_16,
};
use crate::checksum;
use crate::error::{FrameError, Result};
use crate::escape::escape;

/// Delimiter (1) + length (2) + checksum (1).
pub const FRAME_OVERHEAD: usize = 4;

/// Largest escaped wire frame: every byte after the delimiter doubled.
pub const MAX_WIRE_FRAME: usize = 1 + 2 * (MAX_CONTENT_LEN + 3);

/// One API frame, unescaped, without delimiter, length or checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The API frame type identifier.
    pub frame_type: u8,
    /// Everything after the frame type, up to the checksum.
    pub data: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(frame_type: u8, data: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            data: data.into(),
        }
    }

    /// Length of type + data, as carried in the length field.
    pub fn content_len(&self) -> usize {
        1 + self.data.len()
    }

    /// The checksum byte this frame carries on the wire.
    pub fn checksum(&self) -> u8 {
        let sum = self
            .data
            .iter()
            .fold(self.frame_type, |acc, &b| acc.wrapping_add(b));
        0xFF - sum
    }

    /// The unescaped frame: delimiter, length, content and checksum.
    pub fn to_unescaped(&self) -> Result<BytesMut> {
        let len = self.content_len();
        if len > MAX_CONTENT_LEN {
            return Err(FrameError::FrameTooLarge {
                size: len,
                max: MAX_CONTENT_LEN,
            });
        }

        let mut raw = BytesMut::with_capacity(len + FRAME_OVERHEAD);
        raw.put_u8(START_DELIMITER);
        raw.put_u16(len as u16);
        raw.put_u8(self.frame_type);
        raw.put_slice(&self.data);
        let checksum = checksum::compute(&raw[3..])?;
        raw.put_u8(checksum);
        Ok(raw)
    }
}

/// Encode a frame into its escaped wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬─────────────┬──────┬──────────────┬──────────┐
/// │ 0x7E │ Length (2B) │ Type │ Data         │ Checksum │
/// │      │ big endian  │ (1B) │ (Length - 1) │ (1B)     │
/// └──────┴─────────────┴──────┴──────────────┴──────────┘
/// ```
/// Every byte after the delimiter is escaped if it is reserved.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let raw = frame.to_unescaped()?;
    escape(&raw, dst);
    Ok(())
}

/// Addressing scheme of the attached module generation.
///
/// Decides the transmit frame layout, the default broadcast address and the
/// smallest inbound frame worth validating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressingMode {
    /// Series 1 firmware: 16-bit short addresses.
    #[default]
    Short16,
    /// Series 2 firmware: 64-bit extended plus 16-bit network addresses.
    Extended64,
}

impl AddressingMode {
    /// Minimum inbound candidate length, counted from the byte after the
    /// delimiter up to and including the checksum.
    ///
    /// Short16: length (2), type, source (2), RSSI, options, 1 data byte, checksum.
    /// Extended64: length (2), type, source (8 + 2), options, 1 data byte, checksum.
    ///
    /// Transmit status frames (0x89 at 6 bytes, 0x8B at 10) are below both
    /// minimums, so a stream assembler never delivers them. Parse them with
    /// [`crate::TransmitStatus`] when they arrive by other means.
    pub const fn min_frame_len(self) -> usize {
        match self {
            AddressingMode::Short16 => 9,
            AddressingMode::Extended64 => 16,
        }
    }

    /// Destination used when a request names none.
    pub const fn broadcast_address(self) -> u16 {
        match self {
            AddressingMode::Short16 => BROADCAST_16,
            AddressingMode::Extended64 => UNKNOWN_ADDRESS_16,
        }
    }

    /// Transmit frame type for this generation.
    pub const fn transmit_frame_type(self) -> u8 {
        match self {
            AddressingMode::Short16 => TX_REQUEST_16,
            AddressingMode::Extended64 => TRANSMIT_REQUEST,
        }
    }

    /// Content bytes a transmit frame spends before the payload.
    pub const fn transmit_overhead(self) -> usize {
        match self {
            // type, frame id, address (2), options
            AddressingMode::Short16 => 5,
            // type, frame id, address (8 + 2), radius, options
            AddressingMode::Extended64 => 14,
        }
    }

    /// Largest payload a single transmit frame can carry.
    pub const fn max_payload(self) -> usize {
        MAX_CONTENT_LEN - self.transmit_overhead()
    }

    /// Short name used in logs and on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            AddressingMode::Short16 => "short",
            AddressingMode::Extended64 => "extended",
        }
    }

    /// Build the transmit frame for `request`.
    pub fn transmit_frame(self, request: &TransmitRequest) -> Result<Frame> {
        if request.payload.is_empty() {
            return Err(FrameError::EmptyPayload);
        }
        if request.payload.len() > self.max_payload() {
            return Err(FrameError::FrameTooLarge {
                size: request.payload.len(),
                max: self.max_payload(),
            });
        }

        let address = request.address.unwrap_or(self.broadcast_address());
        let mut data = BytesMut::with_capacity(self.transmit_overhead() + request.payload.len());
        data.put_u8(request.frame_id);
        match self {
            AddressingMode::Short16 => {
                data.put_u16(address);
                data.put_u8(request.options);
            }
            AddressingMode::Extended64 => {
                data.put_u64(request.destination64);
                data.put_u16(address);
                data.put_u8(request.broadcast_radius);
                data.put_u8(request.options);
            }
        }
        data.put_slice(&request.payload);

        Ok(Frame::new(self.transmit_frame_type(), data.freeze()))
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An outbound payload with its addressing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitRequest {
    /// RF data to send. Must not be empty.
    pub payload: Bytes,
    /// 16-bit destination; `None` broadcasts.
    pub address: Option<u16>,
    /// Transmit options. Default: disable acknowledgement.
    pub options: u8,
    /// Frame id; zero suppresses the transmit status frame.
    pub frame_id: u8,
    /// 64-bit destination (extended addressing only).
    pub destination64: u64,
    /// Maximum hops (extended addressing only); zero means network maximum.
    pub broadcast_radius: u8,
}

impl TransmitRequest {
    /// Create a broadcast request with default options.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            address: None,
            options: OPTION_DISABLE_ACK,
            frame_id: 0,
            destination64: BROADCAST_64,
            broadcast_radius: 0,
        }
    }

    /// Create a request carrying UTF-8 text.
    pub fn text(text: &str) -> Self {
        Self::new(Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Send to a specific 16-bit address.
    pub fn to(mut self, address: u16) -> Self {
        self.address = Some(address);
        self
    }

    /// Override transmit options.
    pub fn with_options(mut self, options: u8) -> Self {
        self.options = options;
        self
    }

    /// Request a transmit status frame tagged with `frame_id`.
    pub fn with_frame_id(mut self, frame_id: u8) -> Self {
        self.frame_id = frame_id;
        self
    }

    /// Override the 64-bit destination.
    pub fn with_destination64(mut self, destination64: u64) -> Self {
        self.destination64 = destination64;
        self
    }

    /// Override the broadcast radius.
    pub fn with_broadcast_radius(mut self, radius: u8) -> Self {
        self.broadcast_radius = radius;
        self
    }
}

/// Configuration for frame assembly.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Addressing mode of the attached module. Default: short.
    pub mode: AddressingMode,
    /// Largest provisional tail kept while waiting for more bytes.
    pub max_pending: usize,
}

impl FrameConfig {
    /// Default configuration for `mode`.
    pub fn for_mode(mode: AddressingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            mode: AddressingMode::default(),
            max_pending: MAX_WIRE_FRAME,
        }
    }
}

/// Displays bytes as space separated lowercase hex (`7e 00 10 ...`).
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{RX_PACKET_16, TX_STATUS};

    fn wire(mode: AddressingMode, request: &TransmitRequest) -> Vec<u8> {
        let frame = mode.transmit_frame(request).unwrap();
        let mut buf = BytesMut::new();
        encode_frame(&frame, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn short_transmit_hello_world() {
        let request = TransmitRequest::text("Hello World").to(0x0001);
        let mut expected = vec![0x7E, 0x00, 0x10, 0x01, 0x00, 0x00, 0x01, 0x01];
        expected.extend_from_slice(b"Hello World");
        expected.push(0xE0);

        assert_eq!(wire(AddressingMode::Short16, &request), expected);
    }

    #[test]
    fn short_transmit_escapes_reserved_payload_bytes() {
        let payload = [
            0x7E, 0x7D, 0x11, 0x13, 0x5B, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
        ];
        let request = TransmitRequest::new(payload.to_vec());

        // length 0x11 and checksum 0x7E collide with reserved values too
        let expected = vec![
            0x7E, 0x00, 0x7D, 0x31, 0x01, 0x00, 0xFF, 0xFF, 0x01, 0x7D, 0x5E, 0x7D, 0x5D, 0x7D,
            0x31, 0x7D, 0x33, 0x5B, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x7D, 0x5E,
        ];
        assert_eq!(wire(AddressingMode::Short16, &request), expected);
    }

    #[test]
    fn extended_transmit_layout() {
        let request = TransmitRequest::text("Hi");
        let expected = vec![
            0x7E, 0x00, 0x10, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF,
            0xFE, 0x00, 0x01, 0x48, 0x69, 0x42,
        ];
        assert_eq!(wire(AddressingMode::Extended64, &request), expected);
    }

    #[test]
    fn extended_transmit_with_explicit_destination() {
        let request = TransmitRequest::text("x")
            .to(0x1234)
            .with_destination64(0x0013_A200_4000_0001)
            .with_broadcast_radius(3)
            .with_options(0x00)
            .with_frame_id(0x52);
        let frame = AddressingMode::Extended64.transmit_frame(&request).unwrap();

        assert_eq!(frame.frame_type, TRANSMIT_REQUEST);
        assert_eq!(
            frame.data.as_ref(),
            &[0x52, 0x00, 0x13, 0xA2, 0x00, 0x40, 0x00, 0x00, 0x01, 0x12, 0x34, 0x03, 0x00, b'x']
        );
        assert_eq!(frame.content_len(), 1 + 14);
    }

    #[test]
    fn empty_payload_is_rejected() {
        for mode in [AddressingMode::Short16, AddressingMode::Extended64] {
            let err = mode.transmit_frame(&TransmitRequest::new(Bytes::new())).unwrap_err();
            assert!(matches!(err, FrameError::EmptyPayload));
        }
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mode = AddressingMode::Short16;
        let request = TransmitRequest::new(vec![0u8; mode.max_payload() + 1]);
        let err = mode.transmit_frame(&request).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size, max } if size == max + 1));

        let request = TransmitRequest::new(vec![0u8; mode.max_payload()]);
        assert_eq!(mode.transmit_frame(&request).unwrap().content_len(), MAX_CONTENT_LEN);
    }

    #[test]
    fn oversized_raw_frame_is_rejected() {
        let frame = Frame::new(0x01, vec![0u8; MAX_CONTENT_LEN]);
        let mut buf = BytesMut::new();
        let err = encode_frame(&frame, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn frame_checksum_matches_encoded_trailer() {
        let frame = Frame::new(RX_PACKET_16, b"\xFF\xFF\x4C\x00Hello World".to_vec());
        assert_eq!(frame.checksum(), 0x18);

        let raw = frame.to_unescaped().unwrap();
        assert_eq!(raw[raw.len() - 1], 0x18);
        assert_eq!(&raw[..3], &[0x7E, 0x00, 0x10]);
    }

    #[test]
    fn encodes_non_transmit_frames() {
        let frame = Frame::new(TX_STATUS, vec![0x01, 0x00]);
        let mut buf = BytesMut::new();
        encode_frame(&frame, &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0x7E, 0x00, 0x03, 0x89, 0x01, 0x00, 0x75]);
    }

    #[test]
    fn mode_defaults() {
        assert_eq!(AddressingMode::default(), AddressingMode::Short16);
        assert_eq!(AddressingMode::Short16.broadcast_address(), 0xFFFF);
        assert_eq!(AddressingMode::Extended64.broadcast_address(), 0xFFFE);
        assert_eq!(AddressingMode::Short16.min_frame_len(), 9);
        assert_eq!(AddressingMode::Extended64.min_frame_len(), 16);
        assert_eq!(AddressingMode::Extended64.to_string(), "extended");
    }

    #[test]
    fn hex_rendering() {
        assert_eq!(HexBytes(&[0x7E, 0x00, 0x0A]).to_string(), "7e 00 0a");
        assert_eq!(HexBytes(&[]).to_string(), "");
    }
}
