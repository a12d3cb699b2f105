//! API-mode byte values and frame type identifiers.
//!
//! Frame types below 0x80 travel host to module; 0x80 and above are
//! notifications from the module.

/// Marks the start of every frame on the wire.
pub const START_DELIMITER: u8 = 0x7E;

/// Introduces an escape pair.
pub const ESCAPE: u8 = 0x7D;

/// Software flow control: resume.
pub const XON: u8 = 0x11;

/// Software flow control: pause.
pub const XOFF: u8 = 0x13;

/// Escaped bytes are XORed with this mask.
pub const ESCAPE_MASK: u8 = 0x20;

/// Bytes that never appear literally after the start delimiter.
pub const RESERVED: [u8; 4] = [START_DELIMITER, ESCAPE, XON, XOFF];

/// TX request, 16-bit destination (series 1).
pub const TX_REQUEST_16: u8 = 0x01;

/// Transmit request, 64-bit + 16-bit destination (series 2).
pub const TRANSMIT_REQUEST: u8 = 0x10;

/// RX packet, 64-bit source (series 1).
pub const RX_PACKET_64: u8 = 0x80;

/// RX packet, 16-bit source (series 1).
pub const RX_PACKET_16: u8 = 0x81;

/// TX status (series 1).
pub const TX_STATUS: u8 = 0x89;

/// Transmit status (series 2).
pub const TRANSMIT_STATUS: u8 = 0x8B;

/// Receive packet (series 2).
pub const RECEIVE_PACKET: u8 = 0x90;

/// 16-bit broadcast address for series 1 modules.
pub const BROADCAST_16: u16 = 0xFFFF;

/// 16-bit "address unknown / broadcast" value for series 2 modules.
pub const UNKNOWN_ADDRESS_16: u16 = 0xFFFE;

/// 64-bit broadcast address.
pub const BROADCAST_64: u64 = 0x0000_0000_0000_FFFF;

/// Transmit option: disable acknowledgement.
pub const OPTION_DISABLE_ACK: u8 = 0x01;

/// Receive option: the packet was sent to the broadcast address.
pub const OPTION_BROADCAST: u8 = 0x02;

/// Largest frame content (type + body) the length field can describe.
pub const MAX_CONTENT_LEN: usize = u16::MAX as usize;

/// Returns true if `byte` must be escaped when it follows the start delimiter.
pub fn is_reserved(byte: u8) -> bool {
    matches!(byte, START_DELIMITER | ESCAPE | XON | XOFF)
}

/// Returns a human-readable name for a frame type.
pub fn frame_type_name(frame_type: u8) -> &'static str {
    match frame_type {
        TX_REQUEST_16 => "TX_REQUEST_16",
        TRANSMIT_REQUEST => "TRANSMIT_REQUEST",
        RX_PACKET_64 => "RX_PACKET_64",
        RX_PACKET_16 => "RX_PACKET_16",
        TX_STATUS => "TX_STATUS",
        TRANSMIT_STATUS => "TRANSMIT_STATUS",
        RECEIVE_PACKET => "RECEIVE_PACKET",
        0x80..=0xFF => "NOTIFICATION",
        _ => "REQUEST",
    }
}

/// Returns true if the frame type carries received RF data.
pub fn is_receive(frame_type: u8) -> bool {
    matches!(frame_type, RX_PACKET_64 | RX_PACKET_16 | RECEIVE_PACKET)
}
