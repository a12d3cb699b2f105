//! Typed views of inbound API frames.

use bytes::{Buf, Bytes};

use crate::api::{
    OPTION_BROADCAST, RECEIVE_PACKET, RX_PACKET_16, RX_PACKET_64, TRANSMIT_STATUS, TX_STATUS,
};
use crate::codec::Frame;
use crate::error::{FrameError, Result};

/// Where a received packet came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAddress {
    /// 16-bit short address.
    Short(u16),
    /// 64-bit extended address, with the 16-bit network address when known.
    Extended { address64: u64, address16: Option<u16> },
}

/// RF data received by the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivePacket {
    pub source: SourceAddress,
    /// Received signal strength as `-dBm`, where the frame reports it.
    pub rssi: Option<u8>,
    pub options: u8,
    pub data: Bytes,
}

impl ReceivePacket {
    /// Signal strength in dBm.
    pub fn rssi_dbm(&self) -> Option<i16> {
        self.rssi.map(|rssi| -i16::from(rssi))
    }

    /// True if the sender addressed the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        self.options & OPTION_BROADCAST != 0
    }
}

/// Outcome of an earlier transmit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitStatus {
    pub frame_id: u8,
    /// Network address the packet went to (extended frames only).
    pub address16: Option<u16>,
    /// Transmit retry count (extended frames only).
    pub retries: Option<u8>,
    /// Delivery status; zero is success.
    pub delivery: u8,
    /// Route discovery status (extended frames only).
    pub discovery: Option<u8>,
}

impl TransmitStatus {
    /// True if the module reported successful delivery.
    pub fn is_success(&self) -> bool {
        self.delivery == 0
    }
}

/// A frame decoded by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFrame {
    Receive(ReceivePacket),
    TransmitStatus(TransmitStatus),
    /// Any frame type without a typed view.
    Other(Frame),
}

impl ApiFrame {
    /// Interpret `frame` according to its type.
    pub fn parse(frame: &Frame) -> Result<Self> {
        let mut body = frame.data.clone();
        let parsed = match frame.frame_type {
            RX_PACKET_16 => {
                need(&body, 4, "rx packet (16-bit) too short")?;
                ApiFrame::Receive(ReceivePacket {
                    source: SourceAddress::Short(body.get_u16()),
                    rssi: Some(body.get_u8()),
                    options: body.get_u8(),
                    data: body,
                })
            }
            RX_PACKET_64 => {
                need(&body, 10, "rx packet (64-bit) too short")?;
                ApiFrame::Receive(ReceivePacket {
                    source: SourceAddress::Extended {
                        address64: body.get_u64(),
                        address16: None,
                    },
                    rssi: Some(body.get_u8()),
                    options: body.get_u8(),
                    data: body,
                })
            }
            RECEIVE_PACKET => {
                need(&body, 11, "receive packet too short")?;
                ApiFrame::Receive(ReceivePacket {
                    source: SourceAddress::Extended {
                        address64: body.get_u64(),
                        address16: Some(body.get_u16()),
                    },
                    rssi: None,
                    options: body.get_u8(),
                    data: body,
                })
            }
            TX_STATUS => {
                need(&body, 2, "tx status too short")?;
                ApiFrame::TransmitStatus(TransmitStatus {
                    frame_id: body.get_u8(),
                    address16: None,
                    retries: None,
                    delivery: body.get_u8(),
                    discovery: None,
                })
            }
            TRANSMIT_STATUS => {
                need(&body, 6, "transmit status too short")?;
                ApiFrame::TransmitStatus(TransmitStatus {
                    frame_id: body.get_u8(),
                    address16: Some(body.get_u16()),
                    retries: Some(body.get_u8()),
                    delivery: body.get_u8(),
                    discovery: Some(body.get_u8()),
                })
            }
            _ => ApiFrame::Other(frame.clone()),
        };
        Ok(parsed)
    }
}

fn need(body: &Bytes, len: usize, what: &'static str) -> Result<()> {
    if body.remaining() < len {
        return Err(FrameError::InvalidFrame(what));
    }
    Ok(())
}
