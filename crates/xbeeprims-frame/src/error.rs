/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A transmit request carried no payload.
    #[error("payload must not be empty")]
    EmptyPayload,

    /// The frame content does not fit the 16-bit length field.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The candidate ends with an escape byte whose partner has not arrived.
    #[error("escape byte at end of input")]
    TruncatedEscape,

    /// The declared length exceeds the bytes present after the length field.
    #[error("declared length {declared} exceeds available {available} bytes")]
    MalformedLength { declared: usize, available: usize },

    /// The frame bytes do not sum to 0xFF.
    #[error("checksum mismatch (sum 0x{sum:02x}, expected 0xff)")]
    ChecksumMismatch { sum: u8 },

    /// The candidate is shorter than the minimum frame for the addressing mode.
    #[error("candidate too short ({len} bytes, min {min})")]
    TooShort { len: usize, min: usize },

    /// Bytes arrived before any start delimiter.
    #[error("{len} bytes received outside a frame")]
    Unsynchronized { len: usize },

    /// The frame is structurally invalid.
    #[error("invalid frame: {0}")]
    InvalidFrame(&'static str),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before another complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True when more input could still turn the candidate into a valid frame.
    ///
    /// Only meaningful for the trailing, not yet delimiter-terminated candidate:
    /// a candidate followed by another start delimiter can never grow.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            FrameError::TooShort { .. }
                | FrameError::TruncatedEscape
                | FrameError::MalformedLength { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
