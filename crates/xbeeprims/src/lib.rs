//! XBee API-mode framing and serial links for Rust.
//!
//! xbeeprims speaks the escaped API framing used by XBee radio modules in
//! both 16-bit and 64-bit addressing generations, from raw bytes up to a
//! threaded link with a blocking receive queue.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte transports (serial ports, in-memory loopback)
//! - [`frame`]: escaping, checksums, frame encoding and stream assembly
//! - [`link`]: background polling and frame delivery (behind `link` feature)

/// Re-export transport types.
pub mod transport {
    pub use xbeeprims_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use xbeeprims_frame::*;
}

/// Re-export link types (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use xbeeprims_link::*;
}
