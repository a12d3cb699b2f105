//! Byte transport abstraction for XBee API-mode links.
//!
//! The framing layers above only need three things from a link: how many
//! bytes are waiting, a read that never blocks, and a write. This crate
//! provides that contract as the [`Transport`] trait plus two adapters:
//! - [`SerialTransport`] over a serial port, opened 8N1 at 9600 baud by default
//! - [`LoopbackTransport`], an in-memory connected pair

pub mod error;
pub mod memory;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::LoopbackTransport;
pub use serial::{SerialConfig, SerialTransport, DEFAULT_BAUD_RATE};
pub use traits::Transport;
