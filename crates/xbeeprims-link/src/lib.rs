//! Threaded XBee link management.
//!
//! This is the "just works" layer. Hand it a transport and it polls for
//! bytes on a background thread, assembles validated frames and queues them
//! for any number of receivers. Sends go straight to the shared transport.

pub mod config;
pub mod error;
pub mod link;
pub mod queue;

pub use config::{
    LinkConfig, DEFAULT_POLL_INTERVAL, DEFAULT_READ_CHUNK_SIZE, DEFAULT_RECEIVE_TIMEOUT,
};
pub use error::{LinkError, Result};
pub use link::{LinkStats, XBeeLink};
pub use queue::{DeliveryQueue, Recv};
