use std::time::Duration;

use xbeeprims_frame::{AddressingMode, FrameConfig, MAX_WIRE_FRAME};

/// Default delay between two transport polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default wait for [`XBeeLink::receive`](crate::XBeeLink::receive).
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default upper bound on bytes taken from the transport per poll.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;

/// Link behavior configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Addressing mode of the attached module.
    pub mode: AddressingMode,
    /// Sleep between polls of the transport.
    pub poll_interval: Duration,
    /// Wait applied by `receive()`.
    pub receive_timeout: Duration,
    /// Maximum bytes read per poll.
    pub read_chunk_size: usize,
    /// Bound on the assembler's held tail.
    pub max_pending: usize,
    /// Name given to the polling thread.
    pub thread_name: String,
}

impl LinkConfig {
    /// Default configuration for `mode`.
    pub fn for_mode(mode: AddressingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Override the per-poll read size. Zero is clamped to one byte.
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Assembler configuration derived from this link configuration.
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            mode: self.mode,
            max_pending: self.max_pending,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            mode: AddressingMode::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_pending: MAX_WIRE_FRAME,
            thread_name: "xbee-poll".to_string(),
        }
    }
}
