use std::io::{ErrorKind, Write};
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use tracing::debug;

use crate::codec::{encode_frame, AddressingMode, Frame, HexBytes, TransmitRequest};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Pause before retrying a write the stream could not accept.
pub const WOULD_BLOCK_BACKOFF: Duration = Duration::from_millis(1);

/// Writes escaped, checksummed frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    mode: AddressingMode,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer for short (16-bit) addressing.
    pub fn new(inner: T) -> Self {
        Self::with_mode(inner, AddressingMode::default())
    }

    /// Create a new frame writer for an explicit addressing mode.
    pub fn with_mode(inner: T, mode: AddressingMode) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            mode,
        }
    }

    /// Encode and send a transmit request.
    ///
    /// Returns the number of wire bytes written. Nothing is written for an
    /// empty payload.
    pub fn send(&mut self, request: &TransmitRequest) -> Result<usize> {
        let frame = self.mode.transmit_frame(request)?;
        self.write_frame(&frame)
    }

    /// Encode and send an arbitrary API frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<usize> {
        self.buf.clear();
        encode_frame(frame, &mut self.buf)?;
        debug!(wire = %HexBytes(&self.buf), "tx");

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(WOULD_BLOCK_BACKOFF)
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()?;
        Ok(self.buf.len())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(WOULD_BLOCK_BACKOFF)
                }
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Addressing mode used for transmit requests.
    pub fn mode(&self) -> AddressingMode {
        self.mode
    }
}
