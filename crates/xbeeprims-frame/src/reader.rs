use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use tracing::{debug, warn};

use crate::assembler::{Assembled, Assembler};
use crate::codec::{Frame, FrameConfig, HexBytes};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete frames from any blocking `Read` stream.
///
/// Handles partial reads and resynchronisation internally. Callers only see
/// validated frames; discarded candidates are logged and skipped.
pub struct FrameReader<T> {
    inner: T,
    assembler: Assembler,
    ready: VecDeque<Frame>,
    discarded: u64,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            assembler: Assembler::with_config(config),
            ready: VecDeque::new(),
            discarded: 0,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            for item in self.assembler.ingest(&chunk[..read]) {
                match item {
                    Assembled::Frame(frame) => {
                        debug!(frame_type = frame.frame_type, len = frame.data.len(), "rx");
                        self.ready.push_back(frame);
                    }
                    Assembled::Discarded(discard) => {
                        self.discarded += 1;
                        warn!(
                            reason = %discard.reason,
                            bytes = %HexBytes(&discard.bytes),
                            "discarded candidate"
                        );
                    }
                }
            }
        }
    }

    /// Number of candidates dropped so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> &[u8] {
        self.assembler.pending()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current assembler configuration.
    pub fn config(&self) -> &FrameConfig {
        self.assembler.config()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::api::RX_PACKET_16;
    use crate::codec::{AddressingMode, TransmitRequest};
    use crate::writer::FrameWriter;

    fn rx(data: &[u8]) -> Frame {
        let mut body = vec![0x00, 0x01, 0x30, 0x00];
        body.extend_from_slice(data);
        Frame::new(RX_PACKET_16, body)
    }

    fn wire(frames: &[Frame]) -> Vec<u8> {
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        for frame in frames {
            writer.write_frame(frame).unwrap();
        }
        writer.into_inner().into_inner()
    }

    #[test]
    fn read_single_frame() {
        let frame = rx(b"hello");
        let mut reader = FrameReader::new(Cursor::new(wire(&[frame.clone()])));
        assert_eq!(reader.read_frame().unwrap(), frame);
    }

    #[test]
    fn read_multiple_frames() {
        let frames = [rx(b"one"), rx(b"two"), rx(b"three")];
        let mut reader = FrameReader::new(Cursor::new(wire(&frames)));

        for expected in &frames {
            assert_eq!(&reader.read_frame().unwrap(), expected);
        }
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ConnectionClosed
        ));
    }

    #[test]
    fn partial_read_handling() {
        let frame = rx(b"\x7E\x7D slow \x11\x13");
        let byte_reader = ByteByByteReader {
            bytes: wire(&[frame.clone()]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);
        assert_eq!(reader.read_frame().unwrap(), frame);
    }

    #[test]
    fn corrupt_frames_are_skipped() {
        let good = rx(b"good");
        let mut bytes = wire(&[rx(b"bad!"), good.clone()]);
        bytes[8] ^= 0xFF;

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_frame().unwrap(), good);
        assert_eq!(reader.discarded(), 1);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let bytes = wire(&[rx(b"only-part")]);
        let mut reader = FrameReader::new(Cursor::new(bytes[..10].to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert_eq!(reader.pending(), &bytes[..10]);
    }

    #[test]
    fn extended_config_is_applied() {
        let mut writer = FrameWriter::with_mode(Cursor::new(Vec::new()), AddressingMode::Extended64);
        writer.send(&TransmitRequest::text("status?")).unwrap();
        let bytes = writer.into_inner().into_inner();

        let mut reader = FrameReader::with_config(
            Cursor::new(bytes),
            FrameConfig::for_mode(AddressingMode::Extended64),
        );
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.frame_type, 0x10);
        assert_eq!(reader.config().mode, AddressingMode::Extended64);
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[cfg(unix)]
    #[test]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.send(&TransmitRequest::text("ping").to(0x0002)).unwrap();
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.frame_type, 0x01);
        assert_eq!(&frame.data[4..], b"ping");
    }

    #[cfg(unix)]
    #[test]
    fn concurrent_reader_writer_threads() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = FrameWriter::new(left);
        let reader = Arc::new(Mutex::new(FrameReader::new(right)));

        let reader_thread = {
            let reader = Arc::clone(&reader);
            std::thread::spawn(move || {
                for expected in 0..64u16 {
                    let frame = reader.lock().unwrap().read_frame().unwrap();
                    assert_eq!(&frame.data[4..], format!("msg-{expected}").as_bytes());
                }
            })
        };

        for i in 0..64u16 {
            writer.send(&TransmitRequest::text(&format!("msg-{i}")).to(i)).unwrap();
        }

        reader_thread.join().unwrap();
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire(&[rx(b"ok")]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let frame = rx(b"ok");
        let reader = InterruptedThenData {
            state: 0,
            bytes: wire(&[frame.clone()]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_frame().unwrap(), frame);
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
