use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::Result;
use crate::traits::Transport;

#[derive(Debug, Default)]
struct Pipe {
    data: VecDeque<u8>,
    closed: bool,
}

/// One end of an in-memory, connected transport pair.
///
/// Bytes written on one end become readable on the other. Reads never block.
/// Dropping either end closes both directions; writes then fail with
/// `BrokenPipe`, reads drain whatever is still buffered.
#[derive(Debug)]
pub struct LoopbackTransport {
    rx: Arc<Mutex<Pipe>>,
    tx: Arc<Mutex<Pipe>>,
}

impl LoopbackTransport {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Mutex::new(Pipe::default()));
        let b_to_a = Arc::new(Mutex::new(Pipe::default()));
        (
            Self {
                rx: Arc::clone(&b_to_a),
                tx: Arc::clone(&a_to_b),
            },
            Self {
                rx: a_to_b,
                tx: b_to_a,
            },
        )
    }
}

fn lock(pipe: &Mutex<Pipe>) -> io::Result<MutexGuard<'_, Pipe>> {
    pipe.lock()
        .map_err(|_| io::Error::other("loopback pipe poisoned"))
}

impl Read for LoopbackTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pipe = lock(&self.rx)?;
        let n = buf.len().min(pipe.data.len());
        for (slot, byte) in buf.iter_mut().zip(pipe.data.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for LoopbackTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut pipe = lock(&self.tx)?;
        if pipe.closed {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        pipe.data.extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for LoopbackTransport {
    fn bytes_available(&mut self) -> Result<usize> {
        Ok(lock(&self.rx)?.data.len())
    }

    fn transport_name(&self) -> &'static str {
        "loopback"
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        for pipe in [&self.rx, &self.tx] {
            if let Ok(mut pipe) = pipe.lock() {
                pipe.closed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_are_readable_on_the_other_end() {
        let (mut a, mut b) = LoopbackTransport::pair();
        a.write_all(b"ping").unwrap();
        b.write_all(b"pong!").unwrap();

        assert_eq!(b.bytes_available().unwrap(), 4);
        assert_eq!(a.bytes_available().unwrap(), 5);
        assert_eq!(b.read_available(16).unwrap(), b"ping");
        assert_eq!(a.read_available(16).unwrap(), b"pong!");
    }

    #[test]
    fn partial_reads_keep_the_rest() {
        let (mut a, mut b) = LoopbackTransport::pair();
        a.write_all(&[1, 2, 3, 4, 5]).unwrap();

        assert_eq!(b.read_available(2).unwrap(), vec![1, 2]);
        assert_eq!(b.bytes_available().unwrap(), 3);
        assert_eq!(b.read_available(8).unwrap(), vec![3, 4, 5]);
    }

    #[test]
    fn empty_read_returns_nothing() {
        let (_a, mut b) = LoopbackTransport::pair();
        assert!(b.read_available(8).unwrap().is_empty());
    }

    #[test]
    fn write_after_peer_drop_is_broken_pipe() {
        let (mut a, b) = LoopbackTransport::pair();
        drop(b);
        let err = a.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn buffered_bytes_survive_writer_drop() {
        let (mut a, mut b) = LoopbackTransport::pair();
        a.write_all(b"late").unwrap();
        drop(a);
        assert_eq!(b.read_available(8).unwrap(), b"late");
    }
}
