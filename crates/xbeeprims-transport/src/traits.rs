use std::io::{ErrorKind, Read, Write};

use crate::error::Result;

/// A raw byte link to a radio module.
///
/// `read` must not block waiting for data: it returns whatever is currently
/// available, possibly nothing (`Ok(0)` or `ErrorKind::WouldBlock`).
/// Transports know nothing about framing.
pub trait Transport: Read + Write + Send {
    /// Number of bytes that can be read right now without blocking.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;

    /// Read up to `max` bytes that are currently available.
    ///
    /// Returns an empty vector when nothing is waiting.
    fn read_available(&mut self, max: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; max];
        loop {
            match self.read(&mut out) {
                Ok(n) => {
                    out.truncate(n);
                    return Ok(out);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    out.clear();
                    return Ok(out);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    struct Scripted {
        steps: Vec<io::Result<Vec<u8>>>,
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.steps.is_empty() {
                return Ok(0);
            }
            let data = self.steps.remove(0)?;
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            Ok(n)
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for Scripted {
        fn bytes_available(&mut self) -> Result<usize> {
            Ok(0)
        }

        fn transport_name(&self) -> &'static str {
            "scripted"
        }
    }

    #[test]
    fn read_available_truncates_to_what_was_read() {
        let mut t = Scripted {
            steps: vec![Ok(vec![1, 2, 3])],
        };
        assert_eq!(t.read_available(16).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn read_available_caps_at_max() {
        let mut t = Scripted {
            steps: vec![Ok(vec![9; 32])],
        };
        assert_eq!(t.read_available(4).unwrap().len(), 4);
    }

    #[test]
    fn read_available_retries_interrupted() {
        let mut t = Scripted {
            steps: vec![Err(ErrorKind::Interrupted.into()), Ok(vec![7])],
        };
        assert_eq!(t.read_available(8).unwrap(), vec![7]);
    }

    #[test]
    fn read_available_treats_would_block_as_empty() {
        let mut t = Scripted {
            steps: vec![Err(ErrorKind::WouldBlock.into())],
        };
        assert!(t.read_available(8).unwrap().is_empty());
    }

    #[test]
    fn read_available_propagates_other_errors() {
        let mut t = Scripted {
            steps: vec![Err(ErrorKind::BrokenPipe.into())],
        };
        let err = t.read_available(8).unwrap_err();
        assert!(matches!(err, crate::TransportError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn boxed_transport_delegates() {
        let mut boxed: Box<dyn Transport> = Box::new(Scripted { steps: Vec::new() });
        assert_eq!(boxed.transport_name(), "scripted");
        assert_eq!(boxed.bytes_available().unwrap(), 0);
    }
}
