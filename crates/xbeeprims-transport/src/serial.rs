use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Factory setting of XBee modules.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Line settings applied when opening a serial port.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate. Default: 9600.
    pub baud_rate: u32,
    /// How long a read or write may wait. Default: zero, never wait.
    pub timeout: Duration,
}

impl SerialConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: Duration::ZERO,
        }
    }
}

/// Transport over a serial port, 8N1 without flow control.
///
/// A read or write that would have to wait past the port timeout reports
/// `ErrorKind::WouldBlock`, so callers see the same non-blocking contract as
/// every other transport.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `path` at 9600 baud with a zero timeout.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &SerialConfig::default())
    }

    /// Open `path` with explicit line settings.
    pub fn open_with_config(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref();
        let port = serialport::new(path.to_string_lossy(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|source| TransportError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        debug!(?path, baud = config.baud_rate, "opened serial port");
        Ok(Self::from_port(port))
    }

    /// Wrap a port that is already open and configured.
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    /// Borrow the underlying port.
    pub fn get_ref(&self) -> &dyn SerialPort {
        self.port.as_ref()
    }

    /// Mutably borrow the underlying port, e.g. to change the baud rate.
    pub fn get_mut(&mut self) -> &mut dyn SerialPort {
        self.port.as_mut()
    }

    /// Consume the transport and return the port.
    pub fn into_inner(self) -> Box<dyn SerialPort> {
        self.port
    }
}

fn timed_out_as_would_block(err: io::Error) -> io::Error {
    if err.kind() == io::ErrorKind::TimedOut {
        io::ErrorKind::WouldBlock.into()
    } else {
        err
    }
}

impl Read for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf).map_err(timed_out_as_would_block)
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf).map_err(timed_out_as_would_block)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush().map_err(timed_out_as_would_block)
    }
}

impl Transport for SerialTransport {
    fn bytes_available(&mut self) -> Result<usize> {
        let waiting = self.port.bytes_to_read()?;
        Ok(usize::try_from(waiting).unwrap_or(usize::MAX))
    }

    fn transport_name(&self) -> &'static str {
        "serial"
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn wait_for_bytes<T: Transport>(t: &mut T, want: usize) -> usize {
        let start = Instant::now();
        loop {
            let n = t.bytes_available().unwrap();
            if n >= want || start.elapsed() > Duration::from_secs(2) {
                return n;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn defaults_match_module_factory_settings() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout, Duration::ZERO);

        let config = config
            .with_baud_rate(115_200)
            .with_timeout(Duration::from_millis(5));
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout, Duration::from_millis(5));
    }

    #[test]
    fn open_missing_device_reports_path() {
        let missing = std::env::temp_dir().join(format!(
            "xbeeprims-missing-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        let err = SerialTransport::open(&missing).unwrap_err();
        assert!(matches!(err, TransportError::Open { path, .. } if path == missing));
    }

    #[test]
    fn timeouts_surface_as_would_block() {
        let err = timed_out_as_would_block(io::ErrorKind::TimedOut.into());
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        let err = timed_out_as_would_block(io::ErrorKind::BrokenPipe.into());
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[cfg(unix)]
    mod pty {
        use serialport::TTYPort;

        use super::*;

        fn pty_pair() -> (SerialTransport, TTYPort) {
            let (mut master, slave) = TTYPort::pair().expect("pty pair should open");
            master.set_timeout(Duration::ZERO).unwrap();
            (SerialTransport::from_port(Box::new(master)), slave)
        }

        #[test]
        fn reports_and_reads_waiting_bytes() {
            let (mut transport, mut device) = pty_pair();
            assert_eq!(transport.transport_name(), "serial");

            device.write_all(b"hello").unwrap();
            assert_eq!(wait_for_bytes(&mut transport, 5), 5);

            assert_eq!(transport.read_available(64).unwrap(), b"hello");
            assert_eq!(transport.bytes_available().unwrap(), 0);
        }

        #[test]
        fn read_without_data_does_not_block() {
            let (mut transport, _device) = pty_pair();
            let start = Instant::now();
            assert!(transport.read_available(64).unwrap().is_empty());
            assert!(start.elapsed() < Duration::from_secs(1));
        }
    }
}
