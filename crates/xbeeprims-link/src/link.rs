use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};
use xbeeprims_frame::{
    encode_frame, AddressingMode, Assembled, Assembler, Frame, FrameError, HexBytes,
    TransmitRequest,
};
use xbeeprims_transport::{Transport, TransportError};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::queue::{DeliveryQueue, Recv};

const WRITE_BACKOFF: Duration = Duration::from_millis(1);

/// Snapshot of link counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Bytes taken from the transport.
    pub bytes_read: u64,
    /// Valid frames handed to the delivery queue.
    pub frames_delivered: u64,
    /// Candidates dropped by the assembler.
    pub frames_discarded: u64,
    /// Transport reads that failed.
    pub read_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    bytes_read: AtomicU64,
    frames_delivered: AtomicU64,
    frames_discarded: AtomicU64,
    read_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> LinkStats {
        LinkStats {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_discarded: self.frames_discarded.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
        }
    }
}

/// A running XBee link.
///
/// A dedicated thread polls the transport, assembles frames and queues them.
/// Any number of threads may call the receive methods concurrently; sends
/// share the transport with the poller through a mutex.
pub struct XBeeLink<T: Transport + 'static> {
    transport: Arc<Mutex<T>>,
    queue: Arc<DeliveryQueue<Frame>>,
    counters: Arc<Counters>,
    stop: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    config: LinkConfig,
}

impl<T: Transport + 'static> XBeeLink<T> {
    /// Start a link with default configuration.
    pub fn open(transport: T) -> Result<Self> {
        Self::open_with_config(transport, LinkConfig::default())
    }

    /// Start a link, spawning its polling thread.
    pub fn open_with_config(transport: T, config: LinkConfig) -> Result<Self> {
        let name = transport.transport_name();
        let transport = Arc::new(Mutex::new(transport));
        let queue = Arc::new(DeliveryQueue::new());
        let counters = Arc::new(Counters::default());
        let stop = Arc::new(AtomicBool::new(false));

        let poller = Poller {
            transport: Arc::clone(&transport),
            queue: Arc::clone(&queue),
            counters: Arc::clone(&counters),
            stop: Arc::clone(&stop),
            assembler: Assembler::with_config(config.frame_config()),
            poll_interval: config.poll_interval,
            read_chunk_size: config.read_chunk_size,
        };

        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || poller.run())
            .map_err(LinkError::Spawn)?;

        info!(transport = name, mode = %config.mode, "link started");

        Ok(Self {
            transport,
            queue,
            counters,
            stop,
            worker: Mutex::new(Some(worker)),
            config,
        })
    }

    /// Encode and send a transmit request.
    ///
    /// Returns the number of wire bytes written.
    pub fn send(&self, request: &TransmitRequest) -> Result<usize> {
        if self.stop.load(Ordering::Acquire) {
            return Err(LinkError::Closed);
        }

        let frame = self.config.mode.transmit_frame(request)?;
        let mut wire = BytesMut::new();
        encode_frame(&frame, &mut wire)?;
        debug!(wire = %HexBytes(&wire), "tx");

        self.write_wire(&wire)?;
        Ok(wire.len())
    }

    // The transport lock is held for one write attempt at a time so a
    // stalled transmit never keeps the poller from reading.
    fn write_wire(&self, wire: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < wire.len() {
            let attempt = self.lock_transport()?.write(&wire[offset..]);
            match attempt {
                Ok(0) => return Err(FrameError::ConnectionClosed.into()),
                Ok(n) => offset += n,
                Err(err) => self.retry_write(err)?,
            }
        }

        loop {
            let flushed = self.lock_transport()?.flush();
            match flushed {
                Ok(()) => return Ok(()),
                Err(err) => self.retry_write(err)?,
            }
        }
    }

    fn retry_write(&self, err: io::Error) -> Result<()> {
        match err.kind() {
            io::ErrorKind::Interrupted => Ok(()),
            io::ErrorKind::WouldBlock => {
                if self.stop.load(Ordering::Acquire) {
                    return Err(LinkError::Closed);
                }
                thread::sleep(WRITE_BACKOFF);
                Ok(())
            }
            _ => Err(FrameError::Io(err).into()),
        }
    }

    fn lock_transport(&self) -> Result<MutexGuard<'_, T>> {
        self.transport
            .lock()
            .map_err(|_| LinkError::Transport(TransportError::Closed))
    }

    /// Send UTF-8 text using the addressing and options of `template`.
    pub fn send_str(&self, text: &str, template: &TransmitRequest) -> Result<usize> {
        let request = TransmitRequest {
            payload: Bytes::copy_from_slice(text.as_bytes()),
            ..template.clone()
        };
        self.send(&request)
    }

    /// Wait up to the configured receive timeout for the next frame.
    pub fn receive(&self) -> Result<Option<Frame>> {
        self.receive_timeout(self.config.receive_timeout)
    }

    /// Wait up to `timeout` for the next frame.
    ///
    /// Returns `Ok(None)` when the wait expires and `LinkError::Closed` once
    /// the link is shut down and every queued frame has been taken.
    pub fn receive_timeout(&self, timeout: Duration) -> Result<Option<Frame>> {
        match self.queue.recv_timeout(timeout) {
            Recv::Item(frame) => Ok(Some(frame)),
            Recv::TimedOut => Ok(None),
            Recv::Closed => Err(LinkError::Closed),
        }
    }

    /// Take the next frame if one is already queued.
    pub fn try_receive(&self) -> Result<Option<Frame>> {
        match self.queue.try_recv() {
            Recv::Item(frame) => Ok(Some(frame)),
            Recv::TimedOut => Ok(None),
            Recv::Closed => Err(LinkError::Closed),
        }
    }

    /// Current counters.
    pub fn stats(&self) -> LinkStats {
        self.counters.snapshot()
    }

    pub fn mode(&self) -> AddressingMode {
        self.config.mode
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Whether the polling thread is still expected to run.
    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::Acquire) && !self.queue.is_closed()
    }

    /// Stop the polling thread and wait for it to exit.
    ///
    /// The poll in progress is allowed to finish. Frames already queued stay
    /// receivable. Calling this more than once is a no-op.
    pub fn shutdown(&self) -> Result<()> {
        self.stop.store(true, Ordering::Release);

        let handle = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let Some(handle) = handle else {
            return Ok(());
        };

        let joined = handle.join();
        self.queue.close();
        match joined {
            Ok(()) => {
                info!("link stopped");
                Ok(())
            }
            Err(_) => Err(LinkError::WorkerPanicked),
        }
    }
}

impl<T: Transport + 'static> Drop for XBeeLink<T> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!(error = %err, "link shutdown failed");
        }
    }
}

/// State owned by the polling thread.
struct Poller<T> {
    transport: Arc<Mutex<T>>,
    queue: Arc<DeliveryQueue<Frame>>,
    counters: Arc<Counters>,
    stop: Arc<AtomicBool>,
    assembler: Assembler,
    poll_interval: Duration,
    read_chunk_size: usize,
}

impl<T: Transport> Poller<T> {
    fn run(mut self) {
        debug!("poll loop started");
        while !self.stop.load(Ordering::Acquire) {
            match self.read_chunk() {
                Ok(chunk) if chunk.is_empty() => {}
                Ok(chunk) => self.ingest(&chunk),
                Err(TransportError::Closed) => {
                    warn!("transport closed, stopping poll loop");
                    break;
                }
                Err(err) => {
                    // The chunk is lost; the assembler buffer is untouched.
                    self.counters.read_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %err, "transport read failed");
                }
            }
            thread::sleep(self.poll_interval);
        }
        self.queue.close();
        debug!("poll loop exited");
    }

    fn read_chunk(&self) -> xbeeprims_transport::Result<Vec<u8>> {
        let mut transport = self.transport.lock().map_err(|_| TransportError::Closed)?;
        let available = transport.bytes_available()?;
        if available == 0 {
            return Ok(Vec::new());
        }
        transport.read_available(available.min(self.read_chunk_size))
    }

    fn ingest(&mut self, chunk: &[u8]) {
        self.counters
            .bytes_read
            .fetch_add(chunk.len() as u64, Ordering::Relaxed);
        debug!(bytes = %HexBytes(chunk), "rx");

        for item in self.assembler.ingest(chunk) {
            match item {
                Assembled::Frame(frame) => {
                    self.counters.frames_delivered.fetch_add(1, Ordering::Relaxed);
                    if !self.queue.push(frame) {
                        debug!("delivery queue closed, dropping frame");
                    }
                }
                Assembled::Discarded(discard) => {
                    self.counters.frames_discarded.fetch_add(1, Ordering::Relaxed);
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
