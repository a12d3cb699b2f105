/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] xbeeprims_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] xbeeprims_frame::FrameError),

    /// The polling thread could not be started.
    #[error("failed to spawn polling thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The polling thread panicked before it could be joined.
    #[error("polling thread panicked")]
    WorkerPanicked,

    /// The link has been shut down.
    #[error("link closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, LinkError>;
