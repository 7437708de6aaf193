use serialrec_frame::FrameError;
use serialrec_transport::TransportError;

/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The port is missing or already held by another owner.
    #[error("failed to open {port}: {source}")]
    OpenFailure {
        port: String,
        #[source]
        source: TransportError,
    },

    /// Line settings or deadlines were rejected.
    #[error("configure failed: {0}")]
    ConfigureFailure(#[source] TransportError),

    /// The handle could not be released cleanly.
    #[error("close failed: {0}")]
    CloseFailure(#[source] TransportError),

    /// The channel has been closed.
    #[error("channel closed")]
    Closed,

    /// Byte or record level error.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
