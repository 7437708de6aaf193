/// Errors reported by a raw serial channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The port does not exist or is held by another owner.
    #[error("cannot open port: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// The requested line settings were rejected.
    #[error("failed to configure port: {0}")]
    Configure(String),

    /// Error reported by the serialport backend.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on the port.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The handle has already been released.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
