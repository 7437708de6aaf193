use serialrec_transport::TransportError;

/// Errors that can occur while moving bytes or records over a link.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The raw read primitive reported a fault.
    #[error("read failed: {0}")]
    ReadFailure(#[source] TransportError),

    /// The raw write primitive reported a fault.
    #[error("write failed: {0}")]
    WriteFailure(#[source] TransportError),

    /// A blocking read produced no data before its deadline.
    #[error("read timed out")]
    ReadTimeout,

    /// A blocking write was not drained before its deadline.
    #[error("write timed out")]
    WriteTimeout,

    /// The first byte was not STX.
    #[error("malformed header (expected 0x02, found {})", describe(.found))]
    MalformedHeader { found: Option<u8> },

    /// The two length bytes did not arrive.
    #[error("malformed length field ({got} of 2 bytes)")]
    MalformedLength { got: usize },

    /// Fewer payload bytes arrived than the length field declared.
    #[error("malformed payload ({got} of {expected} bytes)")]
    MalformedPayload { expected: usize, got: usize },

    /// The byte after the payload was not ETX.
    #[error("malformed trailer (expected 0x03, found {})", describe(.found))]
    MalformedTrailer { found: Option<u8> },

    /// The check byte did not arrive.
    #[error("missing checksum byte")]
    MissingChecksum,

    /// The checksum policy rejected the check byte.
    #[error("checksum mismatch (expected {expected:#04x}, found {found:#04x})")]
    ChecksumMismatch { expected: u8, found: u8 },

    /// The caller's buffer cannot hold the data.
    #[error("buffer too small ({needed} bytes needed, capacity {capacity})")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// The encoded record was only partly written.
    #[error("incomplete write ({written} of {expected} bytes)")]
    IncompleteWrite { expected: usize, written: usize },

    /// The payload does not fit the 16-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

fn describe(found: &Option<u8>) -> String {
    match found {
        Some(byte) => format!("{byte:#04x}"),
        None => "nothing".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
