use bytes::BytesMut;
use tracing::debug;

use crate::checksum::ChecksumPolicy;
use crate::codec::{encode_record, FRAME_OVERHEAD};
use crate::error::{FrameError, Result};
use crate::reliable::{write_exactly, ByteSink};

/// Encode `payload` as one record and write all of it.
///
/// Returns the payload length (not the frame length). A sink that stops
/// accepting bytes part way through yields `IncompleteWrite`.
pub fn write_record<S: ByteSink + ?Sized>(
    sink: &mut S,
    checksum: &dyn ChecksumPolicy,
    payload: &[u8],
) -> Result<usize> {
    let mut frame = BytesMut::with_capacity(FRAME_OVERHEAD + payload.len());
    encode_record(payload, checksum, &mut frame)?;

    let written = write_exactly(sink, &frame)?;
    if written != frame.len() {
        debug!(written, expected = frame.len(), "record only partly written");
        return Err(FrameError::IncompleteWrite {
            expected: frame.len(),
            written,
        });
    }
    Ok(payload.len())
}
