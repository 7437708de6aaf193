use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::checksum::ChecksumPolicy;
use crate::codec::{ETX, STX};
use crate::error::{FrameError, Result};
use crate::reliable::{read_exactly, ByteSource};

/// Read one record off the line and return its payload.
///
/// Fields are consumed strictly in order, each with an exact-count read, and
/// the first field that fails to match ends the attempt. Nothing past the
/// offending field is consumed. I/O errors (faults, blocking timeouts) are
/// returned unchanged. After any error the stream position is unknown to the
/// peer; callers resynchronize by discarding input up to the next STX.
pub fn read_record<S: ByteSource + ?Sized>(
    src: &mut S,
    checksum: &dyn ChecksumPolicy,
) -> Result<Bytes> {
    match read_byte(src)? {
        Some(STX) => {}
        found => {
            debug!(?found, "rejecting record: bad header");
            return Err(FrameError::MalformedHeader { found });
        }
    }

    let mut len = [0u8; 2];
    let got = read_exactly(src, &mut len)?;
    if got != len.len() {
        debug!(got, "rejecting record: short length field");
        return Err(FrameError::MalformedLength { got });
    }
    let expected = usize::from(u16::from_be_bytes(len));

    let mut payload = BytesMut::zeroed(expected);
    let got = read_exactly(src, &mut payload)?;
    if got != expected {
        debug!(got, expected, "rejecting record: short payload");
        return Err(FrameError::MalformedPayload { expected, got });
    }

    match read_byte(src)? {
        Some(ETX) => {}
        found => {
            debug!(?found, "rejecting record: bad trailer");
            return Err(FrameError::MalformedTrailer { found });
        }
    }

    let Some(check) = read_byte(src)? else {
        debug!("rejecting record: missing checksum");
        return Err(FrameError::MissingChecksum);
    };
    if !checksum.verify(&payload, check) {
        return Err(FrameError::ChecksumMismatch {
            expected: checksum.compute(&payload),
            found: check,
        });
    }

    Ok(payload.freeze())
}

/// Read one record and copy its payload into `out`.
///
/// Returns the payload length. If `out` is shorter than the payload the
/// record is consumed, `out` is left untouched and `BufferTooSmall` is
/// returned.
pub fn read_record_into<S: ByteSource + ?Sized>(
    src: &mut S,
    checksum: &dyn ChecksumPolicy,
    out: &mut [u8],
) -> Result<usize> {
    let payload = read_record(src, checksum)?;
    let capacity = out.len();
    let dst = out
        .get_mut(..payload.len())
        .ok_or(FrameError::BufferTooSmall {
            needed: payload.len(),
            capacity,
        })?;
    dst.copy_from_slice(&payload);
    Ok(payload.len())
}

fn read_byte<S: ByteSource + ?Sized>(src: &mut S) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    let got = read_exactly(src, &mut byte)?;
    Ok((got == 1).then_some(byte[0]))
}
