use bytes::{BufMut, BytesMut};

use crate::checksum::ChecksumPolicy;
use crate::error::{FrameError, Result};

/// Start-of-record sentinel.
pub const STX: u8 = 0x02;

/// End-of-record sentinel.
pub const ETX: u8 = 0x03;

/// STX (1) + length (2).
pub const HEADER_SIZE: usize = 3;

/// ETX (1) + check byte (1).
pub const TRAILER_SIZE: usize = 2;

/// Bytes a record adds around its payload.
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + TRAILER_SIZE;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// Encode a record into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────────┬─────────────────┬──────┬───────┐
/// │ STX  │ Length   │ Payload         │ ETX  │ Check │
/// │ 0x02 │ (2B BE)  │ (Length bytes)  │ 0x03 │ (1B)  │
/// └──────┴──────────┴─────────────────┴──────┴───────┘
/// ```
pub fn encode_record(
    payload: &[u8],
    checksum: &dyn ChecksumPolicy,
    dst: &mut BytesMut,
) -> Result<()> {
    let len = u16::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: MAX_PAYLOAD,
    })?;
    dst.reserve(FRAME_OVERHEAD + payload.len());
    dst.put_u8(STX);
    dst.put_u16(len);
    dst.put_slice(payload);
    dst.put_u8(ETX);
    dst.put_u8(checksum.compute(payload));
    Ok(())
}
