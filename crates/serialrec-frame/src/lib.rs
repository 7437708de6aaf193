//! Record framing over a raw serial channel.
//!
//! Every record on the wire is:
//! - `STX` (0x02)
//! - a 2-byte big-endian payload length
//! - the payload
//! - `ETX` (0x03)
//! - one check byte produced by a [`ChecksumPolicy`]
//!
//! Records are decoded straight off the line with exact-count reads, so a
//! frame may arrive in any chunking. A zero-byte read mid-frame ends the
//! attempt with a malformed-frame error instead of hanging.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod link;
pub mod reader;
pub mod reliable;
pub mod writer;

pub use checksum::{ChecksumPolicy, Placeholder};
pub use codec::{encode_record, ETX, FRAME_OVERHEAD, HEADER_SIZE, MAX_PAYLOAD, STX, TRAILER_SIZE};
pub use error::{FrameError, Result};
pub use link::Link;
pub use reader::{read_record, read_record_into};
pub use reliable::{read_exactly, write_exactly, ByteSink, ByteSource};
pub use writer::write_record;
