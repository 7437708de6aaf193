use crate::config::{ChannelConfig, Deadline};
use crate::error::Result;

/// Which side of the link a timeout applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
    Both,
}

impl Direction {
    pub fn includes_read(self) -> bool {
        matches!(self, Direction::Read | Direction::Both)
    }

    pub fn includes_write(self) -> bool {
        matches!(self, Direction::Write | Direction::Both)
    }
}

/// The primitives a serial handle exposes.
///
/// Raw reads and writes perform a single OS call. Returning `Ok(0)` means the
/// configured deadline elapsed (or, with a zero deadline, that nothing was
/// immediately available); any `Err` is a fault on the line. Implementations
/// must not loop to satisfy a byte count: exact-count semantics are layered on
/// top by `serialrec-frame`.
pub trait RawChannel {
    /// Read at most `buf.len()` bytes.
    fn raw_read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write at most `buf.len()` bytes, returning how many were accepted.
    fn raw_write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Apply line settings.
    fn configure(&mut self, config: &ChannelConfig) -> Result<()>;

    /// Set the deadline for subsequent raw operations in `direction`.
    fn set_timeouts(&mut self, direction: Direction, deadline: Deadline) -> Result<()>;

    /// Release the handle. Every later call fails with `TransportError::Closed`.
    fn close(&mut self) -> Result<()>;
}

impl<T: RawChannel + ?Sized> RawChannel for Box<T> {
    fn raw_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).raw_read(buf)
    }

    fn raw_write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).raw_write(buf)
    }

    fn configure(&mut self, config: &ChannelConfig) -> Result<()> {
        (**self).configure(config)
    }

    fn set_timeouts(&mut self, direction: Direction, deadline: Deadline) -> Result<()> {
        (**self).set_timeouts(direction, deadline)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
