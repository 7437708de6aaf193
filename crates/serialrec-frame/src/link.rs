use serialrec_transport::{Deadline, Direction, IoDeadlines, RawChannel};
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::reliable::{ByteSink, ByteSource};

/// A raw channel plus the blocking mode of each direction.
///
/// A zero-byte raw result is a timeout when that direction blocks and a
/// plain empty result when it does not.
#[derive(Debug)]
pub struct Link<T> {
    inner: T,
    deadlines: IoDeadlines,
}

impl<T: RawChannel> Link<T> {
    /// Wrap a channel that blocks forever in both directions.
    pub fn new(inner: T) -> Self {
        Self::with_deadlines(inner, IoDeadlines::default())
    }

    /// Wrap a channel whose deadlines are already known.
    pub fn with_deadlines(inner: T, deadlines: IoDeadlines) -> Self {
        Self { inner, deadlines }
    }

    /// Propagate a deadline to the channel, then record it.
    ///
    /// On failure the recorded deadlines are unchanged.
    pub fn set_deadline(
        &mut self,
        direction: Direction,
        deadline: Deadline,
    ) -> serialrec_transport::Result<()> {
        self.inner.set_timeouts(direction, deadline)?;
        self.deadlines.set(direction, deadline);
        Ok(())
    }

    /// Current read and write deadlines.
    pub fn deadlines(&self) -> IoDeadlines {
        self.deadlines
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the link and return the inner channel.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: RawChannel> ByteSource for Link<T> {
    fn read_once(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self
            .inner
            .raw_read(buf)
            .map_err(FrameError::ReadFailure)?;
        if n == 0 && !buf.is_empty() && self.deadlines.read_blocks() {
            trace!(deadline = %self.deadlines.read, "read pass produced no data");
            return Err(FrameError::ReadTimeout);
        }
        Ok(n)
    }
}

impl<T: RawChannel> ByteSink for Link<T> {
    fn write_once(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self
            .inner
            .raw_write(buf)
            .map_err(FrameError::WriteFailure)?;
        if n == 0 && !buf.is_empty() && self.deadlines.write_blocks() {
            trace!(deadline = %self.deadlines.write, "write pass was not drained");
            return Err(FrameError::WriteTimeout);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use serialrec_transport::MemoryChannel;

    use super::*;

    #[test]
    fn blocking_read_of_nothing_times_out() {
        let mut link = Link::new(MemoryChannel::new());
        let mut buf = [0u8; 4];

        let err = link.read_once(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::ReadTimeout));
    }

    #[test]
    fn non_blocking_read_of_nothing_is_empty() {
        let mut link = Link::new(MemoryChannel::new());
        link.set_deadline(Direction::Read, Deadline::NonBlocking).unwrap();
        let mut buf = [0u8; 4];

        assert_eq!(link.read_once(&mut buf).unwrap(), 0);
    }

    #[test]
    fn read_returns_available_bytes() {
        let mut link = Link::new(MemoryChannel::with_inbound(b"xy"));
        let mut buf = [0u8; 4];

        assert_eq!(link.read_once(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"xy");
    }

    #[test]
    fn raw_fault_is_read_failure() {
        let mut link = Link::new(MemoryChannel::new().fail_reads());
        let mut buf = [0u8; 1];

        let err = link.read_once(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::ReadFailure(_)));
    }

    #[test]
    fn blocking_write_not_drained_times_out() {
        let mut link = Link::new(MemoryChannel::new().write_capacity(0));

        let err = link.write_once(b"x").unwrap_err();
        assert!(matches!(err, FrameError::WriteTimeout));
    }

    #[test]
    fn non_blocking_write_not_drained_is_empty() {
        let mut link = Link::new(MemoryChannel::new().write_capacity(0));
        link.set_deadline(Direction::Write, Deadline::NonBlocking).unwrap();

        assert_eq!(link.write_once(b"x").unwrap(), 0);
    }

    #[test]
    fn raw_fault_is_write_failure() {
        let mut link = Link::new(MemoryChannel::new().fail_writes());

        let err = link.write_once(b"x").unwrap_err();
        assert!(matches!(err, FrameError::WriteFailure(_)));
    }

    #[test]
    fn deadline_reaches_channel_and_flags() {
        let mut link = Link::new(MemoryChannel::new());
        link.set_deadline(Direction::Both, Deadline::NonBlocking).unwrap();

        assert!(!link.deadlines().read_blocks());
        assert!(!link.deadlines().write_blocks());
        assert!(!link.get_ref().deadlines().read_blocks());
    }

    #[test]
    fn rejected_deadline_keeps_flags() {
        let mut link = Link::new(MemoryChannel::new().fail_configure());
        assert!(link
            .set_deadline(Direction::Both, Deadline::NonBlocking)
            .is_err());

        assert!(link.deadlines().read_blocks());
        assert!(link.deadlines().write_blocks());
    }
}
