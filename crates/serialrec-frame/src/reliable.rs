//! Exact-count reads and writes.
//!
//! Both loops stop at the first pass that moves zero bytes and report the
//! count so far. A pass only returns zero when the link is non-blocking or the
//! far end has nothing more, so the record reader can turn a short count into
//! a malformed-frame error instead of waiting forever.

use tracing::trace;

use crate::error::Result;

/// One read pass over a link.
pub trait ByteSource {
    /// Read at most `buf.len()` bytes with a single raw call.
    ///
    /// `Ok(0)` means no data and no error; blocking links report a timeout
    /// as an error instead.
    fn read_once(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// One write pass over a link.
pub trait ByteSink {
    /// Write at most `buf.len()` bytes with a single raw call.
    fn write_once(&mut self, buf: &[u8]) -> Result<usize>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_once(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_once(buf)
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn write_once(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write_once(buf)
    }
}

/// Fill `buf` from `src`, or as much of it as arrives before a zero pass.
///
/// Returns `buf.len()` on success, a smaller count when the source ran dry,
/// and the pass's error (partial progress discarded) on a fault or timeout.
pub fn read_exactly<S: ByteSource + ?Sized>(src: &mut S, buf: &mut [u8]) -> Result<usize> {
    let want = buf.len();
    let mut filled = 0usize;
    while filled < want {
        let n = src.read_once(&mut buf[filled..])?;
        if n == 0 {
            trace!(filled, want, "source ran dry");
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Write all of `buf` to `sink`, or as much as is accepted before a zero pass.
pub fn write_exactly<S: ByteSink + ?Sized>(sink: &mut S, buf: &[u8]) -> Result<usize> {
    let want = buf.len();
    let mut written = 0usize;
    while written < want {
        let n = sink.write_once(&buf[written..])?;
        if n == 0 {
            trace!(written, want, "sink stopped draining");
            break;
        }
        written += n;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::error::FrameError;

    /// Replays scripted pass results; an exhausted script reads as zero.
    #[derive(Default)]
    struct Script {
        reads: VecDeque<Result<Vec<u8>>>,
        accepts: VecDeque<Result<usize>>,
        written: Vec<u8>,
        calls: usize,
    }

    impl ByteSource for Script {
        fn read_once(&mut self, buf: &mut [u8]) -> Result<usize> {
            self.calls += 1;
            match self.reads.pop_front() {
                Some(Ok(bytes)) => {
                    assert!(bytes.len() <= buf.len(), "script over-delivered");
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(err)) => Err(err),
                None => Ok(0),
            }
        }
    }

    impl ByteSink for Script {
        fn write_once(&mut self, buf: &[u8]) -> Result<usize> {
            self.calls += 1;
            match self.accepts.pop_front() {
                Some(Ok(n)) => {
                    let n = n.min(buf.len());
                    self.written.extend_from_slice(&buf[..n]);
                    Ok(n)
                }
                Some(Err(err)) => Err(err),
                None => {
                    self.written.extend_from_slice(buf);
                    Ok(buf.len())
                }
            }
        }
    }

    #[test]
    fn read_exactly_collects_chunks() {
        let mut src = Script {
            reads: VecDeque::from([Ok(b"he".to_vec()), Ok(b"l".to_vec()), Ok(b"lo".to_vec())]),
            ..Script::default()
        };
        let mut buf = [0u8; 5];

        assert_eq!(read_exactly(&mut src, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(src.calls, 3);
    }

    #[test]
    fn read_exactly_empty_request_is_a_no_op() {
        let mut src = Script::default();
        let mut buf = [0u8; 0];

        assert_eq!(read_exactly(&mut src, &mut buf).unwrap(), 0);
        assert_eq!(src.calls, 0);
    }

    #[test]
    fn read_exactly_stops_at_zero_pass_with_partial_count() {
        let mut src = Script {
            reads: VecDeque::from([Ok(b"ab".to_vec()), Ok(Vec::new()), Ok(b"cd".to_vec())]),
            ..Script::default()
        };
        let mut buf = [0u8; 4];

        assert_eq!(read_exactly(&mut src, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ab");
        assert_eq!(src.reads.len(), 1, "must not read past the zero pass");
    }

    #[test]
    fn read_exactly_surfaces_timeout_after_progress() {
        let mut src = Script {
            reads: VecDeque::from([Ok(b"ab".to_vec()), Err(FrameError::ReadTimeout)]),
            ..Script::default()
        };
        let mut buf = [0u8; 4];

        let err = read_exactly(&mut src, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::ReadTimeout));
    }

    #[test]
    fn write_exactly_resumes_short_writes() {
        let mut sink = Script {
            accepts: VecDeque::from([Ok(2), Ok(1)]),
            ..Script::default()
        };

        assert_eq!(write_exactly(&mut sink, b"abcdef").unwrap(), 6);
        assert_eq!(sink.written, b"abcdef");
        assert_eq!(sink.calls, 3);
    }

    #[test]
    fn write_exactly_stops_at_zero_pass() {
        let mut sink = Script {
            accepts: VecDeque::from([Ok(3), Ok(0)]),
            ..Script::default()
        };

        assert_eq!(write_exactly(&mut sink, b"abcdef").unwrap(), 3);
        assert_eq!(sink.written, b"abc");
    }

    #[test]
    fn write_exactly_surfaces_timeout() {
        let mut sink = Script {
            accepts: VecDeque::from([Ok(1), Err(FrameError::WriteTimeout)]),
            ..Script::default()
        };

        let err = write_exactly(&mut sink, b"abc").unwrap_err();
        assert!(matches!(err, FrameError::WriteTimeout));
    }

    #[test]
    fn write_exactly_empty_request_is_a_no_op() {
        let mut sink = Script::default();
        assert_eq!(write_exactly(&mut sink, b"").unwrap(), 0);
        assert_eq!(sink.calls, 0);
    }
}
