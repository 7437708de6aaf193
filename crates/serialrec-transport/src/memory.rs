//! In-process loopback channel.
//!
//! `MemoryChannel` behaves like a serial line whose far end is a byte queue:
//! a raw read returns whatever is queued (at most `read_chunk` bytes) and `0`
//! once the queue is empty, the same result a real port gives when its
//! deadline elapses. [`MemoryChannel::pair`] cross-wires two ends so one
//! side's writes become the other's reads.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::config::{ChannelConfig, Deadline, IoDeadlines};
use crate::error::{Result, TransportError};
use crate::traits::{Direction, RawChannel};

type Queue = Arc<Mutex<VecDeque<u8>>>;

#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    read: bool,
    write: bool,
    configure: bool,
    close: bool,
}

/// A [`RawChannel`] backed by shared in-memory queues.
#[derive(Debug)]
pub struct MemoryChannel {
    inbound: Queue,
    outbound: Queue,
    read_chunk: Option<usize>,
    write_chunk: Option<usize>,
    write_capacity: Option<usize>,
    faults: Faults,
    config: Option<ChannelConfig>,
    deadlines: IoDeadlines,
    closed: bool,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChannel {
    /// A channel with empty, unconnected queues.
    pub fn new() -> Self {
        Self::with_queues(Queue::default(), Queue::default())
    }

    /// A channel whose far end has already sent `bytes`.
    pub fn with_inbound(bytes: &[u8]) -> Self {
        let channel = Self::new();
        channel.feed(bytes);
        channel
    }

    /// Two ends of one line: what `a` writes, `b` reads, and vice versa.
    pub fn pair() -> (Self, Self) {
        let a_to_b = Queue::default();
        let b_to_a = Queue::default();
        (
            Self::with_queues(Arc::clone(&b_to_a), Arc::clone(&a_to_b)),
            Self::with_queues(a_to_b, b_to_a),
        )
    }

    fn with_queues(inbound: Queue, outbound: Queue) -> Self {
        Self {
            inbound,
            outbound,
            read_chunk: None,
            write_chunk: None,
            write_capacity: None,
            faults: Faults::default(),
            config: None,
            deadlines: IoDeadlines::default(),
            closed: false,
        }
    }

    /// Deliver at most `n` bytes per raw read.
    pub fn read_chunk(mut self, n: usize) -> Self {
        self.read_chunk = Some(n);
        self
    }

    /// Accept at most `n` bytes per raw write.
    pub fn write_chunk(mut self, n: usize) -> Self {
        self.write_chunk = Some(n);
        self
    }

    /// Stop accepting writes after `n` bytes in total (the peer stops draining).
    pub fn write_capacity(mut self, n: usize) -> Self {
        self.write_capacity = Some(n);
        self
    }

    /// Make every raw read fail.
    pub fn fail_reads(mut self) -> Self {
        self.faults.read = true;
        self
    }

    /// Make every raw write fail.
    pub fn fail_writes(mut self) -> Self {
        self.faults.write = true;
        self
    }

    /// Reject line settings.
    pub fn fail_configure(mut self) -> Self {
        self.faults.configure = true;
        self
    }

    /// Fail to release the handle.
    pub fn fail_close(mut self) -> Self {
        self.faults.close = true;
        self
    }

    /// Queue bytes as if the far end had sent them.
    pub fn feed(&self, bytes: &[u8]) {
        lock(&self.inbound).extend(bytes.iter().copied());
    }

    /// Drain everything written so far.
    pub fn take_written(&self) -> Vec<u8> {
        lock(&self.outbound).drain(..).collect()
    }

    /// Bytes queued for reading that have not been consumed.
    pub fn pending(&self) -> usize {
        lock(&self.inbound).len()
    }

    /// Last line settings applied, if any.
    pub fn config(&self) -> Option<ChannelConfig> {
        self.config
    }

    /// Deadlines most recently set.
    pub fn deadlines(&self) -> IoDeadlines {
        self.deadlines
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

impl RawChannel for MemoryChannel {
    fn raw_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if self.faults.read {
            return Err(injected("read"));
        }

        let mut inbound = lock(&self.inbound);
        let limit = self.read_chunk.unwrap_or(usize::MAX);
        let n = buf.len().min(inbound.len()).min(limit);
        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..n)) {
            *slot = byte;
        }
        trace!(n, "memory read");
        Ok(n)
    }

    fn raw_write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        if self.faults.write {
            return Err(injected("write"));
        }

        let mut n = buf.len().min(self.write_chunk.unwrap_or(usize::MAX));
        if let Some(capacity) = self.write_capacity.as_mut() {
            n = n.min(*capacity);
            *capacity -= n;
        }
        lock(&self.outbound).extend(buf.iter().take(n).copied());
        trace!(n, "memory write");
        Ok(n)
    }

    fn configure(&mut self, config: &ChannelConfig) -> Result<()> {
        self.ensure_open()?;
        if self.faults.configure {
            return Err(TransportError::Configure(format!(
                "line settings {config} rejected"
            )));
        }
        self.config = Some(*config);
        Ok(())
    }

    fn set_timeouts(&mut self, direction: Direction, deadline: Deadline) -> Result<()> {
        self.ensure_open()?;
        if self.faults.configure {
            return Err(TransportError::Configure(format!(
                "deadline {deadline} rejected"
            )));
        }
        self.deadlines.set(direction, deadline);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        if self.faults.close {
            return Err(injected("close"));
        }
        Ok(())
    }
}

fn lock(queue: &Mutex<VecDeque<u8>>) -> MutexGuard<'_, VecDeque<u8>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

fn injected(op: &str) -> TransportError {
    TransportError::Io(std::io::Error::other(format!("injected {op} fault")))
}
