use std::sync::Arc;

use bytes::Bytes;
use serialrec_frame::{
    read_exactly, read_record, read_record_into, write_exactly, write_record, ByteSink,
    ByteSource, ChecksumPolicy, FrameError, Link, Placeholder,
};
use serialrec_transport::{
    ChannelConfig, Deadline, Direction, IoDeadlines, RawChannel, SerialTransport,
};
use tracing::{debug, info, warn};

use crate::error::{ChannelError, Result};

/// A record-oriented serial channel.
///
/// A freshly opened channel blocks forever in both directions. Deadlines set
/// through [`Channel::set_deadline`] and friends take effect on the next call.
///
/// The channel is not internally synchronized: share it across threads only
/// behind the caller's own lock, and close it only after in-flight calls
/// have returned.
pub struct Channel<T: RawChannel = SerialTransport> {
    link: Link<T>,
    checksum: Arc<dyn ChecksumPolicy>,
    config: Option<ChannelConfig>,
    open: bool,
}

impl Channel<SerialTransport> {
    /// Open a serial port (`"COM3"`, `"/dev/ttyUSB0"`) with its current line
    /// settings.
    pub fn open(port: &str) -> Result<Self> {
        let transport =
            SerialTransport::open(port).map_err(|source| ChannelError::OpenFailure {
                port: port.to_string(),
                source,
            })?;
        Ok(Self::from_raw(transport))
    }

    /// Open a serial port and apply `config`.
    pub fn open_with_config(port: &str, config: &ChannelConfig) -> Result<Self> {
        let mut channel = Self::open(port)?;
        channel.set(config)?;
        Ok(channel)
    }
}

impl<T: RawChannel> Channel<T> {
    /// Wrap an already open raw channel. Both directions block forever.
    pub fn from_raw(inner: T) -> Self {
        Self {
            link: Link::new(inner),
            checksum: Arc::new(Placeholder),
            config: None,
            open: true,
        }
    }

    /// Replace the checksum policy, builder style.
    pub fn with_checksum(mut self, checksum: impl ChecksumPolicy + 'static) -> Self {
        self.set_checksum(checksum);
        self
    }

    /// Replace the checksum policy used for subsequent records.
    pub fn set_checksum(&mut self, checksum: impl ChecksumPolicy + 'static) {
        debug!(?checksum, "checksum policy replaced");
        self.checksum = Arc::new(checksum);
    }

    /// Single read pass.
    ///
    /// With a blocking read deadline, no data is `ReadTimeout`; otherwise it
    /// is `Ok(0)`.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        Ok(self.link()?.read_once(out)?)
    }

    /// Single write pass, the mirror of [`Channel::read`].
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(self.link()?.write_once(buf)?)
    }

    /// Read exactly `n` bytes into the front of `out`, or fewer if the line
    /// runs dry first.
    pub fn readn(&mut self, out: &mut [u8], n: usize) -> Result<usize> {
        let capacity = out.len();
        let dst = out
            .get_mut(..n)
            .ok_or(FrameError::BufferTooSmall { needed: n, capacity })?;
        Ok(read_exactly(self.link()?, dst)?)
    }

    /// Write exactly the first `n` bytes of `buf`, or fewer if the line stops
    /// draining first.
    pub fn writen(&mut self, buf: &[u8], n: usize) -> Result<usize> {
        let src = buf.get(..n).ok_or(FrameError::BufferTooSmall {
            needed: n,
            capacity: buf.len(),
        })?;
        Ok(write_exactly(self.link()?, src)?)
    }

    /// Read one record into `out` and return the payload length.
    pub fn read_record(&mut self, out: &mut [u8]) -> Result<usize> {
        let (link, checksum) = self.parts()?;
        Ok(read_record_into(link, checksum, out)?)
    }

    /// Read one record and return its payload.
    pub fn recv_record(&mut self) -> Result<Bytes> {
        let (link, checksum) = self.parts()?;
        Ok(read_record(link, checksum)?)
    }

    /// Write one record and return the payload length.
    pub fn write_record(&mut self, payload: &[u8]) -> Result<usize> {
        let (link, checksum) = self.parts()?;
        Ok(write_record(link, checksum, payload)?)
    }

    /// Apply line settings.
    pub fn set(&mut self, config: &ChannelConfig) -> Result<()> {
        self.link()?
            .get_mut()
            .configure(config)
            .map_err(ChannelError::ConfigureFailure)?;
        self.config = Some(*config);
        debug!(%config, "line settings applied");
        Ok(())
    }

    /// Set both the read and write deadline.
    pub fn set_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.apply_deadline(Direction::Both, deadline)
    }

    /// Set the read deadline.
    pub fn set_read_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.apply_deadline(Direction::Read, deadline)
    }

    /// Set the write deadline.
    pub fn set_write_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.apply_deadline(Direction::Write, deadline)
    }

    /// Current deadlines, or `None` once closed.
    pub fn deadlines(&self) -> Option<IoDeadlines> {
        self.open.then(|| self.link.deadlines())
    }

    /// Line settings last applied through [`Channel::set`].
    pub fn config(&self) -> Option<ChannelConfig> {
        self.config
    }

    pub fn is_closed(&self) -> bool {
        !self.open
    }

    /// Borrow the underlying raw channel.
    pub fn get_ref(&self) -> &T {
        self.link.get_ref()
    }

    /// Mutably borrow the underlying raw channel.
    pub fn get_mut(&mut self) -> &mut T {
        self.link.get_mut()
    }

    /// Release the handle.
    ///
    /// The channel is unusable afterwards even if the release reports an
    /// error. Closing an already closed channel is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.link
            .get_mut()
            .close()
            .map_err(ChannelError::CloseFailure)?;
        info!("channel closed");
        Ok(())
    }

    fn apply_deadline(&mut self, direction: Direction, deadline: Deadline) -> Result<()> {
        self.link()?
            .set_deadline(direction, deadline)
            .map_err(ChannelError::ConfigureFailure)?;
        debug!(?direction, %deadline, "deadline set");
        Ok(())
    }

    fn link(&mut self) -> Result<&mut Link<T>> {
        if !self.open {
            return Err(ChannelError::Closed);
        }
        Ok(&mut self.link)
    }

    fn parts(&mut self) -> Result<(&mut Link<T>, &dyn ChecksumPolicy)> {
        if !self.open {
            return Err(ChannelError::Closed);
        }
        Ok((&mut self.link, &*self.checksum))
    }
}

impl<T: RawChannel> Drop for Channel<T> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(%err, "failed to close channel on drop");
        }
    }
}

impl<T: RawChannel + std::fmt::Debug> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("inner", self.link.get_ref())
            .field("deadlines", &self.link.deadlines())
            .field("checksum", &self.checksum)
            .field("open", &self.open)
            .finish()
    }
}
