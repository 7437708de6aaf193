//! Record-oriented channel over a serial port.
//!
//! [`Channel`] composes a raw serial handle, exact-count I/O and the record
//! codec into the one object an application talks to. It owns the handle and
//! the per-direction deadlines; every method takes `&mut self`, so calls on a
//! channel are serialized by its owner.

pub mod channel;
pub mod error;

pub use channel::Channel;
pub use error::{ChannelError, Result};
