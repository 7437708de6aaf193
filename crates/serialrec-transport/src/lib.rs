//! Raw serial channel abstraction.
//!
//! This is the lowest layer of serialrec. It models the serial port as a
//! collaborator with five primitives (raw read, raw write, configure, set
//! timeouts, close) behind the [`RawChannel`] trait:
//! - [`SerialTransport`] drives a real port through the `serialport` crate
//! - [`MemoryChannel`] is an in-process loopback for tests and demos
//!
//! Framing and exact-count I/O live in `serialrec-frame`.

pub mod config;
pub mod error;
pub mod memory;
pub mod serial;
pub mod traits;

pub use config::{BaudRate, ChannelConfig, DataBits, Deadline, IoDeadlines, Parity, StopBits};
pub use error::{Result, TransportError};
pub use memory::MemoryChannel;
pub use serial::{available_ports, port_name, PortSummary, SerialTransport};
pub use traits::{Direction, RawChannel};
