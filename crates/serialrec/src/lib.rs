//! Framed STX/ETX records over serial ports.
//!
//! serialrec turns a byte-oriented serial line into a record-oriented one.
//! Each record is `STX | LEN (2B BE) | payload | ETX | CHECK`.
//!
//! # Crate Structure
//!
//! - [`transport`]: Raw serial channel abstraction, line settings, deadlines
//! - [`frame`]: Exact-count I/O and the record codec
//! - [`channel`]: The [`Channel`](channel::Channel) facade applications use

/// Re-export transport types.
pub mod transport {
    pub use serialrec_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serialrec_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use serialrec_channel::*;
}
