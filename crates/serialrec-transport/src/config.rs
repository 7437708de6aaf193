//! Line settings and per-direction deadlines.
//!
//! The enumerations are `#[non_exhaustive]`: only the values the protocol has
//! been deployed with are modeled today, and adding more never touches the
//! wire format.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::traits::Direction;

/// Supported line speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[non_exhaustive]
pub enum BaudRate {
    #[default]
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    /// All supported rates, slowest first.
    pub const ALL: [BaudRate; 5] = [
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    /// Bits per second.
    pub fn bps(self) -> u32 {
        match self {
            BaudRate::B9600 => 9_600,
            BaudRate::B19200 => 19_200,
            BaudRate::B38400 => 38_400,
            BaudRate::B57600 => 57_600,
            BaudRate::B115200 => 115_200,
        }
    }

    /// Look up a supported rate.
    pub fn from_bps(bps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|rate| rate.bps() == bps)
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = String;

    fn try_from(bps: u32) -> Result<Self, Self::Error> {
        Self::from_bps(bps).ok_or_else(|| format!("unsupported baud rate {bps}"))
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.bps()
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bps())
    }
}

/// Bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[non_exhaustive]
pub enum DataBits {
    #[default]
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            8 => Ok(DataBits::Eight),
            other => Err(format!("unsupported data bits {other}")),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Eight => 8,
        }
    }
}

/// Parity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Parity {
    #[default]
    None,
}

/// Stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[non_exhaustive]
pub enum StopBits {
    #[default]
    One,
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(StopBits::One),
            other => Err(format!("unsupported stop bits {other}")),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => 1,
        }
    }
}

/// Line settings applied to a port. Defaults to 9600 8N1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub baud_rate: BaudRate,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl ChannelConfig {
    /// 8N1 at the given rate.
    pub fn with_baud_rate(baud_rate: BaudRate) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }
}

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
        };
        write!(
            f,
            "{} {}{}{}",
            self.baud_rate,
            u8::from(self.data_bits),
            parity,
            u8::from(self.stop_bits)
        )
    }
}

/// How long a raw operation may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deadline {
    /// Block until data arrives (or drains).
    #[default]
    Forever,
    /// Return immediately with whatever is available.
    NonBlocking,
    /// Wait at most this long.
    Bounded(Duration),
}

impl Deadline {
    /// Map a seconds value: negative blocks forever, zero never blocks,
    /// positive waits that many seconds.
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            s if s < 0 => Deadline::Forever,
            0 => Deadline::NonBlocking,
            s => Deadline::Bounded(Duration::from_secs(s.unsigned_abs())),
        }
    }

    /// Whether a zero-byte result under this deadline counts as a timeout.
    pub fn blocks(self) -> bool {
        !matches!(self, Deadline::NonBlocking)
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deadline::Forever => f.write_str("forever"),
            Deadline::NonBlocking => f.write_str("non-blocking"),
            Deadline::Bounded(d) => write!(f, "{d:?}"),
        }
    }
}

/// Read and write deadlines of one channel.
///
/// The blocking-mode flags are derived from these; they change only through
/// [`IoDeadlines::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IoDeadlines {
    pub read: Deadline,
    pub write: Deadline,
}

impl IoDeadlines {
    pub fn set(&mut self, direction: Direction, deadline: Deadline) {
        if direction.includes_read() {
            self.read = deadline;
        }
        if direction.includes_write() {
            self.write = deadline;
        }
    }

    pub fn read_blocks(&self) -> bool {
        self.read.blocks()
    }

    pub fn write_blocks(&self) -> bool {
        self.write.blocks()
    }
}
