//! Check-byte strategies.
//!
//! Deployed peers emit a constant placeholder byte and never verify it, so
//! [`Placeholder`] is the default. A real LRC/CRC plugs in by implementing
//! [`ChecksumPolicy`]; both ends must agree on it.

use std::fmt;

/// Produces and verifies the CHECK byte of a record.
pub trait ChecksumPolicy: fmt::Debug + Send + Sync {
    /// The check byte to emit after `payload`.
    fn compute(&self, payload: &[u8]) -> u8;

    /// Whether `check` is acceptable for `payload`.
    fn verify(&self, payload: &[u8], check: u8) -> bool {
        self.compute(payload) == check
    }
}

/// Emits [`Placeholder::BYTE`] and accepts any received check byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct Placeholder;

impl Placeholder {
    pub const BYTE: u8 = b'a';
}

impl ChecksumPolicy for Placeholder {
    fn compute(&self, _payload: &[u8]) -> u8 {
        Self::BYTE
    }

    fn verify(&self, _payload: &[u8], _check: u8) -> bool {
        true
    }
}
