//! Salted rolling hash
//!
//! The digest is the classic `31 * h + byte` polynomial accumulator, with an
//! optional per-byte scramble step, XOR-mixed with the [`Salt`] at the end.
//! Two instances with different salts never agree on a digest, so digests
//! must not be persisted or compared across processes.

use core::fmt;

use crate::Salt;

/// Polynomial multiplier of the rolling accumulator.
pub const MULTIPLIER: u64 = 31;

/// Width of a [`Digest`] in bytes.
pub const DIGEST_WIDTH: usize = core::mem::size_of::<u64>();

/// Result of hashing a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Digest(u64);

impl Digest {
    /// Wraps a raw digest value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw digest value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Little-endian bytes of the digest.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; DIGEST_WIDTH] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

impl fmt::LowerHex for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Incremental form of the integrity hash.
///
/// Feeding the same bytes through any split of `update` calls yields the
/// same digest as hashing them in one go. Nothing here allocates.
///
/// ```
/// use warden_integrity::{Integrity, Salt};
///
/// let integrity = Integrity::new(Salt::fixed(7));
/// let mut hasher = integrity.hasher();
/// hasher.update(b"war").update(b"den");
/// assert_eq!(hasher.finish(), integrity.hash(b"warden"));
/// ```
#[derive(Debug, Clone)]
pub struct IntegrityHasher {
    state: u64,
    salt: u64,
    scramble: bool,
}

impl IntegrityHasher {
    pub(crate) const fn new(salt: Salt, scramble: bool) -> Self {
        Self {
            state: 0,
            salt: salt.get(),
            scramble,
        }
    }

    /// Feeds a byte range into the accumulator.
    #[inline]
    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        let mut state = self.state;
        if self.scramble {
            for &byte in bytes {
                state = scramble(
                    state
                        .wrapping_mul(MULTIPLIER)
                        .wrapping_add(u64::from(byte)),
                );
            }
        } else {
            for &byte in bytes {
                state = state
                    .wrapping_mul(MULTIPLIER)
                    .wrapping_add(u64::from(byte));
            }
        }
        self.state = state;
        self
    }

    /// Feeds a `usize` as its little-endian bytes.
    #[inline]
    pub fn write_usize(&mut self, value: usize) -> &mut Self {
        self.update(&value.to_le_bytes())
    }

    /// Feeds a `u64` as its little-endian bytes.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.update(&value.to_le_bytes())
    }

    /// Mixes in the salt and returns the digest. The hasher stays usable.
    #[must_use]
    pub fn finish(&self) -> Digest {
        Digest(self.state ^ self.salt)
    }
}

#[inline(always)]
const fn scramble(x: u64) -> u64 {
    (x ^ (x >> 29)).rotate_left(7)
}
