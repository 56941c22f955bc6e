//! Per-instance hash salt

use core::fmt;

/// Value XOR-mixed into every digest.
///
/// A random salt keeps digests from being precomputed. Tests pin it with
/// [`Salt::fixed`] to get reproducible digests.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Salt(u64);

impl Salt {
    /// Draws a fresh salt from the thread-local RNG.
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random::<u64>())
    }

    /// A caller-chosen salt.
    #[must_use]
    pub const fn fixed(value: u64) -> Self {
        Self(value)
    }

    /// Raw salt value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

// The salt is the only secret in the scheme, keep it out of logs.
impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}
