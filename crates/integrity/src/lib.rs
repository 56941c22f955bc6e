//! # warden-integrity
//!
//! Corruption-detection primitives used by `warden-stack`:
//! - a salted rolling hash over arbitrary byte ranges ([`Integrity::hash`])
//! - guard canaries stamped around a buffer ([`Integrity::place_canary`],
//!   [`Integrity::check_canary`])
//!
//! Everything hangs off an explicitly constructed [`Integrity`] value rather
//! than process-wide state, so tests can pin the salt:
//!
//! ```
//! use warden_integrity::{CANARY_WIDTH, Integrity, Salt};
//!
//! let integrity = Integrity::new(Salt::fixed(0x5eed));
//! let digest = integrity.hash(b"payload");
//! assert!(integrity.verify(digest, b"payload"));
//!
//! let mut guard = [0u8; CANARY_WIDTH];
//! integrity.place_canary(&mut guard);
//! assert!(integrity.check_canary(&guard));
//! ```
//!
//! This deters accidental corruption only. Anyone able to read the guard
//! bytes can forge them.

#![warn(rust_2018_idioms)]

use core::fmt;
use std::cell::Cell;

pub mod canary;
pub mod hash;
pub mod salt;

pub use canary::{CANARY_SENTINEL, CANARY_WIDTH, CanaryPattern, Guard};
pub use hash::{DIGEST_WIDTH, Digest, IntegrityHasher};
pub use salt::Salt;

thread_local! {
    static THREAD_DEFAULT: Cell<Option<Integrity>> = const { Cell::new(None) };
}

/// Hash salt plus the canary pattern derived from it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Integrity {
    salt: Salt,
    scramble: bool,
    pattern: CanaryPattern,
}

impl Integrity {
    /// Integrity with the scramble step enabled.
    #[must_use]
    pub fn new(salt: Salt) -> Self {
        Self::with_scramble(salt, true)
    }

    /// Integrity with the scramble step switched on or off.
    #[must_use]
    pub fn with_scramble(salt: Salt, scramble: bool) -> Self {
        let mut hasher = IntegrityHasher::new(salt, scramble);
        hasher.write_u64(CANARY_SENTINEL);
        Self {
            salt,
            scramble,
            pattern: CanaryPattern::from_digest(hasher.finish()),
        }
    }

    /// Integrity with a freshly drawn salt.
    #[must_use]
    pub fn random() -> Self {
        Self::new(Salt::random())
    }

    /// The calling thread's integrity instance, salted once on first use.
    ///
    /// Stable for the life of the thread, so buffers stamped through it keep
    /// verifying. Inject an explicit instance when determinism matters.
    #[must_use]
    pub fn thread_default() -> Self {
        THREAD_DEFAULT.with(|slot| {
            if let Some(integrity) = slot.get() {
                integrity
            } else {
                let integrity = Self::random();
                slot.set(Some(integrity));
                integrity
            }
        })
    }

    /// Starts an incremental hash.
    #[must_use]
    pub const fn hasher(&self) -> IntegrityHasher {
        IntegrityHasher::new(self.salt, self.scramble)
    }

    /// Digest of `bytes`. O(len), never allocates.
    #[must_use]
    pub fn hash(&self, bytes: &[u8]) -> Digest {
        self.hasher().update(bytes).finish()
    }

    /// Recomputes the digest of `bytes` and compares it with `expected`.
    #[must_use]
    pub fn verify(&self, expected: Digest, bytes: &[u8]) -> bool {
        self.hash(bytes) == expected
    }

    /// Stamps the canonical pattern into a guard region.
    pub fn place_canary(&self, dst: &mut Guard) {
        self.pattern.fill(dst);
    }

    /// Whether a guard region still holds the canonical pattern.
    #[must_use]
    pub fn check_canary(&self, guard: &Guard) -> bool {
        self.pattern.matches(guard)
    }

    /// What an intact guard region looks like.
    #[must_use]
    pub fn expected_guard(&self) -> Guard {
        self.pattern.guard()
    }

    #[must_use]
    pub const fn canary_pattern(&self) -> CanaryPattern {
        self.pattern
    }

    #[must_use]
    pub const fn scrambles(&self) -> bool {
        self.scramble
    }
}

impl fmt::Debug for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Integrity")
            .field("scramble", &self.scramble)
            .finish_non_exhaustive()
    }
}
