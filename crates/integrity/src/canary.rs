//! Guard canaries
//!
//! A guard region is [`CANARY_WIDTH`] bytes filled with repeated copies of a
//! canonical pattern. The pattern is the digest of [`CANARY_SENTINEL`], so it
//! is as unpredictable as the salt. The guard width is not a multiple of the
//! digest width, so the last copy of the pattern is partial.

use core::fmt;

use crate::hash::{DIGEST_WIDTH, Digest};

/// Width of one guard region in bytes.
pub const CANARY_WIDTH: usize = 20;

/// Value hashed to derive the canonical canary pattern.
pub const CANARY_SENTINEL: u64 = 0xBAAD_F00D_DEAD_C0DE;

/// One guard region.
pub type Guard = [u8; CANARY_WIDTH];

/// Canonical canary pattern for one integrity instance.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CanaryPattern([u8; DIGEST_WIDTH]);

impl CanaryPattern {
    pub(crate) const fn from_digest(digest: Digest) -> Self {
        Self(digest.to_le_bytes())
    }

    /// Pattern bytes, one digest wide.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_WIDTH] {
        &self.0
    }

    /// Fills `dst` with repeated copies of the pattern, the tail copy cut short.
    pub fn fill(&self, dst: &mut [u8]) {
        let mut chunks = dst.chunks_exact_mut(DIGEST_WIDTH);
        for chunk in &mut chunks {
            chunk.copy_from_slice(&self.0);
        }
        let tail = chunks.into_remainder();
        let len = tail.len();
        tail.copy_from_slice(&self.0[..len]);
    }

    /// Whether `src` holds exactly what [`fill`](Self::fill) would write.
    #[must_use]
    pub fn matches(&self, src: &[u8]) -> bool {
        let mut chunks = src.chunks_exact(DIGEST_WIDTH);
        let body = chunks.by_ref().all(|chunk| chunk == self.0);
        let tail = chunks.remainder();
        body && tail == &self.0[..tail.len()]
    }

    /// A guard region stamped with this pattern.
    #[must_use]
    pub fn guard(&self) -> Guard {
        let mut guard = [0; CANARY_WIDTH];
        self.fill(&mut guard);
        guard
    }
}

impl fmt::Debug for CanaryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CanaryPattern(<redacted>)")
    }
}

impl fmt::Display for CanaryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
