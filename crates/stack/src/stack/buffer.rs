//! Payload storage with optional guard regions
//!
//! Layout: `[leading guard | payload | trailing guard]`, guards present only
//! when canaries are enabled. All growth goes through a fallible reservation
//! first, so a failed resize leaves the buffer untouched.

use warden_integrity::{CANARY_WIDTH, Guard, Integrity};

pub(crate) struct GuardedBuffer {
    bytes: Vec<u8>,
    guarded: bool,
}

impl GuardedBuffer {
    /// Zeroed payload of `payload_len` bytes. `Err` carries the byte count
    /// that could not be obtained.
    pub(crate) fn allocate(payload_len: usize, guarded: bool) -> Result<Self, usize> {
        let guard_len = if guarded { CANARY_WIDTH } else { 0 };
        let total = payload_len
            .checked_add(2 * guard_len)
            .ok_or(usize::MAX)?;

        let mut bytes = Vec::new();
        bytes.try_reserve_exact(total).map_err(|_| total)?;
        bytes.resize(total, 0);
        Ok(Self { bytes, guarded })
    }

    pub(crate) const fn is_guarded(&self) -> bool {
        self.guarded
    }

    const fn guard_len(&self) -> usize {
        if self.guarded { CANARY_WIDTH } else { 0 }
    }

    pub(crate) fn payload_len(&self) -> usize {
        self.bytes.len() - 2 * self.guard_len()
    }

    /// Whole allocation, guards included
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn payload(&self) -> &[u8] {
        let guard = self.guard_len();
        &self.bytes[guard..self.bytes.len() - guard]
    }

    pub(crate) fn payload_mut(&mut self) -> &mut [u8] {
        let guard = self.guard_len();
        let end = self.bytes.len() - guard;
        &mut self.bytes[guard..end]
    }

    pub(crate) fn leading_guard(&self) -> Option<&Guard> {
        if self.guarded {
            self.bytes.first_chunk::<CANARY_WIDTH>()
        } else {
            None
        }
    }

    pub(crate) fn trailing_guard(&self) -> Option<&Guard> {
        if self.guarded {
            self.bytes.last_chunk::<CANARY_WIDTH>()
        } else {
            None
        }
    }

    #[cfg(any(test, feature = "fault-injection"))]
    pub(crate) fn leading_guard_mut(&mut self) -> Option<&mut Guard> {
        if self.guarded {
            self.bytes.first_chunk_mut::<CANARY_WIDTH>()
        } else {
            None
        }
    }

    #[cfg(any(test, feature = "fault-injection"))]
    pub(crate) fn trailing_guard_mut(&mut self) -> Option<&mut Guard> {
        if self.guarded {
            self.bytes.last_chunk_mut::<CANARY_WIDTH>()
        } else {
            None
        }
    }

    /// Stamps both guard regions; no-op for an unguarded buffer.
    pub(crate) fn stamp_guards(&mut self, integrity: &Integrity) {
        if !self.guarded {
            return;
        }
        if let Some(guard) = self.bytes.first_chunk_mut::<CANARY_WIDTH>() {
            integrity.place_canary(guard);
        }
        if let Some(guard) = self.bytes.last_chunk_mut::<CANARY_WIDTH>() {
            integrity.place_canary(guard);
        }
    }

    /// Changes the payload to `new_len` bytes. Surviving payload bytes keep
    /// their values, new ones are zero, and the trailing guard is left zeroed
    /// for the caller to re-stamp. On `Err` nothing has changed.
    pub(crate) fn resize_payload(&mut self, new_len: usize) -> Result<(), usize> {
        let guard = self.guard_len();
        let old_len = self.payload_len();
        let total = new_len.checked_add(2 * guard).ok_or(usize::MAX)?;

        if total > self.bytes.len() {
            self.bytes
                .try_reserve_exact(total - self.bytes.len())
                .map_err(|_| total)?;
        }

        self.bytes.truncate(guard + old_len.min(new_len));
        self.bytes.resize(total, 0);
        if new_len < old_len {
            self.bytes.shrink_to_fit();
        }
        Ok(())
    }
}
