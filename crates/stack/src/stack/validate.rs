//! Consistency checks and checksum stamping

use std::panic::Location;

use warden_integrity::Digest;

use super::RawStack;
use crate::error::{PayloadRegion, StackError, StackResult};

#[cfg(feature = "logging")]
use tracing::warn;

/// Validates a stack reached through an optional handle.
///
/// A missing handle is [`StackError::NullHandle`]; otherwise this is
/// [`RawStack::validate`].
pub fn validate_handle(stack: Option<&mut RawStack>) -> StackResult<()> {
    match stack {
        Some(stack) => stack.validate(),
        None => Err(StackError::NullHandle),
    }
}

impl RawStack {
    /// Runs every consistency check and records the first failure.
    ///
    /// Order, first failure wins:
    /// 1. metadata checksum (a mismatch means no field can be trusted)
    /// 2. the sticky error, if one is already recorded
    /// 3. buffer presence
    /// 4. payload checksum
    /// 5. leading, then trailing canary
    /// 6. zero element width, base capacity, capacity; capacity versus
    ///    allocated bytes
    /// 7. `size <= capacity`
    ///
    /// Queries never escalate, whatever the [`ErrorPolicy`](crate::ErrorPolicy).
    pub fn validate(&mut self) -> StackResult<()> {
        self.diagnose().inspect_err(|&err| self.record(err))
    }

    /// Current error, re-validated. Never a stale `None` for a corrupt stack.
    pub fn error_state(&mut self) -> Option<StackError> {
        self.validate().err()
    }

    /// Validates and, on failure, dumps to the configured sink, destroys the
    /// stack and terminates: abort under [`ErrorPolicy::Abort`], panic
    /// otherwise.
    ///
    /// [`ErrorPolicy::Abort`]: crate::ErrorPolicy::Abort
    #[track_caller]
    pub fn assert_valid(&mut self) {
        let location = Location::caller();
        if let Err(err) = self.diagnose() {
            self.record(err);
            self.fatal(err, location);
        }
    }

    /// Validation with the error policy applied.
    pub(super) fn check(&mut self, location: &'static Location<'static>) -> StackResult<()> {
        match self.diagnose() {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fail(err, location)),
        }
    }

    fn diagnose(&self) -> StackResult<()> {
        let protection = self.config.protection;

        if protection.checksums {
            let actual = self.compute_metadata_checksum();
            if actual != self.metadata_checksum {
                return Err(StackError::corrupt_metadata(self.metadata_checksum, actual));
            }
        }

        if let Some(err) = self.error {
            return Err(err);
        }

        let Some(buffer) = self.buffer.as_ref() else {
            return Err(StackError::NullBuffer);
        };

        if protection.checksums
            && !self
                .config
                .integrity
                .verify(self.payload_checksum, buffer.as_bytes())
        {
            return Err(StackError::corrupt_payload(PayloadRegion::Checksum));
        }

        if buffer.is_guarded() {
            let integrity = &self.config.integrity;
            if !buffer
                .leading_guard()
                .is_some_and(|guard| integrity.check_canary(guard))
            {
                return Err(StackError::corrupt_payload(PayloadRegion::LeadingCanary));
            }
            if !buffer
                .trailing_guard()
                .is_some_and(|guard| integrity.check_canary(guard))
            {
                return Err(StackError::corrupt_payload(PayloadRegion::TrailingCanary));
            }
        }

        if self.element_width == 0 {
            return Err(StackError::ZeroElementWidth);
        }
        if self.base_capacity == 0 {
            return Err(StackError::ZeroBaseCapacity);
        }
        if self.capacity == 0 {
            return Err(StackError::ZeroCapacity);
        }
        let allocated = buffer.payload_len();
        if self.capacity.checked_mul(self.element_width) != Some(allocated) {
            return Err(StackError::CapacityMismatch {
                capacity: self.capacity,
                allocated,
            });
        }

        if self.size > self.capacity {
            return Err(StackError::SizeExceedsCapacity {
                size: self.size,
                capacity: self.capacity,
            });
        }

        Ok(())
    }

    /// Makes `err` the sticky error unless one is already recorded.
    pub(super) fn record(&mut self, err: StackError) {
        if !err.is_sticky() || self.error.is_some() {
            return;
        }

        #[cfg(feature = "logging")]
        {
            if !err.is_corruption() {
                warn!(code = err.code(), %err, "stack error recorded");
            }
        }

        self.error = Some(err);
        // A corrupt header stays corrupt: re-stamping would launder it.
        if !matches!(err, StackError::CorruptMetadata { .. }) {
            self.restamp_metadata();
        }
    }

    /// Recomputes both checksums after a legitimate mutation.
    pub(super) fn restamp(&mut self) {
        if !self.config.protection.checksums {
            return;
        }
        self.payload_checksum = self.compute_payload_checksum();
        self.restamp_metadata();
    }

    fn restamp_metadata(&mut self) {
        if self.config.protection.checksums {
            self.metadata_checksum = self.compute_metadata_checksum();
        }
    }

    /// Digest over every scalar field except the checksums themselves.
    pub(super) fn compute_metadata_checksum(&self) -> Digest {
        let mut hasher = self.config.integrity.hasher();
        hasher
            .write_usize(self.element_width)
            .write_usize(self.size)
            .write_usize(self.capacity)
            .write_usize(self.base_capacity)
            .write_usize(self.buffer.as_ref().map_or(0, |buffer| buffer.as_bytes().len()))
            .update(self.error.map_or("", |err| err.code()).as_bytes());
        hasher.finish()
    }

    /// Digest over the whole allocation, guards included.
    pub(super) fn compute_payload_checksum(&self) -> Digest {
        self.buffer.as_ref().map_or_else(Digest::default, |buffer| {
            self.config.integrity.hash(buffer.as_bytes())
        })
    }
}
