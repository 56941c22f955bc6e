//! Type-erased protected stack
//!
//! [`RawStack`] stores fixed-width elements as raw bytes. Every operation
//! re-validates the protection state before touching the buffer and
//! re-stamps it after mutating. See [`validate`](RawStack::validate) for the
//! order in which problems are diagnosed.

mod buffer;
mod report;
mod resize;
#[cfg(any(test, feature = "fault-injection"))]
mod tamper;
mod validate;

use core::fmt;
use core::ops::Range;
use std::panic::Location;

pub use report::Report;
pub use resize::ResizeMode;
#[cfg(any(test, feature = "fault-injection"))]
pub use tamper::Tamper;
pub use validate::validate_handle;

use buffer::GuardedBuffer;
use warden_integrity::Digest;

use crate::config::{ErrorPolicy, StackConfig};
use crate::error::{StackError, StackResult};
use crate::stats::ResizeStats;

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

/// LIFO stack of `element_width`-byte elements with corruption detection.
///
/// # Example
/// ```
/// use warden_stack::RawStack;
///
/// let mut stack = RawStack::with_capacity(4, 2);
/// stack.push(&7u32.to_ne_bytes())?;
/// stack.push(&9u32.to_ne_bytes())?;
///
/// let mut out = [0u8; 4];
/// stack.pop(&mut out)?;
/// assert_eq!(u32::from_ne_bytes(out), 9);
/// # Ok::<(), warden_stack::StackError>(())
/// ```
pub struct RawStack {
    element_width: usize,
    size: usize,
    capacity: usize,
    base_capacity: usize,
    buffer: Option<GuardedBuffer>,
    error: Option<StackError>,
    metadata_checksum: Digest,
    payload_checksum: Digest,
    stats: ResizeStats,
    config: StackConfig,
}

impl RawStack {
    /// Stack with the default configuration and base capacity
    pub fn new(element_width: usize) -> Self {
        Self::with_config(element_width, StackConfig::default())
    }

    /// Stack with the default configuration and the given base capacity
    pub fn with_capacity(element_width: usize, base_capacity: usize) -> Self {
        Self::with_config(
            element_width,
            StackConfig::default().with_base_capacity(base_capacity),
        )
    }

    /// Stack with a custom configuration.
    ///
    /// Never panics: a zero width, zero base capacity or failed allocation is
    /// recorded as the sticky error and reported by every later call.
    pub fn with_config(element_width: usize, config: StackConfig) -> Self {
        let base_capacity = config.base_capacity;
        let mut stack = Self {
            element_width,
            size: 0,
            capacity: base_capacity,
            base_capacity,
            buffer: None,
            error: None,
            metadata_checksum: Digest::default(),
            payload_checksum: Digest::default(),
            stats: ResizeStats::starting_at(base_capacity),
            config,
        };

        let allocated = stack.allocate();
        stack.restamp();
        if let Err(err) = allocated {
            stack.record(err);
        }

        #[cfg(feature = "logging")]
        trace!(
            element_width,
            base_capacity,
            protected = stack.config.protection.is_enabled(),
            ok = stack.error.is_none(),
            "stack constructed"
        );

        stack
    }

    fn allocate(&mut self) -> StackResult<()> {
        if self.element_width == 0 {
            return Err(StackError::ZeroElementWidth);
        }
        if self.base_capacity == 0 {
            return Err(StackError::ZeroBaseCapacity);
        }

        let payload_len = self
            .base_capacity
            .checked_mul(self.element_width)
            .ok_or_else(|| StackError::allocation_failed(usize::MAX))?;
        let mut buffer = GuardedBuffer::allocate(payload_len, self.config.protection.canaries)
            .map_err(StackError::allocation_failed)?;
        buffer.stamp_guards(&self.config.integrity);
        self.buffer = Some(buffer);
        Ok(())
    }

    /// Releases the buffer and zeroes every field. Safe to call repeatedly.
    ///
    /// A destroyed stack reports [`StackError::NullBuffer`].
    pub fn destroy(&mut self) {
        if self.buffer.take().is_some() {
            #[cfg(feature = "logging")]
            {
                trace!("stack destroyed");
            }
        }

        self.element_width = 0;
        self.size = 0;
        self.capacity = 0;
        self.base_capacity = 0;
        self.error = None;
        self.stats = ResizeStats::default();
        self.payload_checksum = Digest::default();
        self.restamp();
    }

    /// Copies `element_width` bytes from the front of `value` onto the stack.
    ///
    /// Extra bytes in `value` are ignored; fewer is rejected with
    /// [`StackError::ElementWidthMismatch`] and nothing changes.
    #[track_caller]
    pub fn push(&mut self, value: &[u8]) -> StackResult<()> {
        let location = Location::caller();
        self.check(location)?;

        let width = self.element_width;
        let src = value
            .get(..width)
            .ok_or_else(|| StackError::width_mismatch(width, value.len()))?;

        self.resize_if_needed(ResizeMode::Expand, location)?;
        self.check(location)?;

        let Some(range) = self.slot_range(self.size) else {
            let err = StackError::SizeExceedsCapacity {
                size: self.size.saturating_add(1),
                capacity: self.capacity,
            };
            return Err(self.fail(err, location));
        };
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.payload_mut()[range].copy_from_slice(src);
        }
        self.size += 1;
        self.restamp();
        Ok(())
    }

    /// Copies the top element into the front of `dest` and removes it.
    ///
    /// On an empty stack records [`StackError::Underflow`] and leaves `dest`
    /// untouched.
    #[track_caller]
    pub fn pop(&mut self, dest: &mut [u8]) -> StackResult<()> {
        let location = Location::caller();
        self.check(location)?;

        let width = self.element_width;
        let available = dest.len();
        let dest = dest
            .get_mut(..width)
            .ok_or_else(|| StackError::width_mismatch(width, available))?;

        if self.size == 0 {
            #[cfg(feature = "logging")]
            warn!("pop from an empty stack");
            return Err(self.fail(StackError::Underflow, location));
        }

        let Some(range) = self.slot_range(self.size - 1) else {
            let err = StackError::SizeExceedsCapacity {
                size: self.size,
                capacity: self.capacity,
            };
            return Err(self.fail(err, location));
        };
        if let Some(buffer) = self.buffer.as_mut() {
            let slot = &mut buffer.payload_mut()[range];
            dest.copy_from_slice(slot);
            slot.fill(0);
        }
        self.size -= 1;
        self.restamp();

        self.resize_if_needed(ResizeMode::Shrink, location)
    }

    /// Byte range of slot `index`, if it lies inside the allocated payload.
    fn slot_range(&self, index: usize) -> Option<Range<usize>> {
        let start = index.checked_mul(self.element_width)?;
        let end = start.checked_add(self.element_width)?;
        let payload_len = self.buffer.as_ref()?.payload_len();
        (end <= payload_len).then_some(start..end)
    }

    fn resize_if_needed(
        &mut self,
        mode: ResizeMode,
        location: &'static Location<'static>,
    ) -> StackResult<()> {
        let policy = self.config.growth;
        let plan = match mode {
            ResizeMode::Expand => policy.plan_expand(self.size, self.capacity, self.base_capacity),
            ResizeMode::Shrink => Ok(policy.plan_shrink(
                self.size,
                self.capacity,
                self.base_capacity,
            )),
        };

        match plan {
            Ok(Some(new_capacity)) => self
                .reallocate(new_capacity, mode)
                .map_err(|err| self.fail(err, location)),
            Ok(None) => Ok(()),
            Err(err) => {
                #[cfg(feature = "logging")]
                warn!(%err, size = self.size, "stack capacity limit reached");
                Err(self.fail(err, location))
            }
        }
    }

    /// Moves the payload into `new_capacity` slots. Nothing changes on failure.
    fn reallocate(&mut self, new_capacity: usize, mode: ResizeMode) -> StackResult<()> {
        let new_len = new_capacity
            .checked_mul(self.element_width)
            .ok_or_else(|| StackError::allocation_failed(usize::MAX))?;
        let buffer = self.buffer.as_mut().ok_or(StackError::NullBuffer)?;
        buffer
            .resize_payload(new_len)
            .map_err(StackError::allocation_failed)?;
        buffer.stamp_guards(&self.config.integrity);

        #[cfg(feature = "logging")]
        debug!(?mode, from = self.capacity, to = new_capacity, size = self.size, "stack resized");

        self.capacity = new_capacity;
        match mode {
            ResizeMode::Expand => self.stats.record_expansion(new_capacity),
            ResizeMode::Shrink => self.stats.record_shrink(),
        }
        self.restamp();
        Ok(())
    }

    /// Records `err` and applies the error policy.
    fn fail(&mut self, err: StackError, location: &'static Location<'static>) -> StackError {
        self.record(err);
        if self.config.on_error.is_fatal() {
            self.fatal(err, location);
        }
        err
    }

    /// Dumps to the configured sink, destroys the stack and terminates.
    #[cold]
    #[inline(never)]
    fn fatal(&mut self, err: StackError, location: &'static Location<'static>) -> ! {
        #[cfg(feature = "logging")]
        tracing::error!(code = err.code(), %err, %location, "stack assertion failed");

        self.write_fatal_report(err, location);
        let policy = self.config.on_error;
        self.destroy();

        if policy == ErrorPolicy::Abort {
            std::process::abort();
        }
        panic!("stack assertion failed at {location}: {err}");
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    /// Number of elements on the stack
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of element slots currently allocated
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn base_capacity(&self) -> usize {
        self.base_capacity
    }

    #[must_use]
    pub fn element_width(&self) -> usize {
        self.element_width
    }

    /// Whether the buffer is still allocated
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    #[must_use]
    pub fn stats(&self) -> ResizeStats {
        self.stats
    }

    #[must_use]
    pub fn config(&self) -> &StackConfig {
        &self.config
    }
}

impl Drop for RawStack {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for RawStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawStack")
            .field("element_width", &self.element_width)
            .field("size", &self.size)
            .field("capacity", &self.capacity)
            .field("base_capacity", &self.base_capacity)
            .field("allocated", &self.buffer.is_some())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
