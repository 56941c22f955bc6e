//! Capacity policy
//!
//! Expansion fires when a push finds the stack full. Shrinking is checked
//! after every pop and uses a hysteresis band one growth step below the
//! shrink target, so alternating push/pop at a boundary never reallocates:
//!
//! | capacity            | shrink target          | shrink when `size <=`  |
//! |---------------------|------------------------|------------------------|
//! | `< mult * limit`    | `capacity / mult`      | `capacity / mult^2`    |
//! | `>= mult * limit`   | `capacity - limit`     | `capacity - 2 * limit` |
//!
//! Neither direction ever goes below the base capacity.

use crate::config::GrowthPolicy;
use crate::error::{StackError, StackResult};

/// Direction of a capacity check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    Expand,
    Shrink,
}

impl GrowthPolicy {
    /// Capacity after one growth step, `None` if it would overflow `usize`.
    #[must_use]
    pub fn next_capacity(&self, capacity: usize) -> Option<usize> {
        if capacity < self.exponential_limit() {
            capacity.checked_mul(self.multiplier())
        } else {
            capacity.checked_add(self.exponential_limit())
        }
    }

    /// New capacity needed before pushing onto a stack of `size` elements.
    ///
    /// `Ok(None)` while there is room. Fails with
    /// [`StackError::SizeLimitExceeded`] if the next step passes the ceiling.
    pub fn plan_expand(
        &self,
        size: usize,
        capacity: usize,
        base_capacity: usize,
    ) -> StackResult<Option<usize>> {
        if size < base_capacity || size < capacity {
            return Ok(None);
        }
        match self.next_capacity(capacity) {
            Some(next) if next <= self.max_capacity() => Ok(Some(next)),
            next => Err(StackError::size_limit(
                next.unwrap_or(usize::MAX),
                self.max_capacity(),
            )),
        }
    }

    /// New capacity after a pop left `size` elements, if the stack should shrink.
    #[must_use]
    pub fn plan_shrink(&self, size: usize, capacity: usize, base_capacity: usize) -> Option<usize> {
        if capacity <= base_capacity {
            return None;
        }

        let multiplier = self.multiplier();
        let limit = self.exponential_limit();
        let (target, band) = if capacity < multiplier.saturating_mul(limit) {
            (
                capacity / multiplier,
                capacity / multiplier.saturating_mul(multiplier),
            )
        } else {
            (capacity - limit, capacity.saturating_sub(2 * limit))
        };

        let target = target.max(base_capacity);
        (size <= band && target < capacity).then_some(target)
    }
}
