//! Typed front end over [`RawStack`]

use core::fmt;
use core::marker::PhantomData;
use core::mem::size_of;
use std::io;

use crate::config::StackConfig;
use crate::element::Element;
use crate::error::{StackError, StackResult};
use crate::stack::{RawStack, Report};
use crate::stats::ResizeStats;

/// Protected LIFO stack of `T` values.
///
/// The element width is `size_of::<T>()`, so the byte-count contract of
/// [`RawStack`] is enforced by the type system. A zero-sized `T` is reported
/// as [`StackError::ZeroElementWidth`].
///
/// # Example
/// ```
/// use warden_stack::Stack;
///
/// let mut stack = Stack::<i64>::with_capacity(4);
/// for value in 0..10 {
///     stack.push(value)?;
/// }
/// assert_eq!(stack.pop()?, 9);
/// assert_eq!(stack.len(), 9);
/// # Ok::<(), warden_stack::StackError>(())
/// ```
pub struct Stack<T: Element> {
    raw: RawStack,
    _marker: PhantomData<T>,
}

impl<T: Element> Stack<T> {
    pub fn new() -> Self {
        Self::with_config(StackConfig::default())
    }

    pub fn with_capacity(base_capacity: usize) -> Self {
        Self::with_config(StackConfig::default().with_base_capacity(base_capacity))
    }

    pub fn with_config(config: StackConfig) -> Self {
        Self {
            raw: RawStack::with_config(size_of::<T>(), config),
            _marker: PhantomData,
        }
    }

    #[track_caller]
    pub fn push(&mut self, value: T) -> StackResult<()> {
        self.raw.push(value.as_bytes())
    }

    #[track_caller]
    pub fn pop(&mut self) -> StackResult<T> {
        let mut value = T::zeroed();
        self.raw.pop(value.as_bytes_mut())?;
        Ok(value)
    }

    pub fn validate(&mut self) -> StackResult<()> {
        self.raw.validate()
    }

    pub fn error_state(&mut self) -> Option<StackError> {
        self.raw.error_state()
    }

    #[track_caller]
    pub fn assert_valid(&mut self) {
        self.raw.assert_valid();
    }

    pub fn destroy(&mut self) {
        self.raw.destroy();
    }

    #[track_caller]
    pub fn report(&self) -> Report<'_> {
        self.raw.report()
    }

    #[track_caller]
    pub fn dump(&self) -> io::Result<()> {
        self.raw.dump()
    }

    #[track_caller]
    pub fn dump_to(&self, sink: &mut dyn io::Write) -> io::Result<()> {
        self.raw.dump_to(sink)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    #[must_use]
    pub fn base_capacity(&self) -> usize {
        self.raw.base_capacity()
    }

    #[must_use]
    pub fn stats(&self) -> ResizeStats {
        self.raw.stats()
    }

    /// The underlying byte-level stack
    #[must_use]
    pub fn as_raw(&self) -> &RawStack {
        &self.raw
    }

    #[cfg(any(test, feature = "fault-injection"))]
    pub fn as_raw_mut(&mut self) -> &mut RawStack {
        &mut self.raw
    }
}

impl<T: Element> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Stack").field(&self.raw).finish()
    }
}
