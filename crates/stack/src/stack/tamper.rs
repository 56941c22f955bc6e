//! Fault injection for corruption tests
//!
//! Writes go straight to the fields and bytes, bypassing re-stamping, the
//! same way a stray pointer would.

use warden_integrity::{CANARY_WIDTH, Digest};

use super::RawStack;

/// Raw write access to a stack's internals.
pub struct Tamper<'a> {
    stack: &'a mut RawStack,
}

impl RawStack {
    pub fn tamper(&mut self) -> Tamper<'_> {
        Tamper { stack: self }
    }
}

impl Tamper<'_> {
    pub fn set_size(&mut self, size: usize) -> &mut Self {
        self.stack.size = size;
        self
    }

    pub fn set_capacity(&mut self, capacity: usize) -> &mut Self {
        self.stack.capacity = capacity;
        self
    }

    pub fn set_element_width(&mut self, element_width: usize) -> &mut Self {
        self.stack.element_width = element_width;
        self
    }

    pub fn set_base_capacity(&mut self, base_capacity: usize) -> &mut Self {
        self.stack.base_capacity = base_capacity;
        self
    }

    pub fn set_metadata_checksum(&mut self, digest: Digest) -> &mut Self {
        self.stack.metadata_checksum = digest;
        self
    }

    pub fn set_payload_checksum(&mut self, digest: Digest) -> &mut Self {
        self.stack.payload_checksum = digest;
        self
    }

    /// Inverts one byte of the leading guard. Panics if canaries are off.
    pub fn flip_leading_canary(&mut self, index: usize) -> &mut Self {
        assert!(index < CANARY_WIDTH, "guard index out of range");
        let guard = self
            .stack
            .buffer
            .as_mut()
            .and_then(|buffer| buffer.leading_guard_mut())
            .expect("stack has no leading guard");
        guard[index] = !guard[index];
        self
    }

    /// Inverts one byte of the trailing guard. Panics if canaries are off.
    pub fn flip_trailing_canary(&mut self, index: usize) -> &mut Self {
        assert!(index < CANARY_WIDTH, "guard index out of range");
        let guard = self
            .stack
            .buffer
            .as_mut()
            .and_then(|buffer| buffer.trailing_guard_mut())
            .expect("stack has no trailing guard");
        guard[index] = !guard[index];
        self
    }

    /// Inverts one payload byte.
    pub fn flip_payload_byte(&mut self, index: usize) -> &mut Self {
        let buffer = self.stack.buffer.as_mut().expect("stack has no buffer");
        let byte = &mut buffer.payload_mut()[index];
        *byte = !*byte;
        self
    }

    /// Frees the buffer without touching any other field.
    pub fn drop_buffer(&mut self) -> &mut Self {
        self.stack.buffer = None;
        self
    }
}
