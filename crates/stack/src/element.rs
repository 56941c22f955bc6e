//! Plain-old-data element types for [`Stack`](crate::Stack)

use core::mem::size_of;
use core::slice;

/// A type whose values can be copied in and out of a stack as raw bytes.
///
/// # Safety
///
/// Implementors must:
/// * contain no padding bytes, so every byte of a value is initialized;
/// * accept every bit pattern as a valid value, including all zeroes.
///
/// Integers, floats, `()` and arrays of elements qualify. `bool`, `char`,
/// references and most structs do not.
pub unsafe trait Element: Copy + 'static {
    /// The all-zero value
    #[must_use]
    fn zeroed() -> Self {
        // SAFETY: all-zero is a valid bit pattern per the trait contract
        unsafe { core::mem::zeroed() }
    }

    /// Bytes of the value, exactly `size_of::<Self>()` long
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: no padding, so all size_of::<Self>() bytes are initialized
        unsafe { slice::from_raw_parts((self as *const Self).cast::<u8>(), size_of::<Self>()) }
    }

    /// Mutable bytes of the value
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: any byte pattern written back is a valid value
        unsafe { slice::from_raw_parts_mut((self as *mut Self).cast::<u8>(), size_of::<Self>()) }
    }
}

macro_rules! impl_element {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive with no padding and no invalid bit patterns
            unsafe impl Element for $ty {}
        )*
    };
}

impl_element!(
    (),
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
);

// SAFETY: array stride equals element size, so no padding is introduced
unsafe impl<T: Element, const N: usize> Element for [T; N] {}
