//! Standalone error types for warden-stack
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.

use core::fmt;

use thiserror::Error;
use warden_integrity::Digest;

#[cfg(feature = "logging")]
use tracing::error;

// ============================================================================
// Stack Errors
// ============================================================================

/// Which protected part of the payload failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadRegion {
    /// Recomputed payload digest differs from the stored one
    Checksum,
    /// Guard region in front of the payload was overwritten
    LeadingCanary,
    /// Guard region behind the payload was overwritten
    TrailingCanary,
}

impl fmt::Display for PayloadRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checksum => f.write_str("checksum"),
            Self::LeadingCanary => f.write_str("leading canary"),
            Self::TrailingCanary => f.write_str("trailing canary"),
        }
    }
}

/// Stack errors, listed in the order validation looks for them.
///
/// Every variant except [`ElementWidthMismatch`](Self::ElementWidthMismatch)
/// is sticky: once recorded on a stack it is reported by every later call
/// until the stack is reconstructed.
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    #[error("Stack handle is null")]
    NullHandle,

    #[error("Stack metadata corrupted: stored checksum {stored}, recomputed {actual}")]
    CorruptMetadata { stored: Digest, actual: Digest },

    #[error("Stack payload corrupted: {region} mismatch")]
    CorruptPayload { region: PayloadRegion },

    #[error("Stack buffer is missing")]
    NullBuffer,

    #[error("Element width is zero")]
    ZeroElementWidth,

    #[error("Base capacity is zero")]
    ZeroBaseCapacity,

    #[error("Capacity is zero")]
    ZeroCapacity,

    #[error("Capacity {capacity} disagrees with {allocated} allocated payload bytes")]
    CapacityMismatch { capacity: usize, allocated: usize },

    #[error("Size {size} exceeds capacity {capacity}")]
    SizeExceedsCapacity { size: usize, capacity: usize },

    #[error("Pop from an empty stack")]
    Underflow,

    #[error("Capacity {requested} exceeds the limit of {limit} elements")]
    SizeLimitExceeded { requested: usize, limit: usize },

    #[error("Memory allocation failed: {bytes} bytes")]
    AllocationFailed { bytes: usize },

    #[error("Element buffer holds {actual} bytes, stack needs {expected}")]
    ElementWidthMismatch { expected: usize, actual: usize },
}

impl StackError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NullHandle => "STK:NULL:HANDLE",
            Self::CorruptMetadata { .. } => "STK:CORRUPT:METADATA",
            Self::CorruptPayload { .. } => "STK:CORRUPT:PAYLOAD",
            Self::NullBuffer => "STK:NULL:BUFFER",
            Self::ZeroElementWidth => "STK:ZERO:ELEMENT_WIDTH",
            Self::ZeroBaseCapacity => "STK:ZERO:BASE_CAPACITY",
            Self::ZeroCapacity => "STK:ZERO:CAPACITY",
            Self::CapacityMismatch { .. } => "STK:CAPACITY:MISMATCH",
            Self::SizeExceedsCapacity { .. } => "STK:OVERFLOW",
            Self::Underflow => "STK:UNDERFLOW",
            Self::SizeLimitExceeded { .. } => "STK:SIZE_LIMIT",
            Self::AllocationFailed { .. } => "STK:ALLOC:FAILED",
            Self::ElementWidthMismatch { .. } => "STK:ELEMENT:WIDTH",
        }
    }

    /// Check if the error means the object itself can no longer be trusted
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::CorruptMetadata { .. } | Self::CorruptPayload { .. }
        )
    }

    /// Check if the error is recorded on the stack
    #[must_use]
    pub fn is_sticky(&self) -> bool {
        !matches!(self, Self::ElementWidthMismatch { .. })
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create metadata corruption error
    pub fn corrupt_metadata(stored: Digest, actual: Digest) -> Self {
        #[cfg(feature = "logging")]
        error!(%stored, %actual, "Stack metadata checksum mismatch");

        Self::CorruptMetadata { stored, actual }
    }

    /// Create payload corruption error
    pub fn corrupt_payload(region: PayloadRegion) -> Self {
        #[cfg(feature = "logging")]
        error!(%region, "Stack payload corruption");

        Self::CorruptPayload { region }
    }

    /// Create allocation failed error
    pub fn allocation_failed(bytes: usize) -> Self {
        #[cfg(feature = "logging")]
        error!(bytes, "Stack allocation failed");

        Self::AllocationFailed { bytes }
    }

    /// Create size limit error
    pub fn size_limit(requested: usize, limit: usize) -> Self {
        Self::SizeLimitExceeded { requested, limit }
    }

    /// Create element width mismatch error
    pub fn width_mismatch(expected: usize, actual: usize) -> Self {
        Self::ElementWidthMismatch { expected, actual }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Rejected growth policy parameters
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Growth multiplier must be at least 2, got {multiplier}")]
    MultiplierTooSmall { multiplier: usize },

    #[error("Exponential growth limit must be non-zero")]
    ZeroExponentialLimit,

    #[error("Maximum capacity must be non-zero")]
    ZeroMaxCapacity,

    #[error("Maximum capacity {max_capacity} is below the base capacity {base_capacity}")]
    CeilingBelowBase {
        max_capacity: usize,
        base_capacity: usize,
    },
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for stack operations
pub type StackResult<T> = core::result::Result<T, StackError>;

// ============================================================================
// Tests
// ============================================================================
