//! Stack configuration

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use warden_integrity::Integrity;

use crate::error::ConfigError;

/// Capacity a stack starts with and never shrinks below
pub const DEFAULT_BASE_CAPACITY: usize = 16;

/// Capacity multiplier while growth is exponential
pub const GROWTH_MULTIPLIER: usize = 2;

/// Capacity above which growth switches from doubling to fixed increments
pub const EXPONENTIAL_LIMIT: usize = 10_000;

/// Absolute capacity ceiling, in elements
pub const MAX_CAPACITY: usize = 100_000;

/// Payload bytes printed by a dump before it truncates
pub const DEFAULT_DUMP_BYTES: usize = 256;

/// Which protection layers a stack maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Protection {
    /// Metadata and payload checksums
    pub checksums: bool,
    /// Guard canaries around the payload
    pub canaries: bool,
}

impl Protection {
    /// Field-level checks only
    pub const NONE: Self = Self {
        checksums: false,
        canaries: false,
    };

    /// Checksums and canaries
    pub const FULL: Self = Self {
        checksums: true,
        canaries: true,
    };

    #[must_use]
    pub const fn is_enabled(self) -> bool {
        self.checksums || self.canaries
    }
}

impl Default for Protection {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::FULL
        } else {
            Self::NONE
        }
    }
}

/// Exponential-to-additive capacity policy.
///
/// Below `exponential_limit` capacity is multiplied by `multiplier`; from
/// there on it grows by `exponential_limit` per step. No capacity may exceed
/// `max_capacity`. Only [`GrowthPolicy::new`] builds one, so every policy in
/// circulation is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthPolicy {
    multiplier: usize,
    exponential_limit: usize,
    max_capacity: usize,
}

impl GrowthPolicy {
    pub fn new(
        multiplier: usize,
        exponential_limit: usize,
        max_capacity: usize,
    ) -> Result<Self, ConfigError> {
        if multiplier < 2 {
            return Err(ConfigError::MultiplierTooSmall { multiplier });
        }
        if exponential_limit == 0 {
            return Err(ConfigError::ZeroExponentialLimit);
        }
        if max_capacity == 0 {
            return Err(ConfigError::ZeroMaxCapacity);
        }
        Ok(Self {
            multiplier,
            exponential_limit,
            max_capacity,
        })
    }

    #[must_use]
    pub const fn multiplier(&self) -> usize {
        self.multiplier
    }

    #[must_use]
    pub const fn exponential_limit(&self) -> usize {
        self.exponential_limit
    }

    #[must_use]
    pub const fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Same policy with a different ceiling
    pub fn with_max_capacity(self, max_capacity: usize) -> Result<Self, ConfigError> {
        Self::new(self.multiplier, self.exponential_limit, max_capacity)
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            multiplier: GROWTH_MULTIPLIER,
            exponential_limit: EXPONENTIAL_LIMIT,
            max_capacity: MAX_CAPACITY,
        }
    }
}

/// What a stack does once it detects an error
///
/// The default follows the build: fatal with `debug_assertions`, recorded
/// without them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Record the sticky error and return it
    Record,
    /// Dump, destroy and panic
    Panic,
    /// Dump, destroy and abort the process
    Abort,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Panic
        } else {
            Self::Record
        }
    }
}

impl ErrorPolicy {
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Record)
    }
}

/// Where diagnostic dumps are written
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiagnosticSink {
    /// Process error stream
    #[default]
    Stderr,
    /// Appended to a file, created on first write
    File(PathBuf),
}

impl DiagnosticSink {
    /// Open the sink for writing
    pub fn open(&self) -> io::Result<Box<dyn Write>> {
        match self {
            Self::Stderr => Ok(Box::new(io::stderr())),
            Self::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Ok(Box::new(file))
            }
        }
    }
}

/// Diagnostic dump settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpConfig {
    /// Payload bytes printed before the dump truncates
    pub max_payload_bytes: usize,
    /// Destination of [`dump`](crate::RawStack::dump) and fatal reports
    pub sink: DiagnosticSink,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_DUMP_BYTES,
            sink: DiagnosticSink::default(),
        }
    }
}

/// Configuration for a stack
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// Starting capacity and shrink floor
    pub base_capacity: usize,
    /// Enabled protection layers
    pub protection: Protection,
    /// Capacity growth policy
    pub growth: GrowthPolicy,
    /// Diagnostic dump settings
    pub dump: DumpConfig,
    /// Reaction to detected errors
    pub on_error: ErrorPolicy,
    /// Hash salt and canary pattern
    pub integrity: Integrity,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            base_capacity: DEFAULT_BASE_CAPACITY,
            protection: Protection::default(),
            growth: GrowthPolicy::default(),
            dump: DumpConfig::default(),
            on_error: ErrorPolicy::default(),
            integrity: Integrity::thread_default(),
        }
    }
}

impl StackConfig {
    /// Debug configuration - every protection on, errors are fatal
    #[must_use]
    pub fn debug() -> Self {
        Self {
            protection: Protection::FULL,
            on_error: ErrorPolicy::Panic,
            ..Self::default()
        }
    }

    /// Production configuration - field checks only, errors are recorded
    #[must_use]
    pub fn production() -> Self {
        Self {
            protection: Protection::NONE,
            on_error: ErrorPolicy::Record,
            ..Self::default()
        }
    }

    /// Check that the growth ceiling leaves room for the base capacity.
    ///
    /// A zero base capacity is not rejected here: it is recorded on the
    /// stack as [`StackError::ZeroBaseCapacity`](crate::StackError::ZeroBaseCapacity).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.growth.max_capacity() < self.base_capacity {
            return Err(ConfigError::CeilingBelowBase {
                max_capacity: self.growth.max_capacity(),
                base_capacity: self.base_capacity,
            });
        }
        Ok(())
    }

    /// Set the base capacity
    #[must_use = "builder methods must be chained or built"]
    pub fn with_base_capacity(mut self, base_capacity: usize) -> Self {
        self.base_capacity = base_capacity;
        self
    }

    /// Set the protection layers
    #[must_use = "builder methods must be chained or built"]
    pub fn with_protection(mut self, protection: Protection) -> Self {
        self.protection = protection;
        self
    }

    /// Set the growth policy
    #[must_use = "builder methods must be chained or built"]
    pub fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    /// Set the error policy
    #[must_use = "builder methods must be chained or built"]
    pub fn with_error_policy(mut self, on_error: ErrorPolicy) -> Self {
        self.on_error = on_error;
        self
    }

    /// Inject the integrity instance (fixed salt in tests)
    #[must_use = "builder methods must be chained or built"]
    pub fn with_integrity(mut self, integrity: Integrity) -> Self {
        self.integrity = integrity;
        self
    }

    /// Set the diagnostic sink
    #[must_use = "builder methods must be chained or built"]
    pub fn with_dump_sink(mut self, sink: DiagnosticSink) -> Self {
        self.dump.sink = sink;
        self
    }

    /// Set the payload byte budget of a dump
    #[must_use = "builder methods must be chained or built"]
    pub fn with_max_dump_bytes(mut self, max_payload_bytes: usize) -> Self {
        self.dump.max_payload_bytes = max_payload_bytes;
        self
    }
}
