//! # warden-stack
//!
//! A LIFO stack of fixed-width elements that notices when its own memory has
//! been damaged.
//!
//! Each stack keeps:
//! - a salted checksum over its scalar fields (size, capacity, widths, error)
//! - a salted checksum over the whole allocation
//! - guard canaries immediately before and after the payload
//! - a sticky error state: the first failure is kept and reported until the
//!   stack is rebuilt
//!
//! Every operation re-validates before touching the buffer and re-stamps the
//! checksums after mutating it.
//!
//! ## Quick Start
//!
//! ```rust
//! use warden_stack::prelude::*;
//!
//! // record errors so draining past empty returns `Underflow`
//! let config = StackConfig::default()
//!     .with_base_capacity(4)
//!     .with_error_policy(ErrorPolicy::Record);
//! let mut stack = Stack::<u64>::with_config(config);
//! for value in 0..10 {
//!     stack.push(value)?;
//! }
//! assert_eq!(stack.capacity(), 16);
//!
//! while let Ok(value) = stack.pop() {
//!     println!("{value}");
//! }
//! assert_eq!(stack.error_state(), Some(StackError::Underflow));
//! # Ok::<(), StackError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): `tracing` events for corruption, resizes and fatal
//!   reports
//! - `fault-injection`: [`RawStack::tamper`] for writing corruption tests
//!
//! ## Profiles
//!
//! [`StackConfig::debug`] turns every protection layer on and makes errors
//! fatal. [`StackConfig::production`] keeps the field checks only and records
//! errors without escalating. The default follows `debug_assertions`: the
//! debug profile in debug builds, the production profile in release builds.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rust_2018_idioms)]
// `Element` byte views are the only unsafe code
#![allow(unsafe_code)]

pub mod config;
pub mod element;
pub mod error;
pub mod stack;
pub mod stats;
pub mod typed;

pub use crate::config::{
    DiagnosticSink, DumpConfig, ErrorPolicy, GrowthPolicy, Protection, StackConfig,
};
pub use crate::element::Element;
pub use crate::error::{ConfigError, PayloadRegion, StackError, StackResult};
#[cfg(any(test, feature = "fault-injection"))]
#[cfg_attr(docsrs, doc(cfg(feature = "fault-injection")))]
pub use crate::stack::Tamper;
pub use crate::stack::{RawStack, Report, ResizeMode, validate_handle};
pub use crate::stats::ResizeStats;
pub use crate::typed::Stack;

pub use warden_integrity::{Digest, Integrity, Salt};

pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::config::{ErrorPolicy, Protection, StackConfig};
    pub use crate::element::Element;
    pub use crate::error::{StackError, StackResult};
    pub use crate::stack::RawStack;
    pub use crate::typed::Stack;
}
