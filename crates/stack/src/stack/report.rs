//! Human-readable diagnostic dump
//!
//! The report never trusts the fields it prints: payload output is clamped
//! to the allocated bytes and to [`DumpConfig::max_payload_bytes`], so a
//! corrupted `size` cannot produce unbounded output.
//!
//! [`DumpConfig::max_payload_bytes`]: crate::DumpConfig::max_payload_bytes

use core::fmt;
use std::io::{self, Write};
use std::panic::Location;

use warden_integrity::Guard;

use super::RawStack;
use crate::error::StackError;

/// Bytes per row when the element width is zero and cannot be used.
const FALLBACK_ROW: usize = 16;

/// Diagnostic snapshot of a stack, rendered through [`fmt::Display`].
pub struct Report<'a> {
    stack: &'a RawStack,
    location: &'static Location<'static>,
}

impl Report<'_> {
    /// Call site the report was requested from
    #[must_use]
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

impl RawStack {
    /// Report for the calling location
    #[track_caller]
    pub fn report(&self) -> Report<'_> {
        Report {
            stack: self,
            location: Location::caller(),
        }
    }

    /// Writes the report to the configured [`DiagnosticSink`](crate::DiagnosticSink).
    #[track_caller]
    pub fn dump(&self) -> io::Result<()> {
        let report = self.report();
        let mut sink = self.config.dump.sink.open()?;
        write!(sink, "{report}")?;
        sink.flush()
    }

    /// Writes the report to `sink`.
    #[track_caller]
    pub fn dump_to(&self, sink: &mut dyn Write) -> io::Result<()> {
        write!(sink, "{}", self.report())
    }

    /// Best effort: the process is about to terminate anyway.
    pub(super) fn write_fatal_report(&self, err: StackError, location: &'static Location<'static>) {
        let report = Report {
            stack: self,
            location,
        };
        if let Ok(mut sink) = self.config.dump.sink.open() {
            let _ = writeln!(
                sink,
                "\nSTACK ASSERT (called from {location}): {err} [{}]",
                err.code()
            );
            let _ = write!(sink, "{report}");
            let _ = sink.flush();
        }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stack = self.stack;
        let config = &stack.config;

        writeln!(f, "\nSTACK DUMP (called from {}):", self.location)?;
        writeln!(f, "    element width   = {}", stack.element_width)?;
        writeln!(f, "    base capacity   = {}", stack.base_capacity)?;
        writeln!(f, "    capacity        = {}", stack.capacity)?;
        writeln!(f, "    size            = {}", stack.size)?;
        match stack.error {
            None => writeln!(f, "    error state     = ok")?,
            Some(err) => writeln!(f, "    error state     = {} ({err})", err.code())?,
        }
        writeln!(
            f,
            "    protection      = checksums: {}, canaries: {}",
            on_off(config.protection.checksums),
            on_off(config.protection.canaries)
        )?;

        if config.protection.checksums {
            let actual = stack.compute_metadata_checksum();
            writeln!(
                f,
                "    metadata hash   = stored {}, recomputed {} ({})",
                stack.metadata_checksum,
                actual,
                verdict(actual == stack.metadata_checksum, "MISMATCH")
            )?;
        }

        let Some(buffer) = stack.buffer.as_ref() else {
            return writeln!(f, "    buffer          = <none>");
        };

        if config.protection.checksums {
            let actual = stack.compute_payload_checksum();
            writeln!(
                f,
                "    payload hash    = stored {}, recomputed {} ({})",
                stack.payload_checksum,
                actual,
                verdict(actual == stack.payload_checksum, "MISMATCH")
            )?;
        }

        if let Some(guard) = buffer.leading_guard() {
            self.write_guard(f, "leading canary ", guard)?;
        }
        if let Some(guard) = buffer.trailing_guard() {
            self.write_guard(f, "trailing canary", guard)?;
        }

        let payload = buffer.payload();
        let claimed = stack.size.saturating_mul(stack.element_width);
        let used = claimed.min(payload.len());
        let shown = used.min(config.dump.max_payload_bytes);
        let row = if stack.element_width == 0 {
            FALLBACK_ROW
        } else {
            stack.element_width
        };

        writeln!(
            f,
            "    payload bytes   = {used} in use of {} allocated",
            payload.len()
        )?;
        writeln!(f, "    {{")?;
        for (index, element) in payload[..shown].chunks(row).enumerate() {
            write!(f, "        [{index:>4}] |")?;
            for byte in element {
                write!(f, " {byte:02X}")?;
            }
            writeln!(f, " |")?;
        }
        if shown < used {
            writeln!(
                f,
                "        ... {} more bytes not shown (limit {})",
                used - shown,
                config.dump.max_payload_bytes
            )?;
        }
        if claimed > payload.len() {
            writeln!(
                f,
                "        !!! size claims {claimed} bytes, only {} allocated",
                payload.len()
            )?;
        }
        writeln!(f, "    }}")
    }
}

impl Report<'_> {
    fn write_guard(&self, f: &mut fmt::Formatter<'_>, label: &str, guard: &Guard) -> fmt::Result {
        let intact = self.stack.config.integrity.check_canary(guard);
        writeln!(
            f,
            "    {label} = {} ({})",
            hex::encode(guard),
            verdict(intact, "CORRUPT")
        )
    }
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

const fn verdict(ok: bool, failure: &'static str) -> &'static str {
    if ok { "ok" } else { failure }
}
