use std::panic::{self, AssertUnwindSafe};

use pretty_assertions::assert_eq;
use warden_integrity::{Digest, Integrity, Salt};

use super::*;
use crate::config::{DiagnosticSink, GrowthPolicy, Protection};
use crate::error::PayloadRegion;

const WIDTH: usize = 8;

fn config(base_capacity: usize, protection: Protection) -> StackConfig {
    StackConfig::default()
        .with_base_capacity(base_capacity)
        .with_protection(protection)
        .with_error_policy(ErrorPolicy::Record)
        .with_integrity(Integrity::new(Salt::fixed(0x00c0_ffee)))
}

fn stack(base_capacity: usize, protection: Protection) -> RawStack {
    RawStack::with_config(WIDTH, config(base_capacity, protection))
}

fn pop_u64(stack: &mut RawStack) -> StackResult<u64> {
    let mut out = [0u8; WIDTH];
    stack.pop(&mut out)?;
    Ok(u64::from_le_bytes(out))
}

fn dump_string(stack: &RawStack) -> String {
    let mut out = Vec::new();
    stack.dump_to(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

// ============================================================================
// Lifecycle and resizing
// ============================================================================

#[test]
fn test_grow_then_shrink_back_to_base() {
    let mut stack = stack(4, Protection::FULL);
    assert_eq!(stack.capacity(), 4);

    let mut capacities = Vec::new();
    for value in 0..10u64 {
        stack.push(&value.to_le_bytes()).unwrap();
        capacities.push(stack.capacity());
    }
    assert_eq!(capacities, [4, 4, 4, 4, 8, 8, 8, 8, 16, 16]);
    assert_eq!(stack.len(), 10);
    assert_eq!(stack.stats().expansions, 2);
    assert_eq!(stack.stats().peak_capacity, 16);

    for expected in (0..10u64).rev() {
        assert_eq!(pop_u64(&mut stack), Ok(expected));
        assert_eq!(stack.validate(), Ok(()));
    }
    assert_eq!(stack.capacity(), 4);
    assert_eq!(stack.stats().shrinks, 2);
    assert!(stack.is_empty());
}

#[test]
fn test_shrink_points() {
    let mut stack = stack(4, Protection::FULL);
    for value in 0..10u64 {
        stack.push(&value.to_le_bytes()).unwrap();
    }

    let mut capacities = Vec::new();
    while pop_u64(&mut stack).is_ok() {
        capacities.push(stack.capacity());
    }
    // sizes after each pop: 9..=0
    assert_eq!(capacities, [16, 16, 16, 16, 16, 8, 8, 4, 4, 4]);
}

#[test]
fn test_growth_preserves_contents_and_guards() {
    let mut stack = stack(2, Protection::FULL);
    for value in 100..140u64 {
        stack.push(&value.to_le_bytes()).unwrap();
    }
    assert_eq!(stack.validate(), Ok(()));
    assert_eq!(stack.capacity(), 64);
    assert_eq!(pop_u64(&mut stack), Ok(139));
}

#[test]
fn test_push_pop_without_protection() {
    let mut stack = stack(4, Protection::NONE);
    for value in 0..20u64 {
        stack.push(&value.to_le_bytes()).unwrap();
    }
    for expected in (0..20u64).rev() {
        assert_eq!(pop_u64(&mut stack), Ok(expected));
    }
    assert_eq!(stack.validate(), Ok(()));
}

#[test]
fn test_popped_slot_is_zeroed() {
    let mut stack = stack(4, Protection::FULL);
    stack.push(&[0xFF; WIDTH]).unwrap();
    pop_u64(&mut stack).unwrap();

    let payload = stack.buffer.as_ref().unwrap().payload();
    assert!(payload.iter().all(|&b| b == 0));
}

#[test]
fn test_destroy_twice() {
    let mut stack = stack(4, Protection::FULL);
    stack.push(&1u64.to_le_bytes()).unwrap();

    stack.destroy();
    stack.destroy();

    assert!(!stack.is_allocated());
    assert_eq!(stack.len(), 0);
    assert_eq!(stack.capacity(), 0);
    assert_eq!(stack.element_width(), 0);
    assert_eq!(stack.validate(), Err(StackError::NullBuffer));
    assert_eq!(
        stack.push(&1u64.to_le_bytes()),
        Err(StackError::NullBuffer)
    );
}

// ============================================================================
// Construction failures
// ============================================================================

#[test]
fn test_zero_element_width() {
    let mut stack = RawStack::with_config(0, config(4, Protection::FULL));
    assert!(!stack.is_allocated());
    assert_eq!(stack.error_state(), Some(StackError::ZeroElementWidth));
    assert_eq!(stack.push(&[]), Err(StackError::ZeroElementWidth));
}

#[test]
fn test_zero_base_capacity() {
    let mut stack = stack(0, Protection::FULL);
    assert_eq!(stack.error_state(), Some(StackError::ZeroBaseCapacity));
    assert_eq!(pop_u64(&mut stack), Err(StackError::ZeroBaseCapacity));
}

#[test]
fn test_allocation_failure_is_recorded() {
    let mut stack = RawStack::with_config(usize::MAX / 4, config(2, Protection::FULL));
    assert!(!stack.is_allocated());
    assert!(matches!(
        stack.error_state(),
        Some(StackError::AllocationFailed { .. })
    ));
}

#[test]
fn test_width_overflow_is_allocation_failure() {
    let mut stack = RawStack::with_config(usize::MAX, config(2, Protection::NONE));
    assert_eq!(
        stack.error_state(),
        Some(StackError::AllocationFailed { bytes: usize::MAX })
    );
}

// ============================================================================
// Usage errors
// ============================================================================

#[test]
fn test_underflow_leaves_destination_untouched() {
    let mut stack = stack(4, Protection::FULL);
    let mut out = [0xAA; WIDTH];

    assert_eq!(stack.pop(&mut out), Err(StackError::Underflow));
    assert_eq!(out, [0xAA; WIDTH]);
    assert_eq!(stack.len(), 0);
}

#[test]
fn test_errors_are_sticky() {
    let mut stack = stack(4, Protection::FULL);
    assert_eq!(pop_u64(&mut stack), Err(StackError::Underflow));

    assert_eq!(stack.validate(), Err(StackError::Underflow));
    assert_eq!(
        stack.push(&1u64.to_le_bytes()),
        Err(StackError::Underflow)
    );
    assert_eq!(stack.len(), 0);
    // the recorded error is part of the stamped header
    assert_eq!(stack.error_state(), Some(StackError::Underflow));
}

#[test]
fn test_first_error_wins() {
    let mut stack = stack(4, Protection::NONE);
    assert_eq!(pop_u64(&mut stack), Err(StackError::Underflow));

    stack.tamper().set_capacity(0);
    assert_eq!(stack.validate(), Err(StackError::Underflow));
}

#[test]
fn test_size_limit_leaves_stack_unchanged() {
    let growth = GrowthPolicy::default().with_max_capacity(8).unwrap();
    let mut stack = RawStack::with_config(WIDTH, config(4, Protection::FULL).with_growth(growth));
    for value in 0..8u64 {
        stack.push(&value.to_le_bytes()).unwrap();
    }

    assert_eq!(
        stack.push(&8u64.to_le_bytes()),
        Err(StackError::SizeLimitExceeded {
            requested: 16,
            limit: 8
        })
    );
    assert_eq!(stack.len(), 8);
    assert_eq!(stack.capacity(), 8);
    assert_eq!(stack.stats().expansions, 1);
}

#[test]
fn test_failed_expansion_leaves_stack_unchanged() {
    let growth = GrowthPolicy::new(1 << 40, usize::MAX, usize::MAX).unwrap();
    let width = 1 << 20;
    let mut stack = RawStack::with_config(width, config(1, Protection::FULL).with_growth(growth));
    let element = vec![0x5A; width];
    stack.push(&element).unwrap();

    let err = stack.push(&element).unwrap_err();
    assert!(matches!(err, StackError::AllocationFailed { .. }));
    assert_eq!(stack.len(), 1);
    assert_eq!(stack.capacity(), 1);
    assert_eq!(stack.stats().expansions, 0);
    assert_eq!(stack.validate(), Err(err));
    assert_eq!(stack.error_state(), Some(err));
}

#[test]
fn test_width_mismatch_is_not_sticky() {
    let mut stack = stack(4, Protection::FULL);

    assert_eq!(
        stack.push(&[1, 2]),
        Err(StackError::ElementWidthMismatch {
            expected: WIDTH,
            actual: 2
        })
    );
    assert_eq!(stack.validate(), Ok(()));

    // longer sources are truncated to the element width
    stack.push(&[7; WIDTH + 4]).unwrap();
    let mut short = [0u8; 3];
    assert_eq!(
        stack.pop(&mut short),
        Err(StackError::ElementWidthMismatch {
            expected: WIDTH,
            actual: 3
        })
    );
    assert_eq!(pop_u64(&mut stack), Ok(u64::from_le_bytes([7; WIDTH])));
}

#[test]
fn test_validate_handle() {
    assert_eq!(validate_handle(None), Err(StackError::NullHandle));

    let mut stack = stack(4, Protection::FULL);
    assert_eq!(validate_handle(Some(&mut stack)), Ok(()));
}

// ============================================================================
// Corruption detection
// ============================================================================

#[test]
fn test_metadata_checked_before_fields() {
    let mut stack = stack(4, Protection::FULL);
    stack.tamper().set_size(1_000);

    assert!(matches!(
        stack.validate(),
        Err(StackError::CorruptMetadata { .. })
    ));
}

#[test]
fn test_metadata_corruption_survives_repair() {
    let mut stack = stack(4, Protection::FULL);
    stack.tamper().set_size(3);
    assert!(matches!(
        stack.validate(),
        Err(StackError::CorruptMetadata { .. })
    ));

    stack.tamper().set_size(0);
    assert!(matches!(
        stack.push(&1u64.to_le_bytes()),
        Err(StackError::CorruptMetadata { .. })
    ));
}

#[test]
fn test_forged_metadata_checksum() {
    let mut stack = stack(4, Protection::FULL);
    let actual = stack.metadata_checksum;
    stack.tamper().set_metadata_checksum(Digest::from_raw(0));

    assert_eq!(
        stack.validate(),
        Err(StackError::CorruptMetadata {
            stored: Digest::from_raw(0),
            actual,
        })
    );
}

#[test]
fn test_lost_buffer_breaks_metadata() {
    let mut stack = stack(4, Protection::FULL);
    stack.tamper().drop_buffer();
    assert!(matches!(
        stack.validate(),
        Err(StackError::CorruptMetadata { .. })
    ));

    let mut unprotected = self::stack(4, Protection::NONE);
    unprotected.tamper().drop_buffer();
    assert_eq!(unprotected.validate(), Err(StackError::NullBuffer));
}

#[test]
fn test_payload_byte_flip() {
    let mut stack = stack(4, Protection::FULL);
    stack.push(&5u64.to_le_bytes()).unwrap();
    stack.tamper().flip_payload_byte(0);

    assert_eq!(
        stack.error_state(),
        Some(StackError::CorruptPayload {
            region: PayloadRegion::Checksum
        })
    );
    assert!(pop_u64(&mut stack).is_err());
}

#[test]
fn test_payload_flip_undetected_without_checksums() {
    let mut stack = stack(4, Protection::NONE);
    stack.push(&5u64.to_le_bytes()).unwrap();
    stack.tamper().flip_payload_byte(0);

    assert_eq!(stack.validate(), Ok(()));
    assert_eq!(pop_u64(&mut stack), Ok(5 ^ 0xFF));
}

#[test]
fn test_canary_regions() {
    let canaries_only = Protection {
        checksums: false,
        canaries: true,
    };

    let mut leading = stack(4, canaries_only);
    leading.tamper().flip_leading_canary(0);
    assert_eq!(
        leading.validate(),
        Err(StackError::CorruptPayload {
            region: PayloadRegion::LeadingCanary
        })
    );

    let mut trailing = stack(4, canaries_only);
    trailing.tamper().flip_trailing_canary(CANARY_LAST);
    assert_eq!(
        trailing.validate(),
        Err(StackError::CorruptPayload {
            region: PayloadRegion::TrailingCanary
        })
    );
}

const CANARY_LAST: usize = warden_integrity::CANARY_WIDTH - 1;

#[test]
fn test_payload_checksum_covers_guards() {
    let mut stack = stack(4, Protection::FULL);
    stack.tamper().flip_trailing_canary(CANARY_LAST);

    assert_eq!(
        stack.validate(),
        Err(StackError::CorruptPayload {
            region: PayloadRegion::Checksum
        })
    );
}

#[rstest::rstest]
#[case::zero_capacity(0, StackError::ZeroCapacity)]
#[case::capacity_mismatch(5, StackError::CapacityMismatch { capacity: 5, allocated: 32 })]
fn test_unprotected_field_checks(#[case] capacity: usize, #[case] expected: StackError) {
    let mut stack = stack(4, Protection::NONE);
    stack.tamper().set_capacity(capacity);
    assert_eq!(stack.validate(), Err(expected));
}

#[test]
fn test_size_exceeds_capacity() {
    let mut stack = stack(4, Protection::NONE);
    stack.tamper().set_size(5);

    assert_eq!(
        stack.validate(),
        Err(StackError::SizeExceedsCapacity {
            size: 5,
            capacity: 4
        })
    );
    stack.tamper().set_size(0);
    assert!(stack.error_state().is_some());
}

#[test]
fn test_zero_width_after_construction() {
    let mut stack = stack(4, Protection::NONE);
    stack.tamper().set_element_width(0);
    assert_eq!(stack.validate(), Err(StackError::ZeroElementWidth));
}

// ============================================================================
// Escalation
// ============================================================================

#[test]
#[should_panic(expected = "stack assertion failed")]
fn test_panic_policy_escalates_on_pop() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(4, Protection::FULL)
        .with_error_policy(ErrorPolicy::Panic)
        .with_dump_sink(DiagnosticSink::File(dir.path().join("err.txt")));
    let mut stack = RawStack::with_config(WIDTH, config);
    let _ = pop_u64(&mut stack);
}

#[test]
fn test_queries_never_escalate() {
    let config = config(4, Protection::FULL).with_error_policy(ErrorPolicy::Panic);
    let mut stack = RawStack::with_config(WIDTH, config);
    stack.tamper().set_size(9);

    assert!(stack.validate().is_err());
    assert!(stack.error_state().is_some());
    assert!(stack.is_allocated());
}

#[test]
fn test_fatal_report_written_before_panic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("err.txt");
    let config = config(4, Protection::FULL)
        .with_error_policy(ErrorPolicy::Panic)
        .with_dump_sink(DiagnosticSink::File(path.clone()));

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut stack = RawStack::with_config(WIDTH, config);
        stack.push(&3u64.to_le_bytes()).unwrap();
        stack.tamper().flip_payload_byte(1);
        let _ = stack.push(&4u64.to_le_bytes());
    }));
    assert!(result.is_err());

    let report = std::fs::read_to_string(path).unwrap();
    assert!(report.contains("STACK ASSERT"));
    assert!(report.contains("STK:CORRUPT:PAYLOAD"));
    assert!(report.contains("STACK DUMP"));
    assert!(report.contains("MISMATCH"));
}

#[test]
#[should_panic(expected = "Pop from an empty stack")]
fn test_assert_valid_is_always_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(4, Protection::FULL)
        .with_dump_sink(DiagnosticSink::File(dir.path().join("err.txt")));
    let mut stack = RawStack::with_config(WIDTH, config);
    let _ = pop_u64(&mut stack);
    stack.assert_valid();
}

#[test]
fn test_assert_valid_passes_healthy_stack() {
    let mut stack = stack(4, Protection::FULL);
    stack.push(&1u64.to_le_bytes()).unwrap();
    stack.assert_valid();
    assert_eq!(stack.len(), 1);
}

// ============================================================================
// Dump
// ============================================================================

#[test]
fn test_dump_contents() {
    let mut stack = RawStack::with_config(4, config(4, Protection::FULL));
    stack.push(&1u32.to_le_bytes()).unwrap();
    stack.push(&0xDEAD_BEEFu32.to_le_bytes()).unwrap();

    let dump = dump_string(&stack);
    assert!(dump.contains("STACK DUMP (called from"));
    assert!(dump.contains("tests.rs"));
    assert!(dump.contains("size            = 2"));
    assert!(dump.contains("capacity        = 4"));
    assert!(dump.contains("error state     = ok"));
    assert!(dump.contains("checksums: on, canaries: on"));
    assert!(dump.contains("payload bytes   = 8 in use of 16 allocated"));
    assert!(dump.contains("[   0] | 01 00 00 00 |"));
    assert!(dump.contains("[   1] | EF BE AD DE |"));
    assert!(!dump.contains("MISMATCH"));
    assert!(!dump.contains("CORRUPT"));
}

#[test]
fn test_dump_truncates_payload() {
    let config = config(4, Protection::FULL).with_max_dump_bytes(8);
    let mut stack = RawStack::with_config(4, config);
    for value in 0..5u32 {
        stack.push(&value.to_le_bytes()).unwrap();
    }

    let dump = dump_string(&stack);
    assert!(dump.contains("[   1] |"));
    assert!(!dump.contains("[   2] |"));
    assert!(dump.contains("... 12 more bytes not shown (limit 8)"));
}

#[test]
fn test_dump_flags_corruption() {
    let mut stack = stack(4, Protection::FULL);
    stack.tamper().flip_leading_canary(3);
    assert!(stack.validate().is_err());

    let dump = dump_string(&stack);
    assert!(dump.contains("STK:CORRUPT:PAYLOAD"));
    assert!(dump.contains("MISMATCH"));
    assert!(dump.contains("CORRUPT"));
}

#[test]
fn test_dump_clamps_forged_size() {
    let mut stack = stack(4, Protection::NONE);
    stack.tamper().set_size(100);

    let dump = dump_string(&stack);
    assert!(dump.contains("payload bytes   = 32 in use of 32 allocated"));
    assert!(dump.contains("!!! size claims 800 bytes, only 32 allocated"));
    assert!(dump.contains("checksums: off, canaries: off"));
}

#[test]
fn test_dump_destroyed_stack() {
    let mut stack = stack(4, Protection::FULL);
    stack.destroy();
    assert!(dump_string(&stack).contains("buffer          = <none>"));
}

#[test]
fn test_dump_to_file_sink_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("err_log.txt");
    let config =
        config(4, Protection::FULL).with_dump_sink(DiagnosticSink::File(path.clone()));
    let stack = RawStack::with_config(WIDTH, config);

    stack.dump().unwrap();
    stack.dump().unwrap();

    let contents = std::fs::read_to_string(path).unwrap();
    assert_eq!(contents.matches("STACK DUMP").count(), 2);
}

#[test]
fn test_report_location() {
    let stack = stack(4, Protection::FULL);
    let line = line!() + 1;
    let report = stack.report();
    assert_eq!(report.location().line(), line);
}

#[test]
fn test_debug_omits_payload() {
    let stack = stack(4, Protection::FULL);
    let debug = format!("{stack:?}");
    assert!(debug.contains("RawStack"));
    assert!(debug.contains("capacity: 4"));
    assert!(!debug.contains("checksum"));
}
