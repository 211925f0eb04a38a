//! Test assertions for transcripts and stage results.

use crate::core::{ConversationItem, StageResult};

/// Asserts that `after` starts with every item of `before`, in order, and is longer.
pub fn assert_transcript_extends(before: &[ConversationItem], after: &[ConversationItem]) {
    assert!(
        after.len() > before.len(),
        "Expected transcript to grow, got {} -> {} items",
        before.len(),
        after.len()
    );
    assert_eq!(
        &after[..before.len()],
        before,
        "Earlier transcript items were modified or reordered"
    );
}

/// Asserts that the result holds exactly the given fields, each non-empty.
pub fn assert_result_fields(result: &StageResult, expected: &[&str]) {
    assert_eq!(
        result.parsed.names(),
        expected,
        "Unexpected fields for stage '{}'",
        result.stage
    );
    for (name, value) in result.parsed.iter() {
        assert!(
            !value.trim().is_empty(),
            "Field '{name}' of stage '{}' is empty",
            result.stage
        );
    }
}

/// Asserts that the service saw exactly `expected` stages, in order.
pub fn assert_stage_order(invoked: &[String], expected: &[&str]) {
    let invoked: Vec<&str> = invoked.iter().map(String::as_str).collect();
    assert_eq!(invoked, expected, "Unexpected stage invocation order");
}
