//! Testing utilities for scholarflow workflows.
//!
//! This module provides:
//! - A scripted completion service and a collecting trace sink
//! - Canned stage answers for the outreach workflow
//! - Assertions over transcripts and stage results

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_result_fields, assert_stage_order, assert_transcript_extends};
pub use fixtures::{
    classify_answer, email_answer, funding_answer, outreach_script, profile_answer,
    stage_response, FIXTURE_EMAIL, FIXTURE_WEBPAGE,
};
pub use mocks::{CollectingTraceSink, ScriptedCompletionService, ScriptedOutcome, TraceRecord};
