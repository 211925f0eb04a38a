//! Contract validation for stage answers.
//!
//! This module provides:
//! - Output contracts and answer validation
//! - Strict JSON schemas sent to the completion service
//! - Typed per-stage records

mod output_contract;
mod typed_output;

pub use output_contract::{ContractViolation, FieldSpec, FieldType, OutputContract};
pub use typed_output::{
    ClassifyVerdict, EmailDraft, FundingAssessment, ProfessorProfile, StageRecord,
};
