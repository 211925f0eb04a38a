//! Pipeline definition and execution.
//!
//! This module provides:
//! - The run state machine
//! - Startup-validated workflow definitions
//! - The orchestrator that drives one run
//! - The stock email-outreach agents

mod definition;
mod orchestrator;
pub mod outreach;
mod state;

pub use definition::{StageBinding, WorkflowDefinition};
pub use orchestrator::{
    WorkflowInput, WorkflowOutput, WorkflowPipeline, DEFAULT_TRACE_NAME, DEFAULT_TRACE_SOURCE,
};
pub use outreach::email_outreach_definition;
pub use state::{PipelineState, StageId, StateTransition};
