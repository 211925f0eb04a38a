//! # Scholarflow
//!
//! A sequential multi-agent pipeline that researches an academic and drafts
//! an outreach email.
//!
//! Four agents run in a fixed order over one shared, append-only transcript:
//!
//! - **Extract professor info**: name, institution and research areas
//! - **Classify Agent**: research fit, contact email and webpage
//! - **Funding Agent**: funding and recruiting status, given the webpage
//! - **Write Email**: the outreach draft, given the contact email
//!
//! Every answer is validated against its output contract, and only the
//! declared fields are projected into the next agent's instructions. Any
//! failure aborts the run with an error naming the stage.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scholarflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = ScholarflowConfig::default();
//! let service = Arc::new(ResponsesClient::from_env(&config.api.base_url, &config.api.api_key_env)?);
//! let pipeline = WorkflowPipeline::from_config(&config, service, Arc::new(LoggingTraceSink))?;
//!
//! let output = pipeline.run(WorkflowInput::new("Dr. Ana Rivera, Example University")).await?;
//! println!("{}", output.draft.email_body);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod contracts;
pub mod core;
pub mod errors;
pub mod observability;
pub mod pipeline;
pub mod services;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ConfigError, ScholarflowConfig};
    pub use crate::context::{project, project_for, ProjectedContext};
    pub use crate::contracts::{
        ClassifyVerdict, EmailDraft, FundingAssessment, OutputContract, ProfessorProfile,
        StageRecord,
    };
    pub use crate::core::{ConversationItem, ParsedFields, StageResult, Transcript};
    pub use crate::errors::{PipelineValidationError, ScholarflowError, TransportError};
    pub use crate::observability::{
        init_logging, LogFormat, LoggingTraceSink, NoOpTraceSink, TraceSink,
    };
    pub use crate::pipeline::{
        PipelineState, StageId, WorkflowDefinition, WorkflowInput, WorkflowOutput,
        WorkflowPipeline,
    };
    #[cfg(feature = "http")]
    pub use crate::services::ResponsesClient;
    pub use crate::services::{CompletionRequest, CompletionResponse, CompletionService};
    pub use crate::stages::{AgentDescriptor, Capability, Instruction, ModelSettings, StageRunner};
}
