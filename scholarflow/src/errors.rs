//! Error types for the scholarflow pipeline.
//!
//! Every error here is fatal for the run that produced it. Nothing is
//! retried at this layer and no partial pipeline output is synthesized.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::ConfigError;

/// Stable error codes surfaced through [`ScholarflowError::code`].
pub mod codes {
    /// A stage produced no usable structured answer.
    pub const EMPTY_STAGE_RESULT: &str = "STAGE-001-EMPTY";
    /// A required field was absent from a stage answer or projection.
    pub const MISSING_FIELD: &str = "STAGE-002-MISSING_FIELD";
    /// A stage did not finish within its deadline.
    pub const STAGE_TIMEOUT: &str = "STAGE-003-TIMEOUT";
    /// The completion service failed at the transport or service level.
    pub const TRANSPORT: &str = "SERVICE-001-TRANSPORT";
    /// Workflow definition rejected at startup.
    pub const VALIDATION: &str = "CONTRACT-001-VALIDATION";
    /// Output contract declares no fields or duplicates one.
    pub const INVALID_CONTRACT: &str = "CONTRACT-002-SCHEMA";
    /// A projection reads a field the upstream contract never declares.
    pub const UNDECLARED_PROJECTION: &str = "CONTRACT-003-PROJECTION";
    /// Generation settings outside their accepted range.
    pub const INVALID_SETTINGS: &str = "CONTRACT-004-SETTINGS";
    /// Configuration could not be loaded.
    pub const CONFIG: &str = "CONFIG-001";
}

/// The main error type for a workflow run.
#[derive(Debug, Error)]
pub enum ScholarflowError {
    /// A stage returned no structured answer, or one that fails its contract.
    #[error("Stage '{stage}' produced no usable structured result")]
    EmptyStageResult {
        /// The failing stage.
        stage: String,
    },

    /// A contractually required field was absent.
    #[error("Stage '{stage}' is missing required field '{field}'")]
    MissingField {
        /// The stage whose answer or projection lacked the field.
        stage: String,
        /// The absent field.
        field: String,
    },

    /// A stage exceeded its configured deadline.
    #[error("Stage '{stage}' timed out after {timeout_ms}ms")]
    StageTimeout {
        /// The stage that timed out.
        stage: String,
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The completion service call failed.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// The workflow definition was rejected at startup.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// Configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl ScholarflowError {
    /// Creates an empty stage result error.
    #[must_use]
    pub fn empty_stage_result(stage: impl Into<String>) -> Self {
        Self::EmptyStageResult {
            stage: stage.into(),
        }
    }

    /// Creates a missing field error.
    #[must_use]
    pub fn missing_field(stage: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            stage: stage.into(),
            field: field.into(),
        }
    }

    /// Returns the stage this error is attributed to, if any.
    #[must_use]
    pub fn stage(&self) -> Option<&str> {
        match self {
            Self::EmptyStageResult { stage }
            | Self::MissingField { stage, .. }
            | Self::StageTimeout { stage, .. } => Some(stage),
            Self::Transport(_) | Self::Validation(_) | Self::Config(_) => None,
        }
    }

    /// Returns the stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyStageResult { .. } => codes::EMPTY_STAGE_RESULT,
            Self::MissingField { .. } => codes::MISSING_FIELD,
            Self::StageTimeout { .. } => codes::STAGE_TIMEOUT,
            Self::Transport(_) => codes::TRANSPORT,
            Self::Validation(err) => err
                .error_info
                .as_ref()
                .map_or(codes::VALIDATION, |info| info.code),
            Self::Config(_) => codes::CONFIG,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        if let Some(stage) = self.stage() {
            map.insert("stage".to_string(), serde_json::json!(stage));
        }
        if let Self::MissingField { field, .. } = self {
            map.insert("field".to_string(), serde_json::json!(field));
        }
        map
    }
}

/// Failures of the completion service at the transport or service level.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The service answered with a non-success status.
    #[error("Completion service returned HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The request never reached the service.
    #[error("Completion service connection failed: {0}")]
    Connection(String),

    /// The service response could not be decoded.
    #[error("Completion service response could not be decoded: {0}")]
    Decode(String),

    /// The service is not reachable in this environment (e.g. missing credentials).
    #[error("Completion service unavailable: {0}")]
    Unavailable(String),
}

/// Metadata about a contract error for better diagnostics.
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CONTRACT-003-PROJECTION").
    pub code: &'static str,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: &'static str, summary: impl Into<String>) -> Self {
        Self {
            code,
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a workflow definition fails startup validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }
}
