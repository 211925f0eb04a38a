//! Completion service contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::ConversationItem;
use crate::errors::TransportError;
use crate::stages::{Capability, ModelSettings};

/// Named JSON schema the final answer must follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Schema name.
    pub name: String,
    /// Strict JSON schema.
    pub schema: serde_json::Value,
}

/// One stage invocation as seen by the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Name of the invoking stage.
    pub stage: String,
    /// Resolved instruction text.
    pub instruction: String,
    /// Transcript snapshot used as conversational grounding.
    pub transcript: Vec<ConversationItem>,
    /// Capabilities the service may invoke for this stage.
    pub capabilities: Vec<Capability>,
    /// Generation parameters, passed through verbatim.
    pub settings: ModelSettings,
    /// Schema of the expected structured answer.
    pub output_schema: OutputSchema,
}

/// What the service produced for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Items produced during the invocation, in order.
    #[serde(default)]
    pub new_items: Vec<ConversationItem>,
    /// The final structured answer, if any.
    #[serde(default)]
    pub final_output: Option<serde_json::Value>,
}

impl CompletionResponse {
    /// A response with a final answer and the given items.
    #[must_use]
    pub fn answered(new_items: Vec<ConversationItem>, final_output: serde_json::Value) -> Self {
        Self {
            new_items,
            final_output: Some(final_output),
        }
    }

    /// A response with items but no final answer.
    #[must_use]
    pub fn unanswered(new_items: Vec<ConversationItem>) -> Self {
        Self {
            new_items,
            final_output: None,
        }
    }
}

/// The external language-model invocation boundary.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Runs one stage invocation.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` when the call fails at the transport or
    /// service level. A successful call without a final answer is not an error
    /// here.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, TransportError>;
}
