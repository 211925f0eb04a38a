//! Conversation items exchanged between the user and agent stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who contributed a conversation item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRole {
    /// The workflow input supplied by the user.
    User,
    /// Anything produced while running an agent stage.
    Agent,
}

impl fmt::Display for ItemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
        }
    }
}

/// The content of a conversation item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemPayload {
    /// Free text.
    Text {
        /// The text content.
        text: String,
    },
    /// A capability invocation issued by the model.
    ToolCall {
        /// Tool identifier (e.g. `web_search`).
        tool: String,
        /// Invocation arguments as reported by the service.
        arguments: serde_json::Value,
    },
    /// The outcome of a capability invocation.
    ToolResult {
        /// Tool identifier.
        tool: String,
        /// Result payload as reported by the service.
        output: serde_json::Value,
    },
}

impl ItemPayload {
    /// Returns the text for text payloads.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::ToolCall { .. } | Self::ToolResult { .. } => None,
        }
    }
}

/// A single immutable turn in the transcript.
///
/// An item's position is its index in the [`Transcript`](super::Transcript).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Who contributed the item.
    pub role: ItemRole,
    /// What the item carries.
    pub payload: ItemPayload,
    /// The stage that produced the item; `None` for user input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

impl ConversationItem {
    /// Creates a user text item.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: ItemRole::User,
            payload: ItemPayload::Text { text: text.into() },
            stage: None,
        }
    }

    /// Creates an agent text item.
    #[must_use]
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self {
            role: ItemRole::Agent,
            payload: ItemPayload::Text { text: text.into() },
            stage: None,
        }
    }

    /// Creates an agent tool call item.
    #[must_use]
    pub fn tool_call(tool: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            role: ItemRole::Agent,
            payload: ItemPayload::ToolCall {
                tool: tool.into(),
                arguments,
            },
            stage: None,
        }
    }

    /// Creates an agent tool result item.
    #[must_use]
    pub fn tool_result(tool: impl Into<String>, output: serde_json::Value) -> Self {
        Self {
            role: ItemRole::Agent,
            payload: ItemPayload::ToolResult {
                tool: tool.into(),
                output,
            },
            stage: None,
        }
    }

    /// Tags the item with the stage that produced it.
    #[must_use]
    pub fn from_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Returns true for user items.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == ItemRole::User
    }
}
