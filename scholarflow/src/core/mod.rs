//! Core domain model types for scholarflow.
//!
//! This module contains the values a workflow run passes between stages:
//! - Conversation items and the append-only transcript
//! - Parsed structured answers and normalized stage results

mod item;
mod output;
mod transcript;

pub use item::{ConversationItem, ItemPayload, ItemRole};
pub use output::{ParsedFields, StageResult};
pub use transcript::Transcript;
