//! Reasoning stages.
//!
//! A stage is an immutable [`AgentDescriptor`] executed by a [`StageRunner`]
//! against the completion service.

mod capabilities;
mod descriptor;
mod runner;

pub use capabilities::{
    Capability, FileSearchConfig, SearchContextSize, UserLocation, WebSearchConfig,
};
pub use descriptor::{AgentDescriptor, Instruction, ModelSettings};
pub use runner::StageRunner;
