//! Per-run context.
//!
//! This module provides:
//! - Run identity used for trace metadata
//! - Context projection between dependent stages

mod identity;
mod projection;

pub use identity::RunIdentity;
pub use projection::{project, project_for, ProjectedContext};
