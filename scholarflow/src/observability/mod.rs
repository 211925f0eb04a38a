//! Observability utilities.
//!
//! This module provides:
//! - Trace scopes around workflow runs and stage spans
//! - Log subscriber initialization

pub mod logging;
mod tracing;

pub use logging::{init_logging, LogFormat};
pub use tracing::{
    with_trace_scope, LoggingTraceSink, NoOpTraceSink, SpanTimer, StageSpanAttributes,
    TraceMetadata, TraceSink,
};
