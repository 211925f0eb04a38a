//! Trace scopes and stage spans for workflow runs.
//!
//! A [`TraceSink`] observes one named scope per run plus one span per stage.
//! Sinks are purely observational and cannot change the run outcome.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::time::Instant;
use tracing::Instrument;

/// Run-level metadata attached to a trace scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceMetadata {
    /// Origin tag of the workflow.
    pub source: String,
    /// Identifier of the workflow definition.
    pub workflow_id: String,
    /// Identifier of this run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl TraceMetadata {
    /// Creates metadata for a workflow.
    #[must_use]
    pub fn new(source: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            workflow_id: workflow_id.into(),
            run_id: None,
        }
    }

    /// Sets the run ID.
    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Converts to flat trace attributes.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert("__trace_source__".to_string(), self.source.clone());
        attrs.insert("workflow_id".to_string(), self.workflow_id.clone());
        if let Some(ref v) = self.run_id {
            attrs.insert("run_id".to_string(), v.clone());
        }
        attrs
    }
}

/// Span attributes for stage execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSpanAttributes {
    /// Stage name.
    pub stage_name: String,
    /// Stage status.
    pub status: Option<String>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Error message if failed.
    pub error: Option<String>,
    /// Items the stage appended to the transcript.
    pub new_items: Option<usize>,
}

impl StageSpanAttributes {
    /// Creates new stage span attributes.
    #[must_use]
    pub fn new(stage_name: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            ..Default::default()
        }
    }

    /// Sets the stage status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets the number of appended items.
    #[must_use]
    pub fn with_new_items(mut self, count: usize) -> Self {
        self.new_items = Some(count);
        self
    }

    /// Converts to flat trace attributes.
    #[must_use]
    pub fn to_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        attrs.insert("stage.name".to_string(), self.stage_name.clone());

        if let Some(ref v) = self.status {
            attrs.insert("stage.status".to_string(), v.clone());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("stage.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.error {
            attrs.insert("stage.error".to_string(), v.clone());
        }
        if let Some(v) = self.new_items {
            attrs.insert("stage.new_items".to_string(), v.to_string());
        }

        attrs
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Observer of trace scopes and stage spans.
pub trait TraceSink: Send + Sync {
    /// A run scope opened.
    fn scope_start(&self, name: &str, metadata: &TraceMetadata);

    /// A run scope closed successfully.
    fn scope_end(&self, name: &str, duration_ms: f64, metadata: &TraceMetadata);

    /// A run scope closed with an error.
    fn scope_error(&self, name: &str, error: &str, metadata: &TraceMetadata);

    /// A stage started.
    fn stage_start(&self, stage: &str);

    /// A stage finished successfully.
    fn stage_end(&self, attributes: &StageSpanAttributes);

    /// A stage failed.
    fn stage_error(&self, attributes: &StageSpanAttributes);
}

/// Runs `body` inside a named trace scope and returns its result unchanged.
pub async fn with_trace_scope<F, T, E>(
    sink: &dyn TraceSink,
    name: &str,
    metadata: &TraceMetadata,
    body: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let span = tracing::info_span!(
        "trace_scope",
        trace_name = name,
        source = %metadata.source,
        workflow_id = %metadata.workflow_id,
        run_id = metadata.run_id.as_deref().unwrap_or_default(),
    );
    let timer = SpanTimer::start();
    sink.scope_start(name, metadata);

    let result = body.instrument(span).await;

    match &result {
        Ok(_) => sink.scope_end(name, timer.elapsed_ms(), metadata),
        Err(err) => sink.scope_error(name, &err.to_string(), metadata),
    }
    result
}

/// No-op trace sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTraceSink;

impl TraceSink for NoOpTraceSink {
    fn scope_start(&self, _name: &str, _metadata: &TraceMetadata) {}
    fn scope_end(&self, _name: &str, _duration_ms: f64, _metadata: &TraceMetadata) {}
    fn scope_error(&self, _name: &str, _error: &str, _metadata: &TraceMetadata) {}
    fn stage_start(&self, _stage: &str) {}
    fn stage_end(&self, _attributes: &StageSpanAttributes) {}
    fn stage_error(&self, _attributes: &StageSpanAttributes) {}
}

/// Trace sink that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTraceSink;

impl TraceSink for LoggingTraceSink {
    fn scope_start(&self, name: &str, metadata: &TraceMetadata) {
        tracing::info!(
            trace_name = name,
            attributes = ?metadata.to_attributes(),
            "Trace scope started"
        );
    }

    fn scope_end(&self, name: &str, duration_ms: f64, metadata: &TraceMetadata) {
        tracing::info!(
            trace_name = name,
            duration_ms,
            attributes = ?metadata.to_attributes(),
            "Trace scope ended"
        );
    }

    fn scope_error(&self, name: &str, error: &str, metadata: &TraceMetadata) {
        tracing::error!(
            trace_name = name,
            error,
            attributes = ?metadata.to_attributes(),
            "Trace scope failed"
        );
    }

    fn stage_start(&self, stage: &str) {
        tracing::debug!(stage, "Stage started");
    }

    fn stage_end(&self, attributes: &StageSpanAttributes) {
        tracing::info!(
            stage = %attributes.stage_name,
            attributes = ?attributes.to_attributes(),
            "Stage completed"
        );
    }

    fn stage_error(&self, attributes: &StageSpanAttributes) {
        tracing::error!(
            stage = %attributes.stage_name,
            attributes = ?attributes.to_attributes(),
            "Stage failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CollectingTraceSink, TraceRecord};

    #[test]
    fn test_trace_metadata_attributes() {
        let metadata = TraceMetadata::new("agent-builder", "wf_1").with_run_id("run-1");
        let attrs = metadata.to_attributes();
        assert_eq!(attrs.get("__trace_source__"), Some(&"agent-builder".to_string()));
        assert_eq!(attrs.get("workflow_id"), Some(&"wf_1".to_string()));
        assert_eq!(attrs.get("run_id"), Some(&"run-1".to_string()));
    }

    #[test]
    fn test_stage_span_attributes() {
        let attrs = StageSpanAttributes::new("Funding Agent")
            .with_status("completed")
            .with_duration_ms(12.5)
            .with_new_items(3);

        let flat = attrs.to_attributes();
        assert_eq!(flat.get("stage.name"), Some(&"Funding Agent".to_string()));
        assert_eq!(flat.get("stage.status"), Some(&"completed".to_string()));
        assert_eq!(flat.get("stage.duration_ms"), Some(&"12.5".to_string()));
        assert_eq!(flat.get("stage.new_items"), Some(&"3".to_string()));
    }

    #[tokio::test]
    async fn test_with_trace_scope_returns_body_result() {
        let sink = CollectingTraceSink::default();
        let metadata = TraceMetadata::new("agent-builder", "wf_1");

        let result: Result<u32, String> =
            with_trace_scope(&sink, "EmailProffPhd", &metadata, async { Ok(7) }).await;

        assert_eq!(result, Ok(7));
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], TraceRecord::ScopeStart("EmailProffPhd".to_string()));
        assert_eq!(records[1], TraceRecord::ScopeEnd("EmailProffPhd".to_string()));
    }

    #[tokio::test]
    async fn test_with_trace_scope_records_error() {
        let sink = CollectingTraceSink::default();
        let metadata = TraceMetadata::new("agent-builder", "wf_1");

        let result: Result<(), String> =
            with_trace_scope(&sink, "EmailProffPhd", &metadata, async { Err("boom".to_string()) })
                .await;

        assert!(result.is_err());
        assert_eq!(
            sink.records().last(),
            Some(&TraceRecord::ScopeError("EmailProffPhd".to_string(), "boom".to_string()))
        );
    }

    #[test]
    fn test_noop_sink() {
        let sink = NoOpTraceSink;
        sink.scope_start("t", &TraceMetadata::default());
        sink.stage_start("s");
        sink.stage_end(&StageSpanAttributes::new("s"));
    }
}
