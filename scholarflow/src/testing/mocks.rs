//! In-memory collaborators for testing workflows without a network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::errors::TransportError;
use crate::observability::{StageSpanAttributes, TraceMetadata, TraceSink};
use crate::services::{CompletionRequest, CompletionResponse, CompletionService};

/// A scripted outcome for one stage invocation.
pub type ScriptedOutcome = Result<CompletionResponse, TransportError>;

/// A completion service that replays scripted outcomes per stage.
///
/// Outcomes queued for a stage are consumed in order; the last one is
/// replayed for any further call. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedCompletionService {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedOutcome>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    delay: Option<Duration>,
}

impl ScriptedCompletionService {
    /// Creates a service with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `stage`.
    #[must_use]
    pub fn with_response(self, stage: impl Into<String>, response: CompletionResponse) -> Self {
        self.push(stage.into(), Ok(response));
        self
    }

    /// Queues a transport failure for `stage`.
    #[must_use]
    pub fn with_error(self, stage: impl Into<String>, error: TransportError) -> Self {
        self.push(stage.into(), Err(error));
        self
    }

    /// Delays every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn push(&self, stage: String, outcome: ScriptedOutcome) {
        self.scripts.lock().entry(stage).or_default().push_back(outcome);
    }

    /// Returns every request received, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Returns the stage names invoked, in call order.
    #[must_use]
    pub fn invoked_stages(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.stage.clone()).collect()
    }

    /// Returns the number of calls received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_outcome(&self, stage: &str) -> ScriptedOutcome {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(stage) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(unscripted(stage))),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Err(unscripted(stage))),
            None => Err(unscripted(stage)),
        }
    }
}

fn unscripted(stage: &str) -> TransportError {
    TransportError::Unavailable(format!("no scripted response for stage '{stage}'"))
}

#[async_trait]
impl CompletionService for ScriptedCompletionService {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, TransportError> {
        let stage = request.stage.clone();
        self.requests.lock().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.next_outcome(&stage)
    }
}

/// One observation made by a [`CollectingTraceSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceRecord {
    /// Scope opened, with its name.
    ScopeStart(String),
    /// Scope closed successfully.
    ScopeEnd(String),
    /// Scope closed with an error message.
    ScopeError(String, String),
    /// Stage started.
    StageStart(String),
    /// Stage completed.
    StageEnd(String),
    /// Stage failed with an error message.
    StageError(String, String),
}

/// A trace sink that records everything it observes.
#[derive(Debug, Default)]
pub struct CollectingTraceSink {
    records: Mutex<Vec<TraceRecord>>,
    metadata: Mutex<Vec<TraceMetadata>>,
}

impl CollectingTraceSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all records in observation order.
    #[must_use]
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    /// Returns the metadata of every opened scope.
    #[must_use]
    pub fn scope_metadata(&self) -> Vec<TraceMetadata> {
        self.metadata.lock().clone()
    }

    /// Returns the names of stages that completed, in order.
    #[must_use]
    pub fn completed_stages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                TraceRecord::StageEnd(stage) => Some(stage.clone()),
                _ => None,
            })
            .collect()
    }

    /// Clears all records.
    pub fn clear(&self) {
        self.records.lock().clear();
        self.metadata.lock().clear();
    }

    fn push(&self, record: TraceRecord) {
        self.records.lock().push(record);
    }
}

impl TraceSink for CollectingTraceSink {
    fn scope_start(&self, name: &str, metadata: &TraceMetadata) {
        self.metadata.lock().push(metadata.clone());
        self.push(TraceRecord::ScopeStart(name.to_string()));
    }

    fn scope_end(&self, name: &str, _duration_ms: f64, _metadata: &TraceMetadata) {
        self.push(TraceRecord::ScopeEnd(name.to_string()));
    }

    fn scope_error(&self, name: &str, error: &str, _metadata: &TraceMetadata) {
        self.push(TraceRecord::ScopeError(name.to_string(), error.to_string()));
    }

    fn stage_start(&self, stage: &str) {
        self.push(TraceRecord::StageStart(stage.to_string()));
    }

    fn stage_end(&self, attributes: &StageSpanAttributes) {
        self.push(TraceRecord::StageEnd(attributes.stage_name.clone()));
    }

    fn stage_error(&self, attributes: &StageSpanAttributes) {
        self.push(TraceRecord::StageError(
            attributes.stage_name.clone(),
            attributes.error.clone().unwrap_or_default(),
        ));
    }
}
