//! Top-level driver for one workflow run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{outreach, PipelineState, StageId, StateTransition, WorkflowDefinition};
use crate::config::ScholarflowConfig;
use crate::context::{project_for, RunIdentity};
use crate::contracts::{EmailDraft, StageRecord};
use crate::core::{StageResult, Transcript};
use crate::errors::ScholarflowError;
use crate::observability::{with_trace_scope, TraceMetadata, TraceSink};
use crate::services::CompletionService;
use crate::stages::StageRunner;

/// Default trace scope name.
pub const DEFAULT_TRACE_NAME: &str = "EmailProffPhd";
/// Default `__trace_source__` value.
pub const DEFAULT_TRACE_SOURCE: &str = "agent-builder";

/// Input of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInput {
    /// The user's free-text request.
    pub input_as_text: String,
}

impl WorkflowInput {
    /// Creates an input.
    #[must_use]
    pub fn new(input_as_text: impl Into<String>) -> Self {
        Self {
            input_as_text: input_as_text.into(),
        }
    }
}

/// Output of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOutput {
    /// The final stage's result.
    pub result: StageResult,
    /// The final result as a typed draft.
    pub draft: EmailDraft,
    /// Identifier of the run.
    pub run_id: Uuid,
}

/// Runs the four-stage workflow.
///
/// Cheap to clone; every run owns its own transcript, so runs may execute
/// concurrently on one instance.
#[derive(Debug, Clone)]
pub struct WorkflowPipeline {
    definition: Arc<WorkflowDefinition>,
    runner: StageRunner,
    trace_name: String,
    trace_source: String,
    workflow_id: String,
}

impl WorkflowPipeline {
    /// Creates a pipeline over a validated definition.
    #[must_use]
    pub fn new(
        definition: WorkflowDefinition,
        service: Arc<dyn CompletionService>,
        sink: Arc<dyn TraceSink>,
    ) -> Self {
        Self {
            definition: Arc::new(definition),
            runner: StageRunner::new(service, sink),
            trace_name: DEFAULT_TRACE_NAME.to_string(),
            trace_source: DEFAULT_TRACE_SOURCE.to_string(),
            workflow_id: String::new(),
        }
    }

    /// Creates the stock outreach pipeline from configuration.
    ///
    /// # Errors
    ///
    /// `Validation` if the configured agents fail startup validation.
    pub fn from_config(
        config: &ScholarflowConfig,
        service: Arc<dyn CompletionService>,
        sink: Arc<dyn TraceSink>,
    ) -> Result<Self, ScholarflowError> {
        let definition = outreach::email_outreach_definition(config)?;
        let mut pipeline = Self::new(definition, service, sink)
            .with_trace_name(&config.trace.workflow_name)
            .with_trace_source(&config.trace.source)
            .with_workflow_id(&config.trace.workflow_id);
        if let Some(timeout) = config.stage_timeout() {
            pipeline = pipeline.with_stage_timeout(timeout);
        }
        Ok(pipeline)
    }

    /// Sets the trace scope name.
    #[must_use]
    pub fn with_trace_name(mut self, name: impl Into<String>) -> Self {
        self.trace_name = name.into();
        self
    }

    /// Sets the trace source tag.
    #[must_use]
    pub fn with_trace_source(mut self, source: impl Into<String>) -> Self {
        self.trace_source = source.into();
        self
    }

    /// Sets the workflow identifier.
    #[must_use]
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = workflow_id.into();
        self
    }

    /// Bounds every stage call by `timeout`.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.runner = self.runner.with_stage_timeout(timeout);
        self
    }

    /// Returns the definition.
    #[must_use]
    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    /// Runs the workflow.
    ///
    /// # Errors
    ///
    /// The first stage error; no later stage runs and no partial output is
    /// returned.
    pub async fn run(&self, input: WorkflowInput) -> Result<WorkflowOutput, ScholarflowError> {
        self.run_with_observer(input, |_| {}).await
    }

    /// Runs the workflow, handing every state transition to `observer`.
    ///
    /// # Errors
    ///
    /// As [`Self::run`].
    pub async fn run_with_observer<F>(
        &self,
        input: WorkflowInput,
        observer: F,
    ) -> Result<WorkflowOutput, ScholarflowError>
    where
        F: FnMut(&StateTransition) + Send,
    {
        let identity = RunIdentity::new();
        let metadata = TraceMetadata::new(&self.trace_source, &self.workflow_id)
            .with_run_id(identity.run_id.to_string());

        with_trace_scope(
            self.runner.sink().as_ref(),
            &self.trace_name,
            &metadata,
            self.drive(input, identity, observer),
        )
        .await
    }

    async fn drive<F>(
        &self,
        input: WorkflowInput,
        identity: RunIdentity,
        mut observer: F,
    ) -> Result<WorkflowOutput, ScholarflowError>
    where
        F: FnMut(&StateTransition),
    {
        let run_id = identity.run_id;
        tracing::info!(%run_id, started_at = %identity.started_at_iso(), "Workflow run started");

        let mut transcript = Transcript::seeded(input.input_as_text);
        let mut state = PipelineState::Init;
        let mut previous: Option<StageResult> = None;

        let mut transition = |state: &mut PipelineState, to: PipelineState| {
            let change = StateTransition {
                from: state.clone(),
                to,
            };
            tracing::debug!(%run_id, from = %change.from, to = %change.to, "Pipeline state transition");
            observer(&change);
            *state = change.to;
        };

        loop {
            let next = state.advance();
            transition(&mut state, next);
            let Some(stage) = state.running_stage() else {
                break;
            };

            let name = self.definition.binding(stage).name().to_string();
            match self.run_stage(stage, &mut transcript, previous.as_ref()).await {
                Ok(result) => previous = Some(result),
                Err(err) => {
                    tracing::error!(%run_id, stage = %name, error = %err, "Workflow run failed");
                    let failed = state.fail(&name, err.to_string());
                    transition(&mut state, failed);
                    return Err(err);
                }
            }
        }

        let final_stage = self.definition.binding(StageId::WriteEmail).name();
        let result = previous.ok_or_else(|| ScholarflowError::empty_stage_result(final_stage))?;
        let draft = EmailDraft::from_result(&result)?;

        tracing::info!(%run_id, transcript_len = transcript.len(), "Workflow run completed");
        Ok(WorkflowOutput {
            result,
            draft,
            run_id,
        })
    }

    async fn run_stage(
        &self,
        stage: StageId,
        transcript: &mut Transcript,
        previous: Option<&StageResult>,
    ) -> Result<StageResult, ScholarflowError> {
        let binding = self.definition.binding(stage);
        let projection = binding.projection();

        let context = match previous {
            Some(prev) if !projection.is_empty() => {
                Some(project_for(binding.name(), prev, projection)?)
            }
            _ => None,
        };

        self.runner
            .run(&binding.descriptor, transcript, context.as_ref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProjectedContext;
    use crate::core::{ItemRole, ParsedFields};
    use crate::errors::TransportError;
    use crate::pipeline::outreach::{CLASSIFY_AGENT, EXTRACT_INFO_AGENT, FUNDING_AGENT, WRITE_EMAIL_AGENT};
    use crate::services::{CompletionResponse, MockCompletionService};
    use crate::testing::{
        assert_result_fields, assert_stage_order, assert_transcript_extends, classify_answer,
        email_answer, funding_answer, outreach_script, profile_answer, stage_response,
        CollectingTraceSink,
        ScriptedCompletionService, TraceRecord, FIXTURE_EMAIL, FIXTURE_WEBPAGE,
    };
    use pretty_assertions::assert_eq;

    const ALL_AGENTS: [&str; 4] = [EXTRACT_INFO_AGENT, CLASSIFY_AGENT, FUNDING_AGENT, WRITE_EMAIL_AGENT];

    fn pipeline(service: Arc<ScriptedCompletionService>) -> (WorkflowPipeline, Arc<CollectingTraceSink>) {
        let sink = Arc::new(CollectingTraceSink::new());
        let pipeline =
            WorkflowPipeline::from_config(&ScholarflowConfig::default(), service, sink.clone()).unwrap();
        (pipeline, sink)
    }

    fn input() -> WorkflowInput {
        WorkflowInput::new("Find PhD advisors in computational biology")
    }

    #[tokio::test]
    async fn test_successful_run_returns_draft() {
        let service = Arc::new(outreach_script());
        let (pipeline, _) = pipeline(service.clone());

        let output = pipeline.run(input()).await.unwrap();

        assert_eq!(output.result.stage, WRITE_EMAIL_AGENT);
        assert_eq!(output.draft.email_id, FIXTURE_EMAIL);
        assert!(output.draft.email_body.starts_with("Dear Professor Rivera"));
        assert_eq!(
            ParsedFields::from_json_text(&output.result.raw_text).unwrap(),
            output.result.parsed
        );
        assert_stage_order(&service.invoked_stages(), &ALL_AGENTS);
    }

    #[tokio::test]
    async fn test_extract_info_result_has_profile_fields() {
        let service = Arc::new(outreach_script());
        let (pipeline, _) = pipeline(service.clone());
        pipeline.run(input()).await.unwrap();

        let requests = service.requests();
        assert_eq!(requests[0].transcript.len(), 1);
        assert_eq!(requests[0].transcript[0].role, ItemRole::User);
        assert_eq!(
            requests[0].transcript[0].payload.as_text(),
            Some("Find PhD advisors in computational biology")
        );

        let profile = StageResult::new(
            EXTRACT_INFO_AGENT,
            ParsedFields::from_json_text(&profile_answer().to_string()).unwrap(),
        );
        assert_result_fields(&profile, &["Professor Name", "College Name", "Research Areas"]);
    }

    #[tokio::test]
    async fn test_transcript_grows_append_only_across_stages() {
        let service = Arc::new(outreach_script());
        let (pipeline, _) = pipeline(service.clone());
        pipeline.run(input()).await.unwrap();

        let requests = service.requests();
        for pair in requests.windows(2) {
            assert_transcript_extends(&pair[0].transcript, &pair[1].transcript);
        }
        assert_eq!(requests[1].transcript.len(), 3);
        assert!(requests[1].transcript[1..]
            .iter()
            .all(|item| item.stage.as_deref() == Some(EXTRACT_INFO_AGENT)));
    }

    #[tokio::test]
    async fn test_missing_webpage_stops_before_funding() {
        let mut verdict = classify_answer();
        verdict.as_object_mut().unwrap().remove("webpage");
        let service = Arc::new(
            ScriptedCompletionService::new()
                .with_response(EXTRACT_INFO_AGENT, stage_response("web_search", profile_answer()))
                .with_response(CLASSIFY_AGENT, stage_response("file_search", verdict.clone())),
        );
        let (pipeline, _) = pipeline(service.clone());

        let err = pipeline.run(input()).await.unwrap_err();

        assert!(matches!(
            err,
            ScholarflowError::MissingField { ref stage, ref field }
                if stage == CLASSIFY_AGENT && field == "webpage"
        ));
        assert_stage_order(&service.invoked_stages(), &[EXTRACT_INFO_AGENT, CLASSIFY_AGENT]);

        // The projector attributes the same gap to the consuming stage.
        let partial = StageResult::new(
            CLASSIFY_AGENT,
            ParsedFields::from_json_text(&verdict.to_string()).unwrap(),
        );
        let err = project_for(FUNDING_AGENT, &partial, &["webpage"]).unwrap_err();
        assert!(matches!(
            err,
            ScholarflowError::MissingField { ref stage, ref field }
                if stage == FUNDING_AGENT && field == "webpage"
        ));
    }

    #[tokio::test]
    async fn test_funding_email_is_projected_into_write_email() {
        let service = Arc::new(outreach_script());
        let (pipeline, _) = pipeline(service.clone());
        pipeline.run(input()).await.unwrap();

        let requests = service.requests();
        assert!(requests[2].instruction.contains(FIXTURE_WEBPAGE));
        assert!(requests[3].instruction.contains(FIXTURE_EMAIL));
        assert!(!requests[3].instruction.contains(FIXTURE_WEBPAGE));

        let funding = StageResult::new(
            FUNDING_AGENT,
            ParsedFields::from_json_text(&funding_answer().to_string()).unwrap(),
        );
        let projected = project_for(WRITE_EMAIL_AGENT, &funding, StageId::WriteEmail.projection()).unwrap();
        assert_eq!(projected, ProjectedContext::from_pairs([("email", FIXTURE_EMAIL)]));
    }

    #[tokio::test]
    async fn test_transcript_grows_when_stages_return_no_items() {
        let service = Arc::new(
            ScriptedCompletionService::new()
                .with_response(EXTRACT_INFO_AGENT, CompletionResponse::answered(vec![], profile_answer()))
                .with_response(CLASSIFY_AGENT, CompletionResponse::answered(vec![], classify_answer()))
                .with_response(FUNDING_AGENT, CompletionResponse::answered(vec![], funding_answer()))
                .with_response(WRITE_EMAIL_AGENT, CompletionResponse::answered(vec![], email_answer())),
        );
        let (pipeline, _) = pipeline(service.clone());

        pipeline.run(input()).await.unwrap();

        let requests = service.requests();
        let lengths: Vec<usize> = requests.iter().map(|r| r.transcript.len()).collect();
        assert_eq!(lengths, vec![1, 2, 3, 4]);
        for pair in requests.windows(2) {
            assert_transcript_extends(&pair[0].transcript, &pair[1].transcript);
        }
        assert_eq!(requests[1].transcript[1].stage.as_deref(), Some(EXTRACT_INFO_AGENT));
        assert_eq!(requests[1].transcript[1].role, ItemRole::Agent);
    }

    #[tokio::test]
    async fn test_no_final_answer_aborts_remaining_stages() {
        let service = Arc::new(
            ScriptedCompletionService::new()
                .with_response(EXTRACT_INFO_AGENT, stage_response("web_search", profile_answer()))
                .with_response(CLASSIFY_AGENT, stage_response("file_search", classify_answer()))
                .with_response(
                    FUNDING_AGENT,
                    CompletionResponse::unanswered(vec![crate::core::ConversationItem::agent_text("?")]),
                ),
        );
        let (pipeline, sink) = pipeline(service.clone());

        let err = pipeline.run(input()).await.unwrap_err();

        assert!(matches!(err, ScholarflowError::EmptyStageResult { ref stage } if stage == FUNDING_AGENT));
        assert_stage_order(
            &service.invoked_stages(),
            &[EXTRACT_INFO_AGENT, CLASSIFY_AGENT, FUNDING_AGENT],
        );
        assert!(matches!(
            sink.records().last(),
            Some(TraceRecord::ScopeError(name, _)) if name == DEFAULT_TRACE_NAME
        ));
    }

    #[tokio::test]
    async fn test_observer_sees_every_transition_in_order() {
        let (pipeline, _) = pipeline(Arc::new(outreach_script()));
        let mut seen = Vec::new();

        pipeline
            .run_with_observer(input(), |t| seen.push(t.to.clone()))
            .await
            .unwrap();

        let mut expected: Vec<PipelineState> = StageId::ORDER
            .iter()
            .map(|&stage| PipelineState::Running { stage })
            .collect();
        expected.push(PipelineState::Done);
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_observer_sees_failed_state() {
        let service = Arc::new(
            ScriptedCompletionService::new()
                .with_response(EXTRACT_INFO_AGENT, CompletionResponse::unanswered(vec![])),
        );
        let (pipeline, _) = pipeline(service);
        let mut last = None;

        let _ = pipeline
            .run_with_observer(input(), |t| last = Some(t.clone()))
            .await;

        let last = last.unwrap();
        assert_eq!(
            last.from,
            PipelineState::Running {
                stage: StageId::ExtractInfo
            }
        );
        assert!(matches!(last.to, PipelineState::Failed { ref stage, .. } if stage == EXTRACT_INFO_AGENT));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let mut mock = MockCompletionService::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Err(TransportError::Connection("refused".to_string())));
        let sink = Arc::new(CollectingTraceSink::new());
        let pipeline =
            WorkflowPipeline::from_config(&ScholarflowConfig::default(), Arc::new(mock), sink).unwrap();

        let err = pipeline.run(input()).await.unwrap_err();
        assert!(matches!(
            err,
            ScholarflowError::Transport(TransportError::Connection(ref msg)) if msg == "refused"
        ));
    }

    #[tokio::test]
    async fn test_trace_scope_wraps_run_with_metadata() {
        let (pipeline, sink) = pipeline(Arc::new(outreach_script()));

        let output = pipeline.run(input()).await.unwrap();

        let records = sink.records();
        assert_eq!(records.first(), Some(&TraceRecord::ScopeStart(DEFAULT_TRACE_NAME.to_string())));
        assert_eq!(records.last(), Some(&TraceRecord::ScopeEnd(DEFAULT_TRACE_NAME.to_string())));
        assert_eq!(sink.completed_stages(), ALL_AGENTS.map(String::from).to_vec());

        let metadata = sink.scope_metadata();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].source, DEFAULT_TRACE_SOURCE);
        assert_eq!(
            metadata[0].workflow_id,
            "wf_696478921d808190ad161cef7022bab00efa85288005f310"
        );
        assert_eq!(metadata[0].run_id, Some(output.run_id.to_string()));
    }

    #[tokio::test]
    async fn test_stage_timeout_fails_run() {
        let service = Arc::new(outreach_script().with_delay(Duration::from_millis(500)));
        let (pipeline, _) = pipeline(service.clone());
        let pipeline = pipeline.with_stage_timeout(Duration::from_millis(20));

        let err = pipeline.run(input()).await.unwrap_err();

        assert!(matches!(err, ScholarflowError::StageTimeout { ref stage, .. } if stage == EXTRACT_INFO_AGENT));
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_runs_do_not_share_transcripts() {
        let service = Arc::new(outreach_script());
        let (pipeline, _) = pipeline(service.clone());

        let (a, b) = tokio::join!(
            pipeline.run(WorkflowInput::new("request A")),
            pipeline.run(WorkflowInput::new("request B")),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.draft, b.draft);
        assert_eq!(service.call_count(), 8);
        for request in service.requests() {
            let users: Vec<_> = request
                .transcript
                .iter()
                .filter(|item| item.is_user())
                .filter_map(|item| item.payload.as_text())
                .collect();
            assert!(users == ["request A"] || users == ["request B"]);
            assert_eq!(request.transcript.len() % 2, 1);
        }
    }

    #[test]
    fn test_pipeline_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WorkflowPipeline>();
    }

    #[test]
    fn test_run_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let (pipeline, _) = pipeline(Arc::new(outreach_script()));
        let fut = pipeline.run(input());
        assert_send(&fut);
    }

    #[tokio::test]
    async fn test_custom_trace_name() {
        let sink = Arc::new(CollectingTraceSink::new());
        let pipeline = WorkflowPipeline::from_config(
            &ScholarflowConfig::default(),
            Arc::new(outreach_script()),
            sink.clone(),
        )
        .unwrap()
        .with_trace_name("custom");

        pipeline.run(input()).await.unwrap();
        assert_eq!(sink.records()[0], TraceRecord::ScopeStart("custom".to_string()));
    }
}
