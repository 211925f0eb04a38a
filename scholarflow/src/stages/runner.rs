//! Executes one agent descriptor against the completion service.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use super::AgentDescriptor;
use crate::context::ProjectedContext;
use crate::contracts::ContractViolation;
use crate::core::{ConversationItem, StageResult, Transcript};
use crate::errors::ScholarflowError;
use crate::observability::{SpanTimer, StageSpanAttributes, TraceSink};
use crate::services::{CompletionRequest, CompletionService, OutputSchema};

/// Runs stages one invocation at a time.
///
/// The runner holds no per-run state; the transcript is owned by the caller.
#[derive(Clone)]
pub struct StageRunner {
    service: Arc<dyn CompletionService>,
    sink: Arc<dyn TraceSink>,
    stage_timeout: Option<Duration>,
}

impl std::fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRunner")
            .field("stage_timeout", &self.stage_timeout)
            .finish_non_exhaustive()
    }
}

impl StageRunner {
    /// Creates a runner without a stage deadline.
    #[must_use]
    pub fn new(service: Arc<dyn CompletionService>, sink: Arc<dyn TraceSink>) -> Self {
        Self {
            service,
            sink,
            stage_timeout: None,
        }
    }

    /// Bounds every completion call by `timeout`.
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    /// Returns the stage deadline, if any.
    #[must_use]
    pub const fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout
    }

    /// Returns the trace sink stage events are reported to.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn TraceSink> {
        &self.sink
    }

    /// Runs one stage.
    ///
    /// On success the items the service produced are appended to `transcript`
    /// tagged with the stage name. When the service produced none, the answer
    /// itself is appended as agent text. On failure `transcript` is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// - `MissingField` if a context field or a declared answer field is absent
    /// - `EmptyStageResult` if the answer is absent or unusable
    /// - `Transport` if the completion service fails
    /// - `StageTimeout` if the stage deadline expires
    pub async fn run(
        &self,
        descriptor: &AgentDescriptor,
        transcript: &mut Transcript,
        context: Option<&ProjectedContext>,
    ) -> Result<StageResult, ScholarflowError> {
        let stage = descriptor.name().to_string();
        let span = tracing::info_span!("stage", stage = %stage);

        async {
            self.sink.stage_start(&stage);
            let timer = SpanTimer::start();

            match self.invoke(descriptor, transcript, context).await {
                Ok((result, appended)) => {
                    self.sink.stage_end(
                        &StageSpanAttributes::new(&stage)
                            .with_status("completed")
                            .with_duration_ms(timer.elapsed_ms())
                            .with_new_items(appended),
                    );
                    Ok(result)
                }
                Err(err) => {
                    self.sink.stage_error(
                        &StageSpanAttributes::new(&stage)
                            .with_status("failed")
                            .with_duration_ms(timer.elapsed_ms())
                            .with_error(err.to_string()),
                    );
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn invoke(
        &self,
        descriptor: &AgentDescriptor,
        transcript: &mut Transcript,
        context: Option<&ProjectedContext>,
    ) -> Result<(StageResult, usize), ScholarflowError> {
        let stage = descriptor.name();
        let instruction = descriptor.resolve_instruction(context)?;
        let contract = descriptor.output_contract();

        let request = CompletionRequest {
            stage: stage.to_string(),
            instruction,
            transcript: transcript.snapshot(),
            capabilities: descriptor.capabilities().to_vec(),
            settings: descriptor.settings().clone(),
            output_schema: OutputSchema {
                name: contract.name().to_string(),
                schema: contract.json_schema(),
            },
        };

        tracing::debug!(
            stage,
            transcript_len = request.transcript.len(),
            "Invoking completion service"
        );

        let response = match self.stage_timeout {
            Some(limit) => tokio::time::timeout(limit, self.service.complete(request))
                .await
                .map_err(|_| ScholarflowError::StageTimeout {
                    stage: stage.to_string(),
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })??,
            None => self.service.complete(request).await?,
        };

        let parsed = contract
            .check(response.final_output.as_ref())
            .map_err(|violation| {
                tracing::warn!(stage, %violation, "Stage answer rejected");
                match violation {
                    ContractViolation::MissingField(field) => {
                        ScholarflowError::missing_field(stage, field)
                    }
                    _ => ScholarflowError::empty_stage_result(stage),
                }
            })?;

        let result = StageResult::new(stage, parsed);

        // A successful stage always leaves its answer in the transcript.
        let mut new_items = response.new_items;
        if new_items.is_empty() {
            new_items.push(ConversationItem::agent_text(result.raw_text.clone()));
        }
        let appended = new_items.len();
        transcript.append(new_items.into_iter().map(|item| item.from_stage(stage)));

        Ok((result, appended))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::OutputContract;
    use crate::errors::TransportError;
    use crate::services::{CompletionResponse, MockCompletionService};
    use crate::stages::Instruction;
    use crate::testing::{CollectingTraceSink, ScriptedCompletionService, TraceRecord};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn funding_agent() -> AgentDescriptor {
        AgentDescriptor::new(
            "Funding Agent",
            Instruction::contextual(|ctx| {
                Ok(format!("Check funding at {}", ctx.require("Funding Agent", "webpage")?))
            }),
            OutputContract::new("FundingAgentSchema")
                .with_string_field("Name of Professor")
                .with_string_field("email"),
        )
        .with_context_fields(["webpage"])
    }

    fn webpage() -> ProjectedContext {
        ProjectedContext::from_pairs([("webpage", "https://x.edu/~a")])
    }

    fn runner(service: Arc<dyn CompletionService>) -> (StageRunner, Arc<CollectingTraceSink>) {
        let sink = Arc::new(CollectingTraceSink::default());
        (StageRunner::new(service, sink.clone()), sink)
    }

    #[tokio::test]
    async fn test_run_appends_tagged_items_and_parses_answer() {
        let service = Arc::new(ScriptedCompletionService::new().with_response(
            "Funding Agent",
            CompletionResponse::answered(
                vec![
                    ConversationItem::tool_call("web_search", json!({"query": "funding"})),
                    ConversationItem::agent_text("{\"Name of Professor\":\"A\",\"email\":\"a@x.edu\"}"),
                ],
                json!({"Name of Professor": "A", "email": "a@x.edu", "confidence": "high"}),
            ),
        ));
        let (runner, sink) = runner(service.clone());
        let mut transcript = Transcript::seeded("Dr. A");

        let result = runner
            .run(&funding_agent(), &mut transcript, Some(&webpage()))
            .await
            .unwrap();

        assert_eq!(result.stage, "Funding Agent");
        assert_eq!(result.get("email"), Some("a@x.edu"));
        assert_eq!(result.parsed.len(), 2);
        assert_eq!(transcript.len(), 3);
        assert!(transcript.items()[1..]
            .iter()
            .all(|item| item.stage.as_deref() == Some("Funding Agent")));

        let requests = service.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].instruction, "Check funding at https://x.edu/~a");
        assert_eq!(requests[0].transcript, vec![ConversationItem::user_text("Dr. A")]);
        assert_eq!(requests[0].output_schema.name, "FundingAgentSchema");

        assert_eq!(
            sink.records(),
            vec![
                TraceRecord::StageStart("Funding Agent".to_string()),
                TraceRecord::StageEnd("Funding Agent".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_answer_without_items_is_appended_as_agent_text() {
        let service = Arc::new(ScriptedCompletionService::new().with_response(
            "Funding Agent",
            CompletionResponse::answered(vec![], json!({"Name of Professor": "A", "email": "a@x.edu"})),
        ));
        let (runner, sink) = runner(service);
        let mut transcript = Transcript::seeded("Dr. A");

        let result = runner
            .run(&funding_agent(), &mut transcript, Some(&webpage()))
            .await
            .unwrap();

        assert_eq!(transcript.len(), 2);
        let appended = &transcript.items()[1];
        assert_eq!(appended.stage.as_deref(), Some("Funding Agent"));
        assert_eq!(appended.payload.as_text(), Some(result.raw_text.as_str()));
        assert!(matches!(
            sink.records().last(),
            Some(TraceRecord::StageEnd(stage)) if stage == "Funding Agent"
        ));
    }

    #[tokio::test]
    async fn test_missing_declared_field_leaves_transcript_unchanged() {
        let service = Arc::new(ScriptedCompletionService::new().with_response(
            "Funding Agent",
            CompletionResponse::answered(
                vec![ConversationItem::agent_text("partial")],
                json!({"Name of Professor": "A"}),
            ),
        ));
        let (runner, sink) = runner(service);
        let mut transcript = Transcript::seeded("Dr. A");

        let err = runner
            .run(&funding_agent(), &mut transcript, Some(&webpage()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScholarflowError::MissingField { ref stage, ref field }
                if stage == "Funding Agent" && field == "email"
        ));
        assert_eq!(transcript.len(), 1);
        assert!(matches!(sink.records().last(), Some(TraceRecord::StageError(_, _))));
    }

    #[tokio::test]
    async fn test_no_final_answer_is_empty_stage_result() {
        let service = Arc::new(ScriptedCompletionService::new().with_response(
            "Funding Agent",
            CompletionResponse::unanswered(vec![ConversationItem::agent_text("I could not find it")]),
        ));
        let (runner, _) = runner(service);
        let mut transcript = Transcript::seeded("Dr. A");

        let err = runner
            .run(&funding_agent(), &mut transcript, Some(&webpage()))
            .await
            .unwrap_err();

        assert!(matches!(err, ScholarflowError::EmptyStageResult { ref stage } if stage == "Funding Agent"));
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_string_value_is_empty_stage_result() {
        let service = Arc::new(ScriptedCompletionService::new().with_response(
            "Funding Agent",
            CompletionResponse::answered(vec![], json!({"Name of Professor": "A", "email": "  "})),
        ));
        let (runner, _) = runner(service);
        let mut transcript = Transcript::seeded("Dr. A");

        let err = runner
            .run(&funding_agent(), &mut transcript, Some(&webpage()))
            .await
            .unwrap_err();
        assert!(matches!(err, ScholarflowError::EmptyStageResult { .. }));
    }

    #[tokio::test]
    async fn test_contextual_stage_without_context_is_missing_field() {
        let service = Arc::new(ScriptedCompletionService::new());
        let (runner, _) = runner(service.clone());
        let mut transcript = Transcript::seeded("Dr. A");

        let err = runner.run(&funding_agent(), &mut transcript, None).await.unwrap_err();

        assert!(matches!(err, ScholarflowError::MissingField { ref field, .. } if field == "webpage"));
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_propagates_unchanged() {
        let mut mock = MockCompletionService::new();
        mock.expect_complete()
            .times(1)
            .returning(|_| Err(TransportError::Http { status: 503, body: "busy".to_string() }));
        let (runner, _) = runner(Arc::new(mock));
        let mut transcript = Transcript::seeded("Dr. A");

        let err = runner
            .run(&funding_agent(), &mut transcript, Some(&webpage()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScholarflowError::Transport(TransportError::Http { status: 503, .. })
        ));
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test]
    async fn test_stage_timeout() {
        let service = Arc::new(
            ScriptedCompletionService::new()
                .with_response(
                    "Funding Agent",
                    CompletionResponse::answered(vec![], json!({"Name of Professor": "A", "email": "a@x.edu"})),
                )
                .with_delay(Duration::from_millis(500)),
        );
        let (runner, _) = runner(service);
        let runner = runner.with_stage_timeout(Duration::from_millis(20));
        let mut transcript = Transcript::seeded("Dr. A");

        let err = runner
            .run(&funding_agent(), &mut transcript, Some(&webpage()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScholarflowError::StageTimeout { ref stage, timeout_ms: 20 } if stage == "Funding Agent"
        ));
        assert_eq!(transcript.len(), 1);
    }
}
