//! Canned answers for the outreach workflow.
//!
//! The values describe one consistent fictional professor so that projected
//! fields can be traced from stage to stage in assertions.

use serde_json::{json, Value};

use super::ScriptedCompletionService;
use crate::core::ConversationItem;
use crate::pipeline::outreach::{CLASSIFY_AGENT, EXTRACT_INFO_AGENT, FUNDING_AGENT, WRITE_EMAIL_AGENT};
use crate::services::CompletionResponse;

/// Webpage returned by the classify fixture.
pub const FIXTURE_WEBPAGE: &str = "https://cbio.example.edu/~rivera";
/// Email returned by the funding fixture.
pub const FIXTURE_EMAIL: &str = "prof@example.edu";

/// Extract-info answer.
#[must_use]
pub fn profile_answer() -> Value {
    json!({
        "Professor Name": "Dr. Ana Rivera",
        "College Name": "Example University",
        "Research Areas": "computational biology, protein folding",
    })
}

/// Classify answer.
#[must_use]
pub fn classify_answer() -> Value {
    json!({
        "Name of Professor": "Dr. Ana Rivera",
        "College": "Example University",
        "email id": "rivera@example.edu",
        "webpage": FIXTURE_WEBPAGE,
    })
}

/// Funding answer.
#[must_use]
pub fn funding_answer() -> Value {
    json!({
        "Name of Professor": "Dr. Ana Rivera",
        "email": FIXTURE_EMAIL,
    })
}

/// Write-email answer.
#[must_use]
pub fn email_answer() -> Value {
    json!({
        "Professor Name": "Dr. Ana Rivera",
        "email id": FIXTURE_EMAIL,
        "Email to Professor": "Dear Professor Rivera, I am writing to ask about PhD openings in your lab.",
    })
}

/// A response with one search call, the answer as agent text, and the answer.
#[must_use]
pub fn stage_response(tool: &str, answer: Value) -> CompletionResponse {
    CompletionResponse::answered(
        vec![
            ConversationItem::tool_call(tool, json!({"query": "lookup"})),
            ConversationItem::agent_text(answer.to_string()),
        ],
        answer,
    )
}

/// A service scripted for one complete successful run.
#[must_use]
pub fn outreach_script() -> ScriptedCompletionService {
    ScriptedCompletionService::new()
        .with_response(EXTRACT_INFO_AGENT, stage_response("web_search", profile_answer()))
        .with_response(CLASSIFY_AGENT, stage_response("file_search", classify_answer()))
        .with_response(FUNDING_AGENT, stage_response("web_search", funding_answer()))
        .with_response(WRITE_EMAIL_AGENT, stage_response("file_search", email_answer()))
}
