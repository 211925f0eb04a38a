//! HTTP completion service for a Responses-style endpoint.
//!
//! Requests are rendered by [`build_request_body`] and replies decoded by
//! [`parse_response_body`]; both are pure so the wire format is testable
//! without a network.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::completion::{CompletionRequest, CompletionResponse, CompletionService};
use crate::core::{ConversationItem, ItemPayload, ItemRole};
use crate::errors::TransportError;
use crate::stages::Capability;

const MAX_ERROR_BODY: usize = 2048;

/// Completion service backed by `POST {base_url}/responses`.
#[derive(Debug, Clone)]
pub struct ResponsesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ResponsesClient {
    /// Creates a client for the given endpoint and key.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Creates a client reading the key from an environment variable.
    ///
    /// # Errors
    ///
    /// `TransportError::Unavailable` if the variable is unset or empty.
    pub fn from_env(base_url: impl Into<String>, api_key_env: &str) -> Result<Self, TransportError> {
        let key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                TransportError::Unavailable(format!("environment variable {api_key_env} is not set"))
            })?;
        Ok(Self::new(base_url, key))
    }

    /// Sets a request timeout on the underlying HTTP client.
    ///
    /// # Errors
    ///
    /// `TransportError::Unavailable` if the HTTP client cannot be built.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, TransportError> {
        self.http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        Ok(self)
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url)
    }
}

#[async_trait]
impl CompletionService for ResponsesClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, TransportError> {
        let body = build_request_body(&request);

        tracing::debug!(
            stage = %request.stage,
            model = %request.settings.model,
            tools = request.capabilities.len(),
            "Sending completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            if text.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        parse_response_body(&value)
    }
}

/// Renders a completion request as a Responses API body.
#[must_use]
pub fn build_request_body(request: &CompletionRequest) -> Value {
    let input: Vec<Value> = request.transcript.iter().map(render_item).collect();
    let tools: Vec<Value> = request.capabilities.iter().map(render_tool).collect();

    json!({
        "model": request.settings.model,
        "instructions": request.instruction,
        "input": input,
        "tools": tools,
        "temperature": request.settings.temperature,
        "top_p": request.settings.top_p,
        "max_output_tokens": request.settings.max_output_tokens,
        "store": request.settings.store,
        "text": {
            "format": {
                "type": "json_schema",
                "name": request.output_schema.name,
                "schema": request.output_schema.schema,
                "strict": true,
            }
        },
    })
}

fn render_item(item: &ConversationItem) -> Value {
    let role = match item.role {
        ItemRole::User => "user",
        ItemRole::Agent => "assistant",
    };
    let content = match &item.payload {
        ItemPayload::Text { text } => text.clone(),
        ItemPayload::ToolCall { tool, arguments } => format!("[{tool} call] {arguments}"),
        ItemPayload::ToolResult { tool, output } => format!("[{tool} result] {output}"),
    };
    json!({ "role": role, "content": content })
}

fn render_tool(capability: &Capability) -> Value {
    match capability {
        Capability::WebSearch(web) => {
            let mut tool = Map::new();
            tool.insert("type".into(), json!("web_search_preview"));
            if !web.allowed_domains.is_empty() {
                tool.insert(
                    "filters".into(),
                    json!({ "allowed_domains": web.allowed_domains }),
                );
            }
            tool.insert(
                "search_context_size".into(),
                json!(web.search_context_size.as_str()),
            );
            let mut location = serde_json::to_value(&web.user_location)
                .unwrap_or_else(|_| Value::Object(Map::new()));
            if let Value::Object(ref mut fields) = location {
                fields.insert("type".into(), json!("approximate"));
            }
            tool.insert("user_location".into(), location);
            Value::Object(tool)
        }
        Capability::FileSearch(files) => json!({
            "type": "file_search",
            "vector_store_ids": files.vector_store_ids,
        }),
    }
}

/// Decodes a Responses API body into new items and a final answer.
///
/// The last message's text is parsed as the structured answer; text that is
/// not valid JSON yields no answer.
///
/// # Errors
///
/// `TransportError::Unavailable` if the body carries an error object,
/// `TransportError::Decode` if it has no `output` array.
pub fn parse_response_body(body: &Value) -> Result<CompletionResponse, TransportError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(TransportError::Unavailable(message));
    }

    let output = body
        .get("output")
        .and_then(Value::as_array)
        .ok_or_else(|| TransportError::Decode("response has no output array".to_string()))?;

    let mut new_items = Vec::new();
    let mut last_message: Option<String> = None;

    for entry in output {
        match entry.get("type").and_then(Value::as_str) {
            Some("web_search_call") => {
                let action = entry.get("action").cloned().unwrap_or(Value::Null);
                new_items.push(ConversationItem::tool_call("web_search", action));
            }
            Some("file_search_call") => {
                let queries = entry.get("queries").cloned().unwrap_or(Value::Null);
                new_items.push(ConversationItem::tool_call(
                    "file_search",
                    json!({ "queries": queries }),
                ));
                if let Some(results) = entry.get("results").filter(|r| !r.is_null()) {
                    new_items.push(ConversationItem::tool_result("file_search", results.clone()));
                }
            }
            Some("message") => {
                let text = message_text(entry);
                new_items.push(ConversationItem::agent_text(text.clone()));
                last_message = Some(text);
            }
            other => {
                tracing::debug!(item_type = ?other, "Ignoring unrecognized output item");
            }
        }
    }

    let final_output = last_message.and_then(|text| serde_json::from_str::<Value>(&text).ok());
    Ok(CompletionResponse {
        new_items,
        final_output,
    })
}

fn message_text(message: &Value) -> String {
    message
        .get("content")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter(|p| p.get("type").and_then(Value::as_str) == Some("output_text"))
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}
