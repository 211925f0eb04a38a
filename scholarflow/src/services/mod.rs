//! External collaborators consumed by the pipeline.
//!
//! This module provides:
//! - The completion service contract
//! - An HTTP client for a Responses-style endpoint (feature `http`)

mod completion;
#[cfg(feature = "http")]
mod responses;

#[cfg(test)]
pub use completion::MockCompletionService;
pub use completion::{CompletionRequest, CompletionResponse, CompletionService, OutputSchema};
#[cfg(feature = "http")]
pub use responses::{build_request_body, parse_response_body, ResponsesClient};
