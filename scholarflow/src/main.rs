//! Command-line entry point: runs the outreach workflow for one request.
//!
//! Usage: `scholarflow "<request text>"`
//!
//! `SCHOLARFLOW_CONFIG` names an optional JSON config file and
//! `SCHOLARFLOW_LOG_FORMAT` selects `plain` or `json` logs.

use anyhow::{bail, Context, Result};
use std::sync::Arc;

use scholarflow::config::ScholarflowConfig;
use scholarflow::observability::{init_logging, LogFormat, LoggingTraceSink};
use scholarflow::pipeline::{WorkflowInput, WorkflowPipeline};
use scholarflow::services::ResponsesClient;

fn load_config() -> Result<ScholarflowConfig> {
    let config = match std::env::var("SCHOLARFLOW_CONFIG") {
        Ok(path) => ScholarflowConfig::from_file(&path)
            .with_context(|| format!("loading config from {path}"))?,
        Err(_) => ScholarflowConfig::default(),
    };
    Ok(config.apply_env_overrides()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let format = std::env::var("SCHOLARFLOW_LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or_default();
    init_logging(format).map_err(|e| anyhow::anyhow!(e))?;

    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        bail!("usage: scholarflow \"<request text>\"");
    }

    let config = load_config()?;
    let mut client = ResponsesClient::from_env(&config.api.base_url, &config.api.api_key_env)?;
    if let Some(timeout) = config.stage_timeout() {
        client = client.with_request_timeout(timeout)?;
    }

    let pipeline = WorkflowPipeline::from_config(&config, Arc::new(client), Arc::new(LoggingTraceSink))?;
    let output = pipeline.run(WorkflowInput::new(text)).await?;

    println!("{}", serde_json::to_string_pretty(&output.draft)?);
    Ok(())
}
