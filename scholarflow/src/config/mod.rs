//! Runtime configuration.
//!
//! Every field has a default matching the stock outreach workflow, so an empty
//! JSON object is a complete configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::stages::{ModelSettings, SearchContextSize};

/// Environment variable overriding the model identifier.
pub const ENV_MODEL: &str = "SCHOLARFLOW_MODEL";
/// Environment variable overriding the service base URL.
pub const ENV_BASE_URL: &str = "SCHOLARFLOW_BASE_URL";
/// Environment variable overriding the stage deadline, in seconds.
pub const ENV_STAGE_TIMEOUT: &str = "SCHOLARFLOW_STAGE_TIMEOUT";

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The content is not valid configuration JSON.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("Invalid config value for '{key}': {message}")]
    Invalid {
        /// Offending key.
        key: String,
        /// What is wrong with it.
        message: String,
    },
}

impl ConfigError {
    fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Generation parameters shared by every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_one")]
    pub temperature: f32,
    /// Nucleus sampling cutoff.
    #[serde(default = "default_one")]
    pub top_p: f32,
    /// Maximum output tokens.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Whether the service persists interactions.
    #[serde(default = "default_true")]
    pub store: bool,
}

fn default_model() -> String {
    "gpt-4.1".to_string()
}

const fn default_one() -> f32 {
    1.0
}

const fn default_max_output_tokens() -> u32 {
    2048
}

const fn default_true() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_one(),
            top_p: default_one(),
            max_output_tokens: default_max_output_tokens(),
            store: default_true(),
        }
    }
}

impl ModelConfig {
    /// Converts to per-stage model settings.
    #[must_use]
    pub fn to_settings(&self) -> ModelSettings {
        ModelSettings {
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
            store: self.store,
        }
    }
}

/// Trace scope naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Name of the per-run trace scope.
    #[serde(default = "default_workflow_name")]
    pub workflow_name: String,
    /// Value of the `__trace_source__` attribute.
    #[serde(default = "default_source")]
    pub source: String,
    /// Workflow identifier attached to every trace.
    #[serde(default = "default_workflow_id")]
    pub workflow_id: String,
}

fn default_workflow_name() -> String {
    "EmailProffPhd".to_string()
}

fn default_source() -> String {
    "agent-builder".to_string()
}

fn default_workflow_id() -> String {
    "wf_696478921d808190ad161cef7022bab00efa85288005f310".to_string()
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            workflow_name: default_workflow_name(),
            source: default_source(),
            workflow_id: default_workflow_id(),
        }
    }
}

/// Search capability parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Domains the profile extraction search is restricted to.
    #[serde(default = "default_scholar_domains")]
    pub scholar_domains: Vec<String>,
    /// Document collections describing the applicant's research interests.
    #[serde(default = "default_research_stores")]
    pub research_vector_store_ids: Vec<String>,
    /// Document collections holding the applicant's CV.
    #[serde(default = "default_applicant_stores")]
    pub applicant_vector_store_ids: Vec<String>,
    /// Web search context size.
    #[serde(default)]
    pub search_context_size: SearchContextSize,
}

fn default_scholar_domains() -> Vec<String> {
    vec!["scholar.google.com".to_string()]
}

fn default_research_stores() -> Vec<String> {
    vec!["vs_696480c04cf48191a431b1520a8ffc6f".to_string()]
}

fn default_applicant_stores() -> Vec<String> {
    vec!["vs_69647e1319748191b488beeb36081c86".to_string()]
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            scholar_domains: default_scholar_domains(),
            research_vector_store_ids: default_research_stores(),
            applicant_vector_store_ids: default_applicant_stores(),
            search_context_size: SearchContextSize::default(),
        }
    }
}

/// Completion endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; `/responses` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScholarflowConfig {
    /// Generation parameters.
    #[serde(default)]
    pub model: ModelConfig,
    /// Trace naming.
    #[serde(default)]
    pub trace: TraceConfig,
    /// Search parameters.
    #[serde(default)]
    pub search: SearchConfig,
    /// Per-stage deadline in seconds; `None` disables it.
    #[serde(default)]
    pub stage_timeout_seconds: Option<f64>,
    /// Completion endpoint.
    #[serde(default)]
    pub api: ApiConfig,
}

impl ScholarflowConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model.model = model.into();
        self
    }

    /// Sets the stage deadline.
    #[must_use]
    pub fn with_stage_timeout(mut self, seconds: f64) -> Self {
        self.stage_timeout_seconds = Some(seconds);
        self
    }

    /// Sets the completion endpoint base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }

    /// Sets the trace workflow identifier.
    #[must_use]
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.trace.workflow_id = workflow_id.into();
        self
    }

    /// Parses configuration from JSON.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed JSON, `Invalid` for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`Self::from_json_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Applies `SCHOLARFLOW_*` environment overrides.
    ///
    /// # Errors
    ///
    /// `Invalid` if an override cannot be parsed or breaks validation.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(ENV_MODEL) {
            self.model.model = model;
        }
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.api.base_url = base_url;
        }
        if let Some(raw) = lookup(ENV_STAGE_TIMEOUT) {
            let seconds = raw
                .trim()
                .parse::<f64>()
                .map_err(|e| ConfigError::invalid(ENV_STAGE_TIMEOUT, e.to_string()))?;
            self.stage_timeout_seconds = Some(seconds);
        }
        self.validate()?;
        Ok(self)
    }

    /// Returns the stage deadline as a duration.
    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_seconds
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// `Invalid` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.model.trim().is_empty() {
            return Err(ConfigError::invalid("model.model", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::invalid("model.temperature", "must be within 0..=2"));
        }
        if !(0.0..=1.0).contains(&self.model.top_p) {
            return Err(ConfigError::invalid("model.top_p", "must be within 0..=1"));
        }
        if self.model.max_output_tokens == 0 {
            return Err(ConfigError::invalid("model.max_output_tokens", "must be positive"));
        }
        if let Some(seconds) = self.stage_timeout_seconds {
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(ConfigError::invalid("stage_timeout_seconds", "must be positive"));
            }
        }
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("api.base_url", "must not be empty"));
        }
        if self.trace.workflow_name.trim().is_empty() {
            return Err(ConfigError::invalid("trace.workflow_name", "must not be empty"));
        }
        Ok(())
    }
}
