//! Immutable agent descriptors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::Capability;
use crate::context::ProjectedContext;
use crate::contracts::OutputContract;
use crate::errors::{codes, ContractErrorInfo, PipelineValidationError, ScholarflowError};

type InstructionFn = dyn Fn(&ProjectedContext) -> Result<String, ScholarflowError> + Send + Sync;

/// How a stage's instruction text is produced.
#[derive(Clone)]
pub enum Instruction {
    /// A fixed instruction.
    Static(String),
    /// A pure function of the projected context.
    Contextual(Arc<InstructionFn>),
}

impl Instruction {
    /// Creates a fixed instruction.
    #[must_use]
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::Static(text.into())
    }

    /// Creates a context-dependent instruction.
    ///
    /// The function reads values with [`ProjectedContext::require`] so an
    /// absent field fails the stage instead of rendering as empty text.
    #[must_use]
    pub fn contextual<F>(f: F) -> Self
    where
        F: Fn(&ProjectedContext) -> Result<String, ScholarflowError> + Send + Sync + 'static,
    {
        Self::Contextual(Arc::new(f))
    }

    /// Returns true for context-dependent instructions.
    #[must_use]
    pub const fn is_contextual(&self) -> bool {
        matches!(self, Self::Contextual(_))
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Contextual(_) => f.debug_tuple("Contextual").field(&"<fn>").finish(),
        }
    }
}

/// Generation parameters passed verbatim to the completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
    /// Maximum output size in tokens.
    pub max_output_tokens: u32,
    /// Whether the service should persist the interaction.
    pub store: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4.1".to_string(),
            temperature: 1.0,
            top_p: 1.0,
            max_output_tokens: 2048,
            store: true,
        }
    }
}

impl ModelSettings {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending setting.
    pub fn validate(&self, stage: &str) -> Result<(), PipelineValidationError> {
        let problem = if self.model.trim().is_empty() {
            Some("model must not be empty".to_string())
        } else if !(0.0..=2.0).contains(&self.temperature) {
            Some(format!("temperature {} outside 0..=2", self.temperature))
        } else if !(0.0..=1.0).contains(&self.top_p) {
            Some(format!("top_p {} outside 0..=1", self.top_p))
        } else if self.max_output_tokens == 0 {
            Some("max_output_tokens must be positive".to_string())
        } else {
            None
        };

        match problem {
            None => Ok(()),
            Some(summary) => Err(PipelineValidationError::new(format!(
                "Stage '{stage}' has invalid model settings: {summary}"
            ))
            .with_stages(vec![stage.to_string()])
            .with_error_info(ContractErrorInfo::new(codes::INVALID_SETTINGS, summary))),
        }
    }
}

/// Immutable configuration of one reasoning stage.
#[derive(Debug, Clone)]
pub struct AgentDescriptor {
    name: String,
    instruction: Instruction,
    capabilities: Vec<Capability>,
    output_contract: OutputContract,
    settings: ModelSettings,
    context_fields: Vec<String>,
}

impl AgentDescriptor {
    /// Creates a descriptor with default settings and no capabilities.
    #[must_use]
    pub fn new(name: impl Into<String>, instruction: Instruction, output_contract: OutputContract) -> Self {
        Self {
            name: name.into(),
            instruction,
            capabilities: Vec::new(),
            output_contract,
            settings: ModelSettings::default(),
            context_fields: Vec::new(),
        }
    }

    /// Enables a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Sets generation parameters.
    #[must_use]
    pub fn with_settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Declares the projected fields a contextual instruction reads.
    #[must_use]
    pub fn with_context_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the instruction.
    #[must_use]
    pub fn instruction(&self) -> &Instruction {
        &self.instruction
    }

    /// Returns the enabled capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Returns the output contract.
    #[must_use]
    pub fn output_contract(&self) -> &OutputContract {
        &self.output_contract
    }

    /// Returns the generation parameters.
    #[must_use]
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Returns the projected fields the instruction reads.
    #[must_use]
    pub fn context_fields(&self) -> &[String] {
        &self.context_fields
    }

    /// Resolves the instruction text.
    ///
    /// Every declared context field must be present; a contextual instruction
    /// never sees a missing value.
    ///
    /// # Errors
    ///
    /// `MissingField` naming this stage and the first absent context field.
    pub fn resolve_instruction(
        &self,
        context: Option<&ProjectedContext>,
    ) -> Result<String, ScholarflowError> {
        match &self.instruction {
            Instruction::Static(text) => Ok(text.clone()),
            Instruction::Contextual(f) => {
                let empty = ProjectedContext::default();
                let context = context.unwrap_or(&empty);
                for field in &self.context_fields {
                    context.require(&self.name, field)?;
                }
                f(context)
            }
        }
    }

    /// Checks the descriptor at startup.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name, an invalid contract,
    /// invalid settings, or a contextual instruction without declared fields.
    pub fn validate(&self) -> Result<(), PipelineValidationError> {
        if self.name.trim().is_empty() {
            return Err(PipelineValidationError::new("Agent name must not be empty")
                .with_error_info(ContractErrorInfo::new(codes::VALIDATION, "empty agent name")));
        }
        self.output_contract.validate_definition(&self.name)?;
        self.settings.validate(&self.name)?;

        if self.instruction.is_contextual() && self.context_fields.is_empty() {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' has a contextual instruction but declares no context fields",
                self.name
            ))
            .with_stages(vec![self.name.clone()])
            .with_error_info(
                ContractErrorInfo::new(codes::VALIDATION, "contextual instruction without fields")
                    .with_fix_hint("Declare the fields with `with_context_fields`."),
            ));
        }

        Ok(())
    }
}
