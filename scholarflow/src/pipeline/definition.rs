//! Workflow definitions validated at startup.

use std::collections::HashSet;
use std::sync::Arc;

use super::StageId;
use crate::contracts::{EmailDraft, StageRecord};
use crate::errors::{codes, ContractErrorInfo, PipelineValidationError};
use crate::stages::AgentDescriptor;

/// A descriptor bound to its slot in the workflow.
#[derive(Debug, Clone)]
pub struct StageBinding {
    /// The slot.
    pub stage: StageId,
    /// The agent that runs in it.
    pub descriptor: Arc<AgentDescriptor>,
}

impl StageBinding {
    /// Fields this stage receives from the previous stage.
    #[must_use]
    pub const fn projection(&self) -> &'static [&'static str] {
        self.stage.projection()
    }

    /// Agent name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }
}

/// Four validated agents, one per [`StageId`].
///
/// Immutable once built and shared read-only across runs.
#[derive(Debug, Clone)]
pub struct WorkflowDefinition {
    bindings: [StageBinding; 4],
}

impl WorkflowDefinition {
    /// Binds and validates the four agents.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a descriptor is invalid, two agents share
    /// a name, a projected field is not declared by the upstream contract, a
    /// contextual instruction reads fields other than its projection, or the
    /// final stage cannot produce an email draft.
    pub fn new(
        extract_info: AgentDescriptor,
        classify: AgentDescriptor,
        funding: AgentDescriptor,
        write_email: AgentDescriptor,
    ) -> Result<Self, PipelineValidationError> {
        let bind = |stage, descriptor| StageBinding {
            stage,
            descriptor: Arc::new(descriptor),
        };
        let definition = Self {
            bindings: [
                bind(StageId::ExtractInfo, extract_info),
                bind(StageId::Classify, classify),
                bind(StageId::Funding, funding),
                bind(StageId::WriteEmail, write_email),
            ],
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Returns the binding for a stage.
    #[must_use]
    pub fn binding(&self, stage: StageId) -> &StageBinding {
        &self.bindings[stage.index()]
    }

    /// Returns the descriptor for a stage.
    #[must_use]
    pub fn descriptor(&self, stage: StageId) -> &Arc<AgentDescriptor> {
        &self.binding(stage).descriptor
    }

    /// Returns all bindings in execution order.
    #[must_use]
    pub fn bindings(&self) -> &[StageBinding] {
        &self.bindings
    }

    fn validate(&self) -> Result<(), PipelineValidationError> {
        let mut names = HashSet::new();
        for binding in &self.bindings {
            binding.descriptor.validate()?;
            if !names.insert(binding.name()) {
                return Err(PipelineValidationError::new(format!(
                    "Agent name '{}' is used by more than one stage",
                    binding.name()
                ))
                .with_stages(vec![binding.name().to_string()])
                .with_error_info(ContractErrorInfo::new(codes::VALIDATION, "duplicate agent name")));
            }
        }

        for binding in &self.bindings {
            self.validate_projection(binding)?;
        }

        let final_stage = self.binding(StageId::WriteEmail);
        let contract = final_stage.descriptor.output_contract();
        if let Some(missing) = EmailDraft::contract()
            .field_names()
            .into_iter()
            .find(|field| !contract.declares(field))
        {
            return Err(PipelineValidationError::new(format!(
                "Stage '{}' must declare field '{missing}' to produce an email draft",
                final_stage.name()
            ))
            .with_stages(vec![final_stage.name().to_string()])
            .with_error_info(
                ContractErrorInfo::new(codes::INVALID_CONTRACT, "final stage cannot produce a draft")
                    .with_context_entry("field", missing),
            ));
        }

        Ok(())
    }

    fn validate_projection(&self, binding: &StageBinding) -> Result<(), PipelineValidationError> {
        let projection = binding.projection();
        let descriptor = &binding.descriptor;

        if let Some(upstream) = binding.stage.previous().map(|stage| self.binding(stage)) {
            let contract = upstream.descriptor.output_contract();
            if let Some(field) = projection.iter().find(|field| !contract.declares(field)) {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' projects field '{field}' which stage '{}' does not declare",
                    binding.name(),
                    upstream.name()
                ))
                .with_stages(vec![upstream.name().to_string(), binding.name().to_string()])
                .with_error_info(
                    ContractErrorInfo::new(codes::UNDECLARED_PROJECTION, "undeclared projected field")
                        .with_fix_hint(format!(
                            "Add '{field}' to the output contract of '{}'.",
                            upstream.name()
                        ))
                        .with_context_entry("field", *field),
                ));
            }
        }

        if descriptor.instruction().is_contextual() {
            let declared: Vec<&str> = descriptor.context_fields().iter().map(String::as_str).collect();
            if declared != projection {
                return Err(PipelineValidationError::new(format!(
                    "Stage '{}' reads context fields {declared:?} but receives {projection:?}",
                    binding.name()
                ))
                .with_stages(vec![binding.name().to_string()])
                .with_error_info(
                    ContractErrorInfo::new(codes::UNDECLARED_PROJECTION, "context fields differ from projection")
                        .with_fix_hint("Declare exactly the projected fields with `with_context_fields`."),
                ));
            }
        }

        Ok(())
    }
}
