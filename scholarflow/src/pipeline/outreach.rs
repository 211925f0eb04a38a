//! The stock email-outreach agents.

use super::WorkflowDefinition;
use crate::config::ScholarflowConfig;
use crate::contracts::{ClassifyVerdict, EmailDraft, FundingAssessment, ProfessorProfile, StageRecord};
use crate::errors::PipelineValidationError;
use crate::stages::{
    AgentDescriptor, Capability, FileSearchConfig, Instruction, UserLocation, WebSearchConfig,
};

/// Name of the profile extraction agent.
pub const EXTRACT_INFO_AGENT: &str = "Extract professor info";
/// Name of the research-fit agent.
pub const CLASSIFY_AGENT: &str = "Classify Agent";
/// Name of the funding agent.
pub const FUNDING_AGENT: &str = "Funding Agent";
/// Name of the email drafting agent.
pub const WRITE_EMAIL_AGENT: &str = "Write Email";

const EXTRACT_INFO_INSTRUCTIONS: &str = "You are a helpful assistant who extracts research areas \
and information of professors like name, college they teach in, and research areas.";

const CLASSIFY_INSTRUCTIONS: &str = "Is the professor doing research that is related to my areas \
of research? If yes return the professor's name, college where they teach, webpage or website and \
their email id.";

fn web_search(config: &ScholarflowConfig) -> WebSearchConfig {
    WebSearchConfig::new()
        .with_context_size(config.search.search_context_size)
        .with_user_location(UserLocation::approximate())
}

/// Profile extraction, searching only scholar domains.
#[must_use]
pub fn extract_info_agent(config: &ScholarflowConfig) -> AgentDescriptor {
    AgentDescriptor::new(
        EXTRACT_INFO_AGENT,
        Instruction::fixed(EXTRACT_INFO_INSTRUCTIONS),
        ProfessorProfile::contract(),
    )
    .with_capability(Capability::WebSearch(
        web_search(config).with_allowed_domains(config.search.scholar_domains.clone()),
    ))
    .with_settings(config.model.to_settings())
}

/// Research-fit check against the applicant's research documents.
#[must_use]
pub fn classify_agent(config: &ScholarflowConfig) -> AgentDescriptor {
    AgentDescriptor::new(
        CLASSIFY_AGENT,
        Instruction::fixed(CLASSIFY_INSTRUCTIONS),
        ClassifyVerdict::contract(),
    )
    .with_capability(Capability::FileSearch(FileSearchConfig::new(
        config.search.research_vector_store_ids.clone(),
    )))
    .with_capability(Capability::WebSearch(web_search(config)))
    .with_settings(config.model.to_settings())
}

/// Funding check for the professor's webpage.
#[must_use]
pub fn funding_agent(config: &ScholarflowConfig) -> AgentDescriptor {
    AgentDescriptor::new(
        FUNDING_AGENT,
        Instruction::contextual(|ctx| {
            let webpage = ctx.require(FUNDING_AGENT, "webpage")?;
            Ok(format!(
                "Check if the professor has funding to support their research and is actively \
                 looking for PhD students. Professor webpage: {webpage}"
            ))
        }),
        FundingAssessment::contract(),
    )
    .with_context_fields(["webpage"])
    .with_capability(Capability::WebSearch(web_search(config)))
    .with_settings(config.model.to_settings())
}

/// Email draft grounded in the applicant's CV.
#[must_use]
pub fn write_email_agent(config: &ScholarflowConfig) -> AgentDescriptor {
    AgentDescriptor::new(
        WRITE_EMAIL_AGENT,
        Instruction::contextual(|ctx| {
            let email = ctx.require(WRITE_EMAIL_AGENT, "email")?;
            Ok(format!(
                "Write a formal email to the professor inquiring about PhD admissions in June 2027. \
                 Explain my experience and convince them why I am a suitable candidate for a PhD \
                 in their lab. Professor email: {email}"
            ))
        }),
        EmailDraft::contract(),
    )
    .with_context_fields(["email"])
    .with_capability(Capability::FileSearch(FileSearchConfig::new(
        config.search.applicant_vector_store_ids.clone(),
    )))
    .with_settings(config.model.to_settings())
}

/// The four stock agents as a validated workflow.
///
/// # Errors
///
/// Returns a validation error if `config` yields invalid descriptors.
pub fn email_outreach_definition(
    config: &ScholarflowConfig,
) -> Result<WorkflowDefinition, PipelineValidationError> {
    WorkflowDefinition::new(
        extract_info_agent(config),
        classify_agent(config),
        funding_agent(config),
        write_email_agent(config),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ProjectedContext;
    use crate::stages::SearchContextSize;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_agent_searches_scholar_only() {
        let agent = extract_info_agent(&ScholarflowConfig::default());
        match agent.capabilities() {
            [Capability::WebSearch(web)] => {
                assert_eq!(web.allowed_domains, vec!["scholar.google.com".to_string()]);
                assert_eq!(web.search_context_size, SearchContextSize::Medium);
            }
            other => panic!("unexpected capabilities: {other:?}"),
        }
        assert_eq!(agent.output_contract().name(), "ExtractProfessorInfoSchema");
    }

    #[test]
    fn test_classify_agent_uses_research_store_then_web() {
        let agent = classify_agent(&ScholarflowConfig::default());
        let kinds: Vec<&str> = agent.capabilities().iter().map(Capability::kind).collect();
        assert_eq!(kinds, vec!["file_search", "web_search"]);
        assert_eq!(
            agent.capabilities()[0],
            Capability::FileSearch(FileSearchConfig::new(["vs_696480c04cf48191a431b1520a8ffc6f"]))
        );
    }

    #[test]
    fn test_write_email_instruction_contains_projected_email() {
        let agent = write_email_agent(&ScholarflowConfig::default());
        let ctx = ProjectedContext::from_pairs([("email", "prof@example.edu")]);

        let text = agent.resolve_instruction(Some(&ctx)).unwrap();
        assert!(text.contains("prof@example.edu"));
        assert!(text.contains("June 2027"));
    }

    #[test]
    fn test_funding_instruction_contains_projected_webpage() {
        let agent = funding_agent(&ScholarflowConfig::default());
        let ctx = ProjectedContext::from_pairs([("webpage", "https://x.edu/~a")]);

        assert!(agent.resolve_instruction(Some(&ctx)).unwrap().ends_with("https://x.edu/~a"));
    }

    #[test]
    fn test_config_flows_into_settings() {
        let config = ScholarflowConfig::default().with_model("gpt-4.1-mini");
        let definition = email_outreach_definition(&config).unwrap();
        for binding in definition.bindings() {
            assert_eq!(binding.descriptor.settings().model, "gpt-4.1-mini");
            assert_eq!(binding.descriptor.settings().max_output_tokens, 2048);
        }
    }
}
