//! Typed per-stage records.
//!
//! Each stage answer has a Rust record with identifier-safe field names. The
//! labels the model sees (e.g. `"Professor Name"`) are serde renames, and the
//! record's [`OutputContract`] is derived from its serialized shape so the two
//! cannot drift apart.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::OutputContract;
use crate::core::StageResult;
use crate::errors::ScholarflowError;

/// A structured stage answer with a fixed contract.
pub trait StageRecord: Serialize + DeserializeOwned + Default {
    /// Name used for the contract and the JSON schema sent to the model.
    const CONTRACT_NAME: &'static str;

    /// Derives the output contract from the record's serialized field labels.
    #[must_use]
    fn contract() -> OutputContract {
        let labels: Vec<String> = match serde_json::to_value(Self::default()) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().map(|(k, _)| k).collect(),
            _ => Vec::new(),
        };
        labels
            .into_iter()
            .fold(OutputContract::new(Self::CONTRACT_NAME), |contract, label| {
                contract.with_string_field(label)
            })
    }

    /// Reads the record back from a validated stage result.
    ///
    /// # Errors
    ///
    /// `MissingField` for the first declared label absent from the result,
    /// `EmptyStageResult` if the fields cannot be decoded.
    fn from_result(result: &StageResult) -> Result<Self, ScholarflowError> {
        let contract = Self::contract();
        if let Some(field) = contract
            .field_names()
            .into_iter()
            .find(|name| !result.parsed.contains(name))
        {
            return Err(ScholarflowError::missing_field(&result.stage, field));
        }

        serde_json::from_value(result.parsed.to_value())
            .map_err(|_| ScholarflowError::empty_stage_result(&result.stage))
    }
}

/// Extract-info answer: who the professor is and what they work on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessorProfile {
    /// Professor's name.
    #[serde(rename = "Professor Name")]
    pub professor_name: String,
    /// Institution they teach at.
    #[serde(rename = "College Name")]
    pub college_name: String,
    /// Summary of research areas.
    #[serde(rename = "Research Areas")]
    pub research_areas: String,
}

impl StageRecord for ProfessorProfile {
    const CONTRACT_NAME: &'static str = "ExtractProfessorInfoSchema";
}

/// Classify answer: contact details of a professor whose research fits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyVerdict {
    /// Professor's name.
    #[serde(rename = "Name of Professor")]
    pub professor_name: String,
    /// Institution.
    #[serde(rename = "College")]
    pub college: String,
    /// Contact address.
    #[serde(rename = "email id")]
    pub email_id: String,
    /// Homepage or lab page.
    pub webpage: String,
}

impl StageRecord for ClassifyVerdict {
    const CONTRACT_NAME: &'static str = "ClassifyAgentSchema";
}

/// Funding answer: professor confirmed to have funding and openings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingAssessment {
    /// Professor's name.
    #[serde(rename = "Name of Professor")]
    pub professor_name: String,
    /// Address the outreach email goes to.
    pub email: String,
}

impl StageRecord for FundingAssessment {
    const CONTRACT_NAME: &'static str = "FundingAgentSchema";
}

/// Final answer: the drafted outreach email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    /// Professor's name.
    #[serde(rename = "Professor Name")]
    pub professor_name: String,
    /// Recipient address.
    #[serde(rename = "email id")]
    pub email_id: String,
    /// The email text.
    #[serde(rename = "Email to Professor")]
    pub email_body: String,
}

impl StageRecord for EmailDraft {
    const CONTRACT_NAME: &'static str = "WriteEmailSchema";
}
