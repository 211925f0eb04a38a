//! Output contracts: the required field set a stage answer must satisfy.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::core::ParsedFields;
use crate::errors::{codes, ContractErrorInfo, PipelineValidationError};

/// Primitive type of a contract field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A JSON string.
    #[default]
    String,
}

impl FieldType {
    /// JSON Schema type name.
    #[must_use]
    pub const fn schema_type(self) -> &'static str {
        match self {
            Self::String => "string",
        }
    }

    fn accepts(self, value: &serde_json::Value) -> bool {
        match self {
            Self::String => value.is_string(),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name as it appears in the structured answer.
    pub name: String,
    /// Declared type.
    pub field_type: FieldType,
}

/// Why an answer does not satisfy its contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// The service produced no final answer.
    #[error("no structured answer")]
    NoAnswer,
    /// The answer is not a JSON object.
    #[error("answer is not an object")]
    NotAnObject,
    /// A declared field is absent.
    #[error("field '{0}' is missing")]
    MissingField(String),
    /// A declared field has the wrong type.
    #[error("field '{0}' has the wrong type")]
    WrongType(String),
    /// A declared string field is blank.
    #[error("field '{0}' is empty")]
    EmptyValue(String),
}

/// Ordered mapping from field name to type. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputContract {
    name: String,
    fields: Vec<FieldSpec>,
}

impl OutputContract {
    /// Creates an empty contract; the name is used as the JSON schema name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Declares a required string field.
    #[must_use]
    pub fn with_string_field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            field_type: FieldType::String,
        });
        self
    }

    /// Returns the contract name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared fields in order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns the declared field names in order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Returns true if the contract declares the field.
    #[must_use]
    pub fn declares(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.name == field)
    }

    /// Checks the contract itself: non-empty, with unique, non-blank names.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending stage.
    pub fn validate_definition(&self, stage: &str) -> Result<(), PipelineValidationError> {
        let invalid = |summary: String| {
            PipelineValidationError::new(format!(
                "Stage '{stage}' has an invalid output contract: {summary}"
            ))
            .with_stages(vec![stage.to_string()])
            .with_error_info(
                ContractErrorInfo::new(codes::INVALID_CONTRACT, summary)
                    .with_context_entry("contract", self.name.clone()),
            )
        };

        if self.fields.is_empty() {
            return Err(invalid("contract declares no fields".to_string()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(invalid("contract declares a blank field name".to_string()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(invalid(format!("field '{}' is declared twice", field.name)));
            }
        }

        Ok(())
    }

    /// Validates a structured answer and returns its declared fields in contract order.
    ///
    /// Undeclared fields are dropped.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check(&self, answer: Option<&serde_json::Value>) -> Result<ParsedFields, ContractViolation> {
        let answer = answer.ok_or(ContractViolation::NoAnswer)?;
        let object = answer.as_object().ok_or(ContractViolation::NotAnObject)?;

        let mut parsed = ParsedFields::new();
        for field in &self.fields {
            let value = object
                .get(&field.name)
                .ok_or_else(|| ContractViolation::MissingField(field.name.clone()))?;
            if !field.field_type.accepts(value) {
                return Err(ContractViolation::WrongType(field.name.clone()));
            }
            let text = value.as_str().unwrap_or_default();
            if text.trim().is_empty() {
                return Err(ContractViolation::EmptyValue(field.name.clone()));
            }
            parsed.insert(field.name.clone(), text);
        }

        Ok(parsed)
    }

    /// Strict JSON Schema describing the contract.
    #[must_use]
    pub fn json_schema(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    serde_json::json!({ "type": f.field_type.schema_type() }),
                )
            })
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.field_names(),
            "additionalProperties": false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn funding_contract() -> OutputContract {
        OutputContract::new("FundingAgentSchema")
            .with_string_field("Name of Professor")
            .with_string_field("email")
    }

    #[test]
    fn test_check_returns_fields_in_contract_order() {
        let answer = json!({"email": "prof@example.edu", "Name of Professor": "Grace Hopper"});
        let parsed = funding_contract().check(Some(&answer)).unwrap();

        assert_eq!(parsed.names(), vec!["Name of Professor", "email"]);
        assert_eq!(parsed.get("email"), Some("prof@example.edu"));
    }

    #[test]
    fn test_check_drops_undeclared_fields() {
        let answer = json!({"Name of Professor": "G", "email": "e", "extra": "x"});
        let parsed = funding_contract().check(Some(&answer)).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(!parsed.contains("extra"));
    }

    #[test]
    fn test_check_violations() {
        let contract = funding_contract();

        assert_eq!(contract.check(None), Err(ContractViolation::NoAnswer));
        assert_eq!(
            contract.check(Some(&json!("text"))),
            Err(ContractViolation::NotAnObject)
        );
        assert_eq!(
            contract.check(Some(&json!({"Name of Professor": "G"}))),
            Err(ContractViolation::MissingField("email".to_string()))
        );
        assert_eq!(
            contract.check(Some(&json!({"Name of Professor": "G", "email": 3}))),
            Err(ContractViolation::WrongType("email".to_string()))
        );
        assert_eq!(
            contract.check(Some(&json!({"Name of Professor": "G", "email": "  "}))),
            Err(ContractViolation::EmptyValue("email".to_string()))
        );
    }

    #[test]
    fn test_json_schema_is_strict() {
        let schema = funding_contract().json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["required"], json!(["Name of Professor", "email"]));
        assert_eq!(schema["properties"]["email"]["type"], "string");
    }

    #[test]
    fn test_validate_definition() {
        assert!(funding_contract().validate_definition("Funding").is_ok());

        let empty = OutputContract::new("Empty").validate_definition("Funding").unwrap_err();
        assert_eq!(empty.error_info.unwrap().code, codes::INVALID_CONTRACT);

        let duplicate = OutputContract::new("Dup")
            .with_string_field("email")
            .with_string_field("email")
            .validate_definition("Funding")
            .unwrap_err();
        assert!(duplicate.message.contains("declared twice"));

        assert!(OutputContract::new("Blank")
            .with_string_field(" ")
            .validate_definition("Funding")
            .is_err());
    }

    #[test]
    fn test_declares() {
        let contract = funding_contract();
        assert!(contract.declares("email"));
        assert!(!contract.declares("webpage"));
    }
}
