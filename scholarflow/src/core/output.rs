//! Normalized stage results.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};

/// Field values of a validated structured answer, in contract order.
///
/// Every value is a string; the only way to build a non-empty instance
/// outside this module is through contract validation or [`ParsedFields::insert`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedFields {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl ParsedFields {
    /// Creates an empty field mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, keeping first-insertion order.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields
            .insert(name.into(), serde_json::Value::String(value.into()));
    }

    /// Inserts a field and returns the mapping.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(serde_json::Value::as_str)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
    }

    /// Returns field names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Serializes to compact JSON text.
    #[must_use]
    pub fn to_json_text(&self) -> String {
        serde_json::Value::Object(self.fields.clone()).to_string()
    }

    /// Parses JSON text produced by [`to_json_text`](Self::to_json_text).
    ///
    /// # Errors
    ///
    /// Fails if the text is not a JSON object whose values are all strings.
    pub fn from_json_text(text: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let serde_json::Value::Object(fields) = value else {
            return Err(serde_json::Error::custom("expected a JSON object"));
        };
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_string()) {
            return Err(serde_json::Error::custom(format!(
                "field '{name}' is not a string"
            )));
        }
        Ok(Self { fields })
    }

    /// Returns the fields as a JSON value.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.fields.clone())
    }
}

/// The normalized output of one stage invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    /// The stage (agent) name.
    pub stage: String,
    /// Serialized form of `parsed`, kept for audit.
    pub raw_text: String,
    /// Validated structured fields.
    pub parsed: ParsedFields,
}

impl StageResult {
    /// Creates a result, deriving `raw_text` from the parsed fields.
    #[must_use]
    pub fn new(stage: impl Into<String>, parsed: ParsedFields) -> Self {
        Self {
            stage: stage.into(),
            raw_text: parsed.to_json_text(),
            parsed,
        }
    }

    /// Returns a parsed field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.parsed.get(field)
    }
}
