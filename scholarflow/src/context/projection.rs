//! Projection of prior-stage fields into the next stage's instructions.

use serde::{Deserialize, Serialize};

use crate::core::{ParsedFields, StageResult};
use crate::errors::ScholarflowError;

/// The minimal field subset carried from one stage into the next.
///
/// Created fresh before each dependent stage and never written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectedContext {
    fields: ParsedFields,
}

impl ProjectedContext {
    /// Builds a context from explicit values.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = ParsedFields::new();
        for (k, v) in pairs {
            fields.insert(k, v);
        }
        Self { fields }
    }

    /// Returns a projected value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field)
    }

    /// Returns a projected value, failing for `stage` if it is absent.
    ///
    /// # Errors
    ///
    /// `MissingField` naming `stage` and `field`.
    pub fn require(&self, stage: &str, field: &str) -> Result<&str, ScholarflowError> {
        self.get(field)
            .ok_or_else(|| ScholarflowError::missing_field(stage, field))
    }

    /// Returns the projected field names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.fields.names()
    }

    /// Returns the number of projected fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if nothing was projected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Extracts exactly `fields` from a previous stage's parsed output.
///
/// Fails with a `MissingField` attributed to the previous stage when a field
/// is absent. Use [`project_for`] to attribute the failure to the consuming stage.
///
/// # Errors
///
/// `MissingField` naming the first absent field.
pub fn project(previous: &StageResult, fields: &[&str]) -> Result<ProjectedContext, ScholarflowError> {
    project_for(&previous.stage, previous, fields)
}

/// Extracts `fields` from `previous` on behalf of the stage `consumer`.
///
/// In a workflow run a field the upstream contract declares is already
/// enforced when that stage answers, so a gap there is reported against the
/// upstream stage. This function only sees results that skipped that check,
/// and reports the gap against `consumer`.
///
/// # Errors
///
/// `MissingField { stage: consumer, field }` for the first absent field.
pub fn project_for(
    consumer: &str,
    previous: &StageResult,
    fields: &[&str],
) -> Result<ProjectedContext, ScholarflowError> {
    let mut projected = ParsedFields::new();
    for field in fields {
        let value = previous
            .get(field)
            .ok_or_else(|| ScholarflowError::missing_field(consumer, *field))?;
        projected.insert(*field, value);
    }
    Ok(ProjectedContext { fields: projected })
}
