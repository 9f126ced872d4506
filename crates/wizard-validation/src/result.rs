//! Step validation outcome

use serde::{Deserialize, Serialize};

/// Message reported when a validator fails internally instead of returning a result
pub const INTERNAL_ERROR_MESSAGE: &str = "Validation failed due to an internal error";

/// Outcome of validating one step's data
///
/// `is_valid` always equals `errors.is_empty()` for results built through the
/// constructors below. Warnings are informational and never affect validity.
/// The default value is the initial "not yet validated" state: invalid with
/// no messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Whether the step data passed every error rule
    pub is_valid: bool,
    /// Blocking problems, in rule order
    #[serde(default)]
    pub errors: Vec<String>,
    /// Non-blocking notices, in rule order
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Build a result from collected messages
    #[inline]
    #[must_use]
    pub fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Valid result with no messages
    #[inline]
    #[must_use]
    pub fn valid() -> Self {
        Self::from_parts(Vec::new(), Vec::new())
    }

    /// Invalid result with a single error
    #[inline]
    #[must_use]
    pub fn invalid(error: impl Into<String>) -> Self {
        Self::from_parts(vec![error.into()], Vec::new())
    }

    /// Terminal result used when a validator crashed or returned a defect
    #[inline]
    #[must_use]
    pub fn internal_error() -> Self {
        Self::invalid(INTERNAL_ERROR_MESSAGE)
    }

    /// Append a warning, keeping validity untouched
    #[inline]
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Whether any warnings were produced
    #[inline]
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_invalid_and_empty() {
        let result = ValidationResult::default();
        assert!(!result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn validity_tracks_errors_only() {
        let result = ValidationResult::valid().with_warning("slow");
        assert!(result.is_valid);
        assert!(result.has_warnings());

        let result = ValidationResult::from_parts(vec!["bad".into()], vec![]);
        assert!(!result.is_valid);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(ValidationResult::internal_error()).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["errors"][0], INTERNAL_ERROR_MESSAGE);
    }
}
