//! Step validator contract and the rules-as-data composite validator

use crate::error::ValidatorError;
use crate::field::FieldValidator;
use crate::result::ValidationResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Open-ended payload owned by a step
///
/// The orchestrator never inspects its shape; only validators and guards do.
pub type StepData = serde_json::Value;

/// Check over the whole step data, returning a message when it applies
pub type CheckFn = Arc<dyn Fn(&StepData) -> Option<String> + Send + Sync>;

/// Validates the data of one workflow step
///
/// Implementations may perform asynchronous work (e.g. look up remote state),
/// so every call is treated as a suspension point. A returned `Err` is a
/// validator defect, not a validation failure: callers convert it into
/// [`ValidationResult::internal_error`].
#[async_trait]
pub trait StepValidator: Send + Sync {
    /// Validate `data`; `is_valid` must equal `errors.is_empty()`
    async fn validate(&self, data: &StepData) -> Result<ValidationResult, ValidatorError>;
}

/// Ad hoc validator assembled from error rules, warning rules and field validators
///
/// Error rules run first, then field validators, then warning rules. Every
/// rule runs; none short-circuits.
#[derive(Clone, Default)]
pub struct CompositeValidator {
    error_rules: Vec<CheckFn>,
    fields: Vec<FieldValidator>,
    warning_rules: Vec<CheckFn>,
}

impl CompositeValidator {
    /// Empty validator (always valid)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from two ordered rule lists
    #[inline]
    #[must_use]
    pub fn from_rules(error_rules: Vec<CheckFn>, warning_rules: Vec<CheckFn>) -> Self {
        Self {
            error_rules,
            fields: Vec::new(),
            warning_rules,
        }
    }

    /// Append an error rule
    #[inline]
    #[must_use]
    pub fn error_rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&StepData) -> Option<String> + Send + Sync + 'static,
    {
        self.error_rules.push(Arc::new(rule));
        self
    }

    /// Append a warning rule
    #[inline]
    #[must_use]
    pub fn warning_rule<F>(mut self, rule: F) -> Self
    where
        F: Fn(&StepData) -> Option<String> + Send + Sync + 'static,
    {
        self.warning_rules.push(Arc::new(rule));
        self
    }

    /// Append a field validator whose violations count as errors
    #[inline]
    #[must_use]
    pub fn field(mut self, field: FieldValidator) -> Self {
        self.fields.push(field);
        self
    }

    /// Synchronous evaluation used by [`StepValidator::validate`]
    #[must_use]
    pub fn evaluate(&self, data: &StepData) -> ValidationResult {
        let mut errors: Vec<String> = self.error_rules.iter().filter_map(|rule| rule(data)).collect();
        errors.extend(self.fields.iter().flat_map(|field| field.validate_in(data)));

        let warnings = self
            .warning_rules
            .iter()
            .filter_map(|rule| rule(data))
            .collect();

        ValidationResult::from_parts(errors, warnings)
    }
}

impl fmt::Debug for CompositeValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeValidator")
            .field("error_rules", &self.error_rules.len())
            .field("fields", &self.fields)
            .field("warning_rules", &self.warning_rules.len())
            .finish()
    }
}

#[async_trait]
impl StepValidator for CompositeValidator {
    async fn validate(&self, data: &StepData) -> Result<ValidationResult, ValidatorError> {
        Ok(self.evaluate(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> CompositeValidator {
        CompositeValidator::new()
            .error_rule(|d| d.get("name").is_none().then(|| "name missing".to_string()))
            .error_rule(|d| d.get("age").is_none().then(|| "age missing".to_string()))
            .field(FieldValidator::new("email").required())
            .warning_rule(|d| d.get("nickname").is_none().then(|| "no nickname".to_string()))
    }

    #[tokio::test]
    async fn runs_all_rules_without_short_circuit() {
        let result = sample().validate(&json!({})).await.unwrap();
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec!["name missing", "age missing", "email is required"]
        );
        assert_eq!(result.warnings, vec!["no nickname"]);
    }

    #[tokio::test]
    async fn warnings_never_block() {
        let data = json!({"name": "a", "age": 3, "email": "a@b.c"});
        let result = sample().validate(&data).await.unwrap();
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn from_rules_matches_builder() {
        let err: CheckFn = Arc::new(|_| Some("always".to_string()));
        let validator = CompositeValidator::from_rules(vec![err], Vec::new());
        assert_eq!(validator.evaluate(&json!(null)).errors, vec!["always"]);
    }
}
