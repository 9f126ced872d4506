//! Field validator: a field name bound to an ordered rule list

use crate::rules::Rule;
use crate::step::StepData;
use regex::Regex;
use serde_json::Value;

/// Validates one named field with a fluent rule list
///
/// Usage:
/// ```rust,ignore
/// let title = FieldValidator::new("title").required().min_length(3).max_length(80);
/// let errors = title.validate(&json!("Hi"));
/// ```
#[derive(Debug, Clone)]
pub struct FieldValidator {
    field: String,
    rules: Vec<Rule>,
}

impl FieldValidator {
    /// Create a validator with no rules
    #[inline]
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rules: Vec::new(),
        }
    }

    /// Field name
    #[inline]
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Rules in declaration order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Append an arbitrary rule
    #[inline]
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append [`Rule::Required`]
    #[inline]
    #[must_use]
    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }

    /// Append [`Rule::MinLength`]
    #[inline]
    #[must_use]
    pub fn min_length(self, min: usize) -> Self {
        self.rule(Rule::MinLength(min))
    }

    /// Append [`Rule::MaxLength`]
    #[inline]
    #[must_use]
    pub fn max_length(self, max: usize) -> Self {
        self.rule(Rule::MaxLength(max))
    }

    /// Append [`Rule::MinItems`]
    #[inline]
    #[must_use]
    pub fn min_items(self, min: usize) -> Self {
        self.rule(Rule::MinItems(min))
    }

    /// Append [`Rule::MaxItems`]
    #[inline]
    #[must_use]
    pub fn max_items(self, max: usize) -> Self {
        self.rule(Rule::MaxItems(max))
    }

    /// Append a pattern rule with the default message
    #[inline]
    #[must_use]
    pub fn pattern(self, regex: Regex) -> Self {
        self.rule(Rule::pattern(regex))
    }

    /// Append a pattern rule with an override message
    #[inline]
    #[must_use]
    pub fn pattern_with_message(self, regex: Regex, message: impl Into<String>) -> Self {
        self.rule(Rule::pattern_with_message(regex, message))
    }

    /// Append [`Rule::Range`]
    #[inline]
    #[must_use]
    pub fn range(self, min: f64, max: f64) -> Self {
        self.rule(Rule::Range { min, max })
    }

    /// Append a custom predicate rule
    #[inline]
    #[must_use]
    pub fn custom<F>(self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.rule(Rule::custom(predicate, message))
    }

    /// Run every rule against `value` and collect every violation
    ///
    /// Does not stop at the first failure.
    #[must_use]
    pub fn validate(&self, value: &Value) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|rule| rule.check(&self.field, value))
            .collect()
    }

    /// Look the field up in an object payload and validate it
    ///
    /// A missing key is validated as `null`.
    #[must_use]
    pub fn validate_in(&self, data: &StepData) -> Vec<String> {
        self.validate(data.get(&self.field).unwrap_or(&Value::Null))
    }
}
