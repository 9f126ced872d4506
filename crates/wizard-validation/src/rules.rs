//! Validation rule library
//!
//! Each [`Rule`] is a pure check of a single JSON value, producing an error
//! message or nothing. Rules carry no state between calls and are combined by
//! listing them in a [`crate::FieldValidator`].
//!
//! Every rule except [`Rule::Required`] passes on an absent (`null`) value, so
//! a field is optional unless `Required` is listed.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Predicate used by [`Rule::Custom`]; returns `true` when the value is acceptable
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A single reusable validation rule
#[derive(Clone)]
pub enum Rule {
    /// Value must be present and not blank (null, empty string, empty array)
    Required,
    /// String must contain at least this many characters
    MinLength(usize),
    /// String must contain at most this many characters
    MaxLength(usize),
    /// Array must contain at least this many items
    MinItems(usize),
    /// Array must contain at most this many items
    MaxItems(usize),
    /// String must match the pattern
    Pattern {
        /// Compiled pattern
        regex: Regex,
        /// Message overriding the default "format is invalid"
        message: Option<String>,
    },
    /// Number must lie in `[min, max]`
    Range {
        /// Inclusive lower bound
        min: f64,
        /// Inclusive upper bound
        max: f64,
    },
    /// Arbitrary predicate with its own message
    Custom {
        /// Check to run
        predicate: Predicate,
        /// Message reported when the predicate rejects the value
        message: String,
    },
}

impl Rule {
    /// Pattern rule with the default message
    #[inline]
    #[must_use]
    pub fn pattern(regex: Regex) -> Self {
        Self::Pattern {
            regex,
            message: None,
        }
    }

    /// Pattern rule with an override message
    #[inline]
    #[must_use]
    pub fn pattern_with_message(regex: Regex, message: impl Into<String>) -> Self {
        Self::Pattern {
            regex,
            message: Some(message.into()),
        }
    }

    /// Custom predicate rule
    #[inline]
    #[must_use]
    pub fn custom<F>(predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Custom {
            predicate: Arc::new(predicate),
            message: message.into(),
        }
    }

    /// Check `value` for the field named `field`
    ///
    /// # Returns
    /// - `None` if the value satisfies the rule
    /// - `Some(message)` describing the violation
    #[must_use]
    pub fn check(&self, field: &str, value: &Value) -> Option<String> {
        if let Self::Required = self {
            return is_blank(value).then(|| format!("{field} is required"));
        }
        if value.is_null() {
            return None;
        }

        match self {
            Self::Required => None,
            Self::MinLength(min) => value
                .as_str()
                .filter(|s| s.chars().count() < *min)
                .map(|_| format!("{field} must be at least {min} characters")),
            Self::MaxLength(max) => value
                .as_str()
                .filter(|s| s.chars().count() > *max)
                .map(|_| format!("{field} must be at most {max} characters")),
            Self::MinItems(min) => value
                .as_array()
                .filter(|items| items.len() < *min)
                .map(|_| format!("{field} must contain at least {min} items")),
            Self::MaxItems(max) => value
                .as_array()
                .filter(|items| items.len() > *max)
                .map(|_| format!("{field} must contain at most {max} items")),
            Self::Pattern { regex, message } => value
                .as_str()
                .filter(|s| !regex.is_match(s))
                .map(|_| {
                    message
                        .clone()
                        .unwrap_or_else(|| format!("{field} format is invalid"))
                }),
            Self::Range { min, max } => value
                .as_f64()
                .filter(|n| n < min || n > max)
                .map(|_| format!("{field} must be between {min} and {max}")),
            Self::Custom { predicate, message } => {
                (!predicate(value)).then(|| message.clone())
            }
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "Required"),
            Self::MinLength(n) => write!(f, "MinLength({n})"),
            Self::MaxLength(n) => write!(f, "MaxLength({n})"),
            Self::MinItems(n) => write!(f, "MinItems({n})"),
            Self::MaxItems(n) => write!(f, "MaxItems({n})"),
            Self::Pattern { regex, .. } => write!(f, "Pattern({})", regex.as_str()),
            Self::Range { min, max } => write!(f, "Range({min}..={max})"),
            Self::Custom { message, .. } => write!(f, "Custom({message:?})"),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
