//! Error types for validator defects
//!
//! A failed validation is not an error: it is a [`crate::ValidationResult`]
//! with `is_valid == false`. These errors describe validators that could not
//! produce a result at all.

/// Validator defect
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidatorError {
    /// Step data did not have the shape the validator needs to run
    #[error("malformed step data: {0}")]
    MalformedData(String),

    /// A collaborator the validator depends on was unavailable
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// Validator infrastructure error
    #[error("internal validator error: {0}")]
    Internal(String),
}

impl ValidatorError {
    /// Whether re-running the validator later may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
