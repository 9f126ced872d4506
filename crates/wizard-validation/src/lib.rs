//! Wizard Validation
//!
//! Validation building blocks for guided multi-step workflows:
//! - **Rules**: stateless predicates producing an error message or nothing
//! - **Field validators**: a field name bound to an ordered list of rules
//! - **Step validators**: the `validate(step data)` contract, the rules-as-data
//!   [`CompositeValidator`], and the article-analysis domain validators
//!
//! # Example
//!
//! ```rust,ignore
//! use wizard_validation::prelude::*;
//!
//! let validator = CompositeValidator::new()
//!     .field(FieldValidator::new("title").required().max_length(120))
//!     .warning_rule(|data| data.get("notes").is_none().then(|| "No notes".to_string()));
//!
//! let result = validator.validate(&serde_json::json!({"title": "Q3"})).await?;
//! assert!(result.is_valid);
//! ```

pub mod domain;
pub mod error;
pub mod field;
pub mod job;
pub mod result;
pub mod rules;
pub mod step;

pub use domain::{
    ExecutionStepValidator, ResultsStepValidator, SelectionStepValidator,
    DEFAULT_LARGE_SELECTION_THRESHOLD, RESULTS_KEY, SELECTED_ARTICLES_KEY,
};
pub use error::ValidatorError;
pub use field::FieldValidator;
pub use job::{CurrentJob, JobStatus, CURRENT_JOB_KEY};
pub use result::{ValidationResult, INTERNAL_ERROR_MESSAGE};
pub use rules::{Predicate, Rule};
pub use step::{CheckFn, CompositeValidator, StepData, StepValidator};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing step validators
    pub use crate::{
        CompositeValidator, FieldValidator, Rule, StepData, StepValidator, ValidationResult,
        ValidatorError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
