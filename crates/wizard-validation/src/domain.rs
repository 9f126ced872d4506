//! Validators for the article-analysis workflow
//!
//! - [`SelectionStepValidator`]: articles chosen for analysis
//! - [`ExecutionStepValidator`]: the analysis job finished successfully
//! - [`ResultsStepValidator`]: the results payload is reviewable

use crate::error::ValidatorError;
use crate::job::{CurrentJob, JobStatus};
use crate::result::ValidationResult;
use crate::step::{CompositeValidator, StepData, StepValidator};
use async_trait::async_trait;
use serde_json::Value;

/// Step data key holding the selected articles
pub const SELECTED_ARTICLES_KEY: &str = "selectedArticles";
/// Step data key holding the analysis results
pub const RESULTS_KEY: &str = "results";

/// Selections larger than this only produce a warning
pub const DEFAULT_LARGE_SELECTION_THRESHOLD: usize = 100;

const ARTICLE_REQUIRED_FIELDS: [&str; 2] = ["id", "title"];
const RESULT_REQUIRED_FIELDS: [&str; 2] = ["articleId", "prediction"];

fn missing_fields(item: &Value, required: &[&str]) -> bool {
    required.iter().any(|field| match item.get(field) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    })
}

fn count_incomplete(items: &[Value], required: &[&str]) -> usize {
    items.iter().filter(|item| missing_fields(item, required)).count()
}

/// Validates the article selection step
///
/// Fails when nothing is selected or a selected article lacks `id`/`title`;
/// warns when the selection exceeds the large-selection threshold.
#[derive(Debug, Clone)]
pub struct SelectionStepValidator {
    threshold: usize,
    inner: CompositeValidator,
}

impl SelectionStepValidator {
    /// Validator with the default large-selection threshold
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_LARGE_SELECTION_THRESHOLD)
    }

    /// Validator warning above `threshold` selected articles
    #[must_use]
    pub fn with_threshold(threshold: usize) -> Self {
        let inner = CompositeValidator::new()
            .error_rule(|data| {
                let empty = selected(data).map_or(true, <[Value]>::is_empty);
                empty.then(|| "At least one article must be selected for analysis".to_string())
            })
            .error_rule(|data| {
                let incomplete = selected(data).map_or(0, |items| {
                    count_incomplete(items, &ARTICLE_REQUIRED_FIELDS)
                });
                (incomplete > 0).then(|| {
                    format!("{incomplete} selected article(s) are missing required fields (id, title)")
                })
            })
            .warning_rule(move |data| {
                let count = selected(data).map_or(0, <[Value]>::len);
                (count > threshold)
                    .then(|| "Large article selections may take longer to process".to_string())
            });

        Self { threshold, inner }
    }

    /// Large-selection threshold
    #[inline]
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl Default for SelectionStepValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn selected(data: &StepData) -> Option<&[Value]> {
    data.get(SELECTED_ARTICLES_KEY)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

#[async_trait]
impl StepValidator for SelectionStepValidator {
    async fn validate(&self, data: &StepData) -> Result<ValidationResult, ValidatorError> {
        Ok(self.inner.evaluate(data))
    }
}

/// Validates the analysis execution step
///
/// Only a `COMPLETED` job lets the workflow proceed. A completed job that
/// processed nothing or found nothing is accepted with warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionStepValidator;

impl ExecutionStepValidator {
    /// Create new validator instance
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn check(job: &CurrentJob) -> ValidationResult {
        match job.status {
            JobStatus::Completed => {
                let mut warnings = Vec::new();
                if job.processed_articles == 0 {
                    warnings.push("No articles were processed during the analysis".to_string());
                }
                if job.predictions_found == 0 {
                    warnings.push("No predictions were found in the analyzed articles".to_string());
                }
                ValidationResult::from_parts(Vec::new(), warnings)
            }
            JobStatus::Failed => ValidationResult::invalid(
                "Analysis job failed. Please retry the analysis before continuing",
            ),
            JobStatus::Cancelled => ValidationResult::invalid(
                "Analysis job was cancelled. Please retry the analysis before continuing",
            ),
            JobStatus::Pending | JobStatus::Running => ValidationResult::invalid(
                "Analysis job is still in progress. Please wait for it to complete",
            ),
        }
    }
}

#[async_trait]
impl StepValidator for ExecutionStepValidator {
    async fn validate(&self, data: &StepData) -> Result<ValidationResult, ValidatorError> {
        let result = match CurrentJob::from_step_data(data) {
            None => ValidationResult::invalid("No analysis job has been started"),
            Some(Ok(job)) => Self::check(&job),
            Some(Err(e)) => {
                tracing::debug!(error = %e, "unrecognized analysis job payload");
                ValidationResult::invalid("Analysis job status is not recognized")
            }
        };
        Ok(result)
    }
}

/// Validates the results review step
///
/// Fails when `results` is not an array or an entry lacks
/// `articleId`/`prediction`; warns on an empty result set.
#[derive(Debug, Clone)]
pub struct ResultsStepValidator {
    inner: CompositeValidator,
}

impl ResultsStepValidator {
    /// Create new validator instance
    #[must_use]
    pub fn new() -> Self {
        let inner = CompositeValidator::new()
            .error_rule(|data| {
                results(data)
                    .is_none()
                    .then(|| "Results data is not in the expected format".to_string())
            })
            .error_rule(|data| {
                let incomplete = results(data).map_or(0, |items| {
                    count_incomplete(items, &RESULT_REQUIRED_FIELDS)
                });
                (incomplete > 0).then(|| {
                    format!("{incomplete} result(s) are missing required fields (articleId, prediction)")
                })
            })
            .warning_rule(|data| {
                results(data)
                    .is_some_and(<[Value]>::is_empty)
                    .then(|| "No results are available for review".to_string())
            });

        Self { inner }
    }
}

impl Default for ResultsStepValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn results(data: &StepData) -> Option<&[Value]> {
    data.get(RESULTS_KEY)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

#[async_trait]
impl StepValidator for ResultsStepValidator {
    async fn validate(&self, data: &StepData) -> Result<ValidationResult, ValidatorError> {
        Ok(self.inner.evaluate(data))
    }
}
