//! Article-analysis workflow
//!
//! The stock three-step workflow: pick articles, run the analysis job, review
//! the results. Each step depends on the one before it.

use crate::error::RegistryError;
use crate::guard::{ExecutionStepGuard, SelectionStepGuard};
use crate::registry::{StepDefinition, StepRegistry};
use wizard_validation::{ExecutionStepValidator, ResultsStepValidator, SelectionStepValidator};

/// Article selection step id
pub const SELECT_STEP: &str = "article-selection";
/// Analysis execution step id
pub const EXECUTE_STEP: &str = "analysis-execution";
/// Results review step id
pub const RESULTS_STEP: &str = "results-review";

/// Registry of the article-analysis workflow
///
/// # Errors
/// Never in practice; the definitions are static and acyclic.
pub fn article_analysis_registry() -> Result<StepRegistry, RegistryError> {
    StepRegistry::builder()
        .step(
            StepDefinition::new(SELECT_STEP, "Article Selection", SelectionStepValidator::new())
                .with_description("Choose the articles to analyze")
                .with_guard(SelectionStepGuard),
        )
        .step(
            StepDefinition::new(EXECUTE_STEP, "Analysis Execution", ExecutionStepValidator::new())
                .with_description("Run the analysis job over the selection")
                .with_guard(ExecutionStepGuard)
                .depends_on(SELECT_STEP),
        )
        .step(
            StepDefinition::new(RESULTS_STEP, "Results Review", ResultsStepValidator::new())
                .with_description("Review predictions found by the analysis")
                .depends_on(EXECUTE_STEP),
        )
        .build()
}
