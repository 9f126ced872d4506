//! Navigation guards
//!
//! A guard controls entry to and exit from one step. For a transition
//! `A -> B` the hooks run strictly in this order, never concurrently:
//!
//! 1. `A.can_leave`  - false rejects, nothing else runs
//! 2. `B.can_enter`  - false rejects
//! 3. `A.before_leave` - raising rejects (side effects of 1-2 are not undone)
//! 4. the current step pointer moves to `B`
//! 5. `B.after_enter` - failure is logged, the pointer stays on `B`
//!
//! `can_leave`/`can_enter` are expected to be free of side effects; nothing
//! enforces this.

use crate::error::GuardError;
use async_trait::async_trait;
use wizard_validation::{CurrentJob, JobStatus, StepData, SELECTED_ARTICLES_KEY};

/// Entry/exit policy for one step
///
/// Every hook may suspend.
#[async_trait]
pub trait NavigationGuard: Send + Sync {
    /// Whether the workflow may leave the step holding `current`
    async fn can_leave(&self, current: &StepData) -> bool;

    /// Whether the workflow may enter the step holding `target`
    async fn can_enter(&self, target: &StepData) -> bool;

    /// Side-effecting hook before leaving; an error vetoes the transition
    async fn before_leave(&self, _current: &StepData) -> Result<(), GuardError> {
        Ok(())
    }

    /// Side-effecting hook after entering; errors never revert the transition
    async fn after_enter(&self, _target: &StepData) -> Result<(), GuardError> {
        Ok(())
    }
}

/// Guard for the article selection step
///
/// Leaving requires at least one selected article.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionStepGuard;

#[async_trait]
impl NavigationGuard for SelectionStepGuard {
    async fn can_leave(&self, current: &StepData) -> bool {
        current
            .get(SELECTED_ARTICLES_KEY)
            .and_then(serde_json::Value::as_array)
            .is_some_and(|items| !items.is_empty())
    }

    async fn can_enter(&self, _target: &StepData) -> bool {
        true
    }
}

/// Guard for the analysis execution step
///
/// `can_leave` always passes; `before_leave` vetoes while the job is still
/// pending or running so an in-flight analysis is never abandoned.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionStepGuard;

#[async_trait]
impl NavigationGuard for ExecutionStepGuard {
    async fn can_leave(&self, _current: &StepData) -> bool {
        true
    }

    async fn can_enter(&self, _target: &StepData) -> bool {
        true
    }

    async fn before_leave(&self, current: &StepData) -> Result<(), GuardError> {
        match CurrentJob::from_step_data(current) {
            Some(Ok(job)) if matches!(job.status, JobStatus::Pending | JobStatus::Running) => {
                Err(GuardError::Vetoed(
                    "Analysis job is still running. Cancel it or wait for it to finish".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    async fn after_enter(&self, target: &StepData) -> Result<(), GuardError> {
        if let Some(Ok(job)) = CurrentJob::from_step_data(target) {
            tracing::debug!(status = ?job.status, "entered execution step with existing job");
        }
        Ok(())
    }
}
