//! Analysis job status as reported by the external job client
//!
//! Consumed read-only by the execution and results step validators and
//! guards. The orchestrator never fetches it; callers place the latest status
//! in the step data under `currentJob`.

use crate::step::StepData;
use serde::{Deserialize, Serialize};

/// Step data key holding the current job
pub const CURRENT_JOB_KEY: &str = "currentJob";

/// Lifecycle of an analysis job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Queued, not started
    Pending,
    /// Processing articles
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Stopped by the user
    Cancelled,
}

impl JobStatus {
    /// Whether the job will not change status again
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// The single successful terminal state
    #[inline]
    #[must_use]
    pub fn is_successful(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Snapshot of the analysis job attached to the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentJob {
    /// Job identifier assigned by the job service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Current status
    pub status: JobStatus,
    /// Articles processed so far
    #[serde(default)]
    pub processed_articles: u64,
    /// Articles submitted
    #[serde(default)]
    pub total_articles: u64,
    /// Predictions produced
    #[serde(default)]
    pub predictions_found: u64,
}

impl CurrentJob {
    /// Job in the given status with zero counters
    #[inline]
    #[must_use]
    pub fn new(status: JobStatus) -> Self {
        Self {
            job_id: None,
            status,
            processed_articles: 0,
            total_articles: 0,
            predictions_found: 0,
        }
    }

    /// Read the job out of step data
    ///
    /// # Returns
    /// - `None` if the step has no job
    /// - `Some(Err(_))` if a job is present but malformed
    pub fn from_step_data(data: &StepData) -> Option<Result<Self, serde_json::Error>> {
        data.get(CURRENT_JOB_KEY)
            .filter(|job| !job.is_null())
            .map(|job| serde_json::from_value(job.clone()))
    }
}
