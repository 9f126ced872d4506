//! Testing utilities for the wizard workspace
//!
//! Shared fixtures, recording doubles, and the standard article-analysis workflow.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wizard_kernel::{article_analysis_registry, GuardError, NavigationGuard, StepRegistry};
use wizard_validation::{StepData, StepValidator, ValidationResult, ValidatorError};

pub use wizard_kernel::{EXECUTE_STEP, RESULTS_STEP, SELECT_STEP};

pub fn article(id: u64) -> Value {
    json!({ "id": id, "title": format!("Article {id}") })
}

pub fn articles(count: u64) -> Vec<Value> {
    (1..=count).map(article).collect()
}

pub fn selection_data(count: u64) -> Value {
    json!({ "selectedArticles": articles(count) })
}

pub fn job_data(status: &str, processed: u64, predictions: u64) -> Value {
    json!({
        "currentJob": {
            "jobId": "job-1",
            "status": status,
            "processedArticles": processed,
            "totalArticles": processed,
            "predictionsFound": predictions,
        }
    })
}

pub fn results_data(count: u64) -> Value {
    let results: Vec<Value> = (1..=count)
        .map(|i| json!({ "articleId": i, "prediction": format!("prediction {i}") }))
        .collect();
    json!({ "results": results })
}

/// Three-step article workflow: select -> execute -> review
pub fn article_workflow() -> StepRegistry {
    article_analysis_registry().unwrap()
}

pub type HookLog = Arc<Mutex<Vec<String>>>;

pub fn hook_log() -> HookLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Guard that appends `"{name}.{hook}"` to a shared log on every call
#[derive(Debug, Clone)]
pub struct RecordingGuard {
    name: String,
    log: HookLog,
    allow_leave: bool,
    allow_enter: bool,
    veto: Option<String>,
    fail_after_enter: bool,
}

impl RecordingGuard {
    pub fn new(name: impl Into<String>, log: &HookLog) -> Self {
        Self {
            name: name.into(),
            log: Arc::clone(log),
            allow_leave: true,
            allow_enter: true,
            veto: None,
            fail_after_enter: false,
        }
    }

    pub fn deny_leave(mut self) -> Self {
        self.allow_leave = false;
        self
    }

    pub fn deny_enter(mut self) -> Self {
        self.allow_enter = false;
        self
    }

    pub fn veto(mut self, reason: impl Into<String>) -> Self {
        self.veto = Some(reason.into());
        self
    }

    pub fn fail_after_enter(mut self) -> Self {
        self.fail_after_enter = true;
        self
    }

    fn record(&self, hook: &str) {
        self.log.lock().push(format!("{}.{hook}", self.name));
    }
}

#[async_trait]
impl NavigationGuard for RecordingGuard {
    async fn can_leave(&self, _current: &StepData) -> bool {
        self.record("can_leave");
        self.allow_leave
    }

    async fn can_enter(&self, _target: &StepData) -> bool {
        self.record("can_enter");
        self.allow_enter
    }

    async fn before_leave(&self, _current: &StepData) -> Result<(), GuardError> {
        self.record("before_leave");
        match &self.veto {
            Some(reason) => Err(GuardError::Vetoed(reason.clone())),
            None => Ok(()),
        }
    }

    async fn after_enter(&self, _target: &StepData) -> Result<(), GuardError> {
        self.record("after_enter");
        if self.fail_after_enter {
            return Err(GuardError::Failed("after_enter exploded".to_string()));
        }
        Ok(())
    }
}

/// Validator returning a fixed result and recording every payload it sees
///
/// Clones share counters, so a test can keep one handle while the registry owns another.
#[derive(Debug, Clone)]
pub struct CountingValidator {
    result: ValidationResult,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<StepData>>>,
}

impl CountingValidator {
    pub fn new(result: ValidationResult) -> Self {
        Self {
            result,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn passing() -> Self {
        Self::new(ValidationResult::valid())
    }

    pub fn failing(error: &str) -> Self {
        Self::new(ValidationResult::invalid(error))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<StepData> {
        self.seen.lock().clone()
    }

    pub fn last_seen(&self) -> Option<StepData> {
        self.seen.lock().last().cloned()
    }
}

#[async_trait]
impl StepValidator for CountingValidator {
    async fn validate(&self, data: &StepData) -> Result<ValidationResult, ValidatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(data.clone());
        Ok(self.result.clone())
    }
}
