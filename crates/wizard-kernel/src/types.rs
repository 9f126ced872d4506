//! Core step types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use wizard_validation::{StepData, ValidationResult};

/// Stable identifier of a workflow step
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    /// Create from any string
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as `&str`
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StepId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StepId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Mutable state of one step for the life of a workflow session
///
/// Field ownership: the host controller writes `data`, `is_complete` and
/// `is_dirty`; the validation binding writes `is_valid`, `validation` and
/// `last_validated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    /// Matches a step definition id
    pub id: StepId,
    /// Result of the last validation run
    pub is_valid: bool,
    /// Marked complete by the host
    pub is_complete: bool,
    /// Changed since last saved/validated
    pub is_dirty: bool,
    /// Step-owned payload
    #[serde(default)]
    pub data: StepData,
    /// Last validation outcome
    #[serde(default)]
    pub validation: ValidationResult,
    /// When validation last ran, serialized as RFC 3339
    #[serde(default)]
    pub last_validated: Option<DateTime<Utc>>,
}

impl StepState {
    /// Fresh state: invalid, incomplete, clean, empty object payload
    #[must_use]
    pub fn new(id: impl Into<StepId>) -> Self {
        Self {
            id: id.into(),
            is_valid: false,
            is_complete: false,
            is_dirty: false,
            data: StepData::Object(serde_json::Map::new()),
            validation: ValidationResult::default(),
            last_validated: None,
        }
    }
}

/// Shared "unsaved changes" signal between the workflow and the auto-saver
///
/// Cloning yields another handle to the same flag. Every [`DirtyFlag::mark`]
/// also advances a change generation, so a saver can tell new edits apart
/// from a flag it re-raised itself.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlag(Arc<DirtyState>);

#[derive(Debug, Default)]
struct DirtyState {
    dirty: AtomicBool,
    generation: AtomicU64,
}

impl DirtyFlag {
    /// New clean flag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change
    #[inline]
    pub fn mark(&self) {
        self.0.generation.fetch_add(1, Ordering::SeqCst);
        self.0.dirty.store(true, Ordering::SeqCst);
    }

    /// Set the flag again without recording a new change
    #[inline]
    pub fn reassert(&self) {
        self.0.dirty.store(true, Ordering::SeqCst);
    }

    /// Clear the flag
    #[inline]
    pub fn clear(&self) {
        self.0.dirty.store(false, Ordering::SeqCst);
    }

    /// Whether the flag is set
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.0.dirty.load(Ordering::SeqCst)
    }

    /// Number of changes recorded so far
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.0.generation.load(Ordering::SeqCst)
    }
}
