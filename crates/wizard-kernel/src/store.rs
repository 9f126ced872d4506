//! Step state store
//!
//! Maps step ids to their [`StepState`] in registry declaration order. Shared
//! between the host controller and the validation binding; each writes only
//! the fields it owns.

use crate::error::StoreError;
use crate::registry::StepRegistry;
use crate::types::{StepId, StepState};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use wizard_validation::{StepData, ValidationResult};

/// Ordered step id -> state mapping
pub type StepStates = IndexMap<StepId, StepState>;

/// Thread-safe store of per-step state
#[derive(Debug, Default)]
pub struct StepStateStore {
    inner: RwLock<StepStates>,
}

impl StepStateStore {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state for every step of `registry`, in declaration order
    #[must_use]
    pub fn for_registry(registry: &StepRegistry) -> Self {
        Self {
            inner: RwLock::new(initial_states(registry)),
        }
    }

    /// Number of tracked steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether no steps are tracked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Copy of one step's state
    #[must_use]
    pub fn get(&self, id: &str) -> Option<StepState> {
        self.inner.read().get(id).cloned()
    }

    /// Copy of one step's payload (empty object if unknown)
    #[must_use]
    pub fn data(&self, id: &str) -> StepData {
        self.inner
            .read()
            .get(id)
            .map_or_else(|| StepData::Object(serde_json::Map::new()), |s| s.data.clone())
    }

    /// Whether the step is marked complete (false if unknown)
    #[must_use]
    pub fn is_complete(&self, id: &str) -> bool {
        self.inner.read().get(id).is_some_and(|s| s.is_complete)
    }

    /// Whether the last validation of the step passed (false if unknown)
    #[must_use]
    pub fn is_valid(&self, id: &str) -> bool {
        self.inner.read().get(id).is_some_and(|s| s.is_valid)
    }

    /// Replace a step's payload and mark it dirty
    ///
    /// # Errors
    /// `StoreError::UnknownStep` if `id` has no state
    pub fn set_data(&self, id: &str, data: StepData) -> Result<(), StoreError> {
        self.with_state(id, |state| {
            state.data = data;
            state.is_dirty = true;
        })
    }

    /// Set the completion flag
    ///
    /// # Errors
    /// `StoreError::UnknownStep` if `id` has no state
    pub fn set_complete(&self, id: &str, complete: bool) -> Result<(), StoreError> {
        self.with_state(id, |state| state.is_complete = complete)
    }

    /// Set the dirty flag
    ///
    /// # Errors
    /// `StoreError::UnknownStep` if `id` has no state
    pub fn set_dirty(&self, id: &str, dirty: bool) -> Result<(), StoreError> {
        self.with_state(id, |state| state.is_dirty = dirty)
    }

    /// Record a finished validation run
    ///
    /// # Errors
    /// `StoreError::UnknownStep` if `id` has no state
    pub fn record_validation(
        &self,
        id: &str,
        result: ValidationResult,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.with_state(id, |state| {
            state.is_valid = result.is_valid;
            state.validation = result;
            state.last_validated = Some(at);
        })
    }

    /// Reset validation fields to the never-validated state
    ///
    /// # Errors
    /// `StoreError::UnknownStep` if `id` has no state
    pub fn clear_validation(&self, id: &str) -> Result<(), StoreError> {
        self.with_state(id, |state| {
            state.is_valid = false;
            state.validation = ValidationResult::default();
            state.last_validated = None;
        })
    }

    /// Copy of the whole mapping, in order
    #[must_use]
    pub fn snapshot(&self) -> StepStates {
        self.inner.read().clone()
    }

    /// Replace the whole mapping
    pub fn replace_all(&self, states: StepStates) {
        *self.inner.write() = states;
    }

    /// Reset every step of `registry` to its fresh state
    pub fn reset(&self, registry: &StepRegistry) {
        self.replace_all(initial_states(registry));
    }

    fn with_state(&self, id: &str, f: impl FnOnce(&mut StepState)) -> Result<(), StoreError> {
        let mut guard = self.inner.write();
        let state = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownStep(StepId::from(id)))?;
        f(state);
        Ok(())
    }
}

fn initial_states(registry: &StepRegistry) -> StepStates {
    registry
        .steps()
        .iter()
        .map(|step| (step.id.clone(), StepState::new(step.id.clone())))
        .collect()
}
