//! Host workflow controller
//!
//! Owns the registry, the step state store, the current step pointer and the
//! validation binding of the active step. Navigation follows the guard
//! protocol documented in [`crate::guard`]; forward moves are additionally
//! gated by the dependency resolver before any guard runs.

use crate::binding::{BindingConfig, ValidationBinding, ValidationEvent};
use crate::error::{NavigationError, StoreError};
use crate::registry::{StepDefinition, StepRegistry};
use crate::store::{StepStateStore, StepStates};
use crate::types::{DirtyFlag, StepId, StepState};
use std::sync::Arc;
use tokio::sync::broadcast;
use wizard_validation::StepData;

const EVENT_CAPACITY: usize = 128;

/// Guided multi-step workflow
pub struct Wizard {
    registry: Arc<StepRegistry>,
    store: Arc<StepStateStore>,
    current: usize,
    binding: ValidationBinding,
    binding_config: BindingConfig,
    dirty: DirtyFlag,
    events: broadcast::Sender<ValidationEvent>,
}

impl Wizard {
    /// New workflow positioned on the first step, with fresh step states
    ///
    /// The first step is bound but not validated; call [`Wizard::start`] to
    /// run activation.
    #[must_use]
    pub fn new(registry: Arc<StepRegistry>, binding_config: BindingConfig) -> Self {
        let store = Arc::new(StepStateStore::for_registry(&registry));
        let dirty = DirtyFlag::new();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let binding = bind(&registry, 0, &store, &dirty, &events, binding_config);

        Self {
            registry,
            store,
            current: 0,
            binding,
            binding_config,
            dirty,
            events,
        }
    }

    /// Activate the current step (runs validation if configured)
    pub async fn start(&self) {
        let data = self.store.data(self.current_step_id().as_str());
        self.binding.activate(data).await;
    }

    /// Step registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<StepRegistry> {
        &self.registry
    }

    /// Step state store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<StepStateStore> {
        &self.store
    }

    /// Validation binding of the active step
    #[inline]
    #[must_use]
    pub fn binding(&self) -> &ValidationBinding {
        &self.binding
    }

    /// Handle to the workflow-wide dirty flag
    #[inline]
    #[must_use]
    pub fn dirty_flag(&self) -> DirtyFlag {
        self.dirty.clone()
    }

    /// Subscribe to validation events of whichever step is active
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ValidationEvent> {
        self.events.subscribe()
    }

    /// Active step definition
    #[must_use]
    pub fn current_step(&self) -> &StepDefinition {
        &self.registry.steps()[self.current]
    }

    /// Active step id
    #[must_use]
    pub fn current_step_id(&self) -> &StepId {
        &self.current_step().id
    }

    /// Active step as a 1-based number
    #[inline]
    #[must_use]
    pub fn current_step_number(&self) -> usize {
        self.current + 1
    }

    /// Number of steps
    #[inline]
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.registry.len()
    }

    /// Copy of the active step's state
    #[must_use]
    pub fn current_state(&self) -> Option<StepState> {
        self.store.get(self.current_step_id().as_str())
    }

    /// Replace the active step's data and schedule revalidation
    ///
    /// # Errors
    /// `StoreError::UnknownStep` if the store lost the active step's state
    pub fn update_step_data(&self, data: StepData) -> Result<(), StoreError> {
        let id = self.current_step_id().clone();
        self.store.set_data(id.as_str(), data.clone())?;
        self.dirty.mark();
        self.binding.data_changed(data);
        Ok(())
    }

    /// Mark any step complete or incomplete
    ///
    /// # Errors
    /// `StoreError::UnknownStep` if `id` is not registered
    pub fn mark_step_complete(&self, id: &str, complete: bool) -> Result<(), StoreError> {
        self.store.set_complete(id, complete)?;
        self.dirty.mark();
        Ok(())
    }

    /// Whether the host may move forward: the active step is valid or optional
    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.current_step().optional || self.store.is_valid(self.current_step_id().as_str())
    }

    /// Attempt a transition to `target`
    ///
    /// # Errors
    /// - `NavigationError::UnknownStep` if `target` is not registered
    /// - `NavigationError::DependenciesUnsatisfied` for a gated forward move
    /// - `LeaveDenied` / `EnterDenied` / `Vetoed` when a guard refuses
    ///
    /// A rejected transition leaves the current step unchanged.
    pub async fn navigate_to(&mut self, target: &str) -> Result<(), NavigationError> {
        let to = self
            .registry
            .position(target)
            .ok_or_else(|| NavigationError::UnknownStep(StepId::from(target)))?;
        if to == self.current {
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let from_step = &registry.steps()[self.current];
        let to_step = &registry.steps()[to];

        if to > self.current {
            let missing = registry.unsatisfied_dependencies(to_step.id.as_str(), &self.store);
            if !missing.is_empty() {
                tracing::debug!(step = %to_step.id, ?missing, "navigation blocked by dependencies");
                return Err(NavigationError::DependenciesUnsatisfied {
                    step: to_step.id.clone(),
                    missing,
                });
            }
        }

        let from_data = self.store.data(from_step.id.as_str());
        let to_data = self.store.data(to_step.id.as_str());

        if let Some(guard) = &from_step.guard {
            if !guard.can_leave(&from_data).await {
                tracing::debug!(step = %from_step.id, "guard refused leave");
                return Err(NavigationError::LeaveDenied(from_step.id.clone()));
            }
        }
        if let Some(guard) = &to_step.guard {
            if !guard.can_enter(&to_data).await {
                tracing::debug!(step = %to_step.id, "guard refused enter");
                return Err(NavigationError::EnterDenied(to_step.id.clone()));
            }
        }
        if let Some(guard) = &from_step.guard {
            if let Err(source) = guard.before_leave(&from_data).await {
                tracing::info!(step = %from_step.id, error = %source, "transition vetoed");
                return Err(NavigationError::Vetoed {
                    step: from_step.id.clone(),
                    source,
                });
            }
        }

        self.commit(to);
        tracing::info!(from = %from_step.id, to = %to_step.id, "step transition committed");

        self.binding.activate(to_data.clone()).await;
        if let Some(guard) = &to_step.guard {
            if let Err(e) = guard.after_enter(&to_data).await {
                tracing::warn!(step = %to_step.id, error = %e, "after_enter hook failed");
            }
        }

        Ok(())
    }

    /// Move to the next step whose dependencies are satisfied
    ///
    /// # Errors
    /// `NavigationError::NoNextStep` when no later step is available, or any
    /// error of [`Wizard::navigate_to`]
    pub async fn next(&mut self) -> Result<StepId, NavigationError> {
        let current = self.current_step_id().clone();
        let target = self
            .registry
            .next_available_step(current.as_str(), &self.store)
            .map(|step| step.id.clone())
            .ok_or(NavigationError::NoNextStep(current))?;
        self.navigate_to(target.as_str()).await?;
        Ok(target)
    }

    /// Move to the immediately preceding step
    ///
    /// # Errors
    /// `NavigationError::NoPreviousStep` on the first step, or a guard refusal
    pub async fn previous(&mut self) -> Result<StepId, NavigationError> {
        let current = self.current_step_id().clone();
        let target = self
            .registry
            .previous_available_step(current.as_str())
            .map(|step| step.id.clone())
            .ok_or(NavigationError::NoPreviousStep(current))?;
        self.navigate_to(target.as_str()).await?;
        Ok(target)
    }

    /// Restore a recovered position and step states
    ///
    /// States for unregistered ids are dropped; registered steps missing from
    /// `states` start fresh. A state's own id is overwritten by the key it was
    /// stored under. Guards are not consulted.
    ///
    /// # Errors
    /// `NavigationError::StepOutOfRange` if `step_number` is not in `1..=total_steps`
    pub async fn restore(&mut self, step_number: usize, states: StepStates) -> Result<(), NavigationError> {
        let total = self.registry.len();
        if step_number == 0 || step_number > total {
            return Err(NavigationError::StepOutOfRange {
                number: step_number,
                total,
            });
        }

        let mut states = states;
        let merged: StepStates = self
            .registry
            .steps()
            .iter()
            .map(|step| {
                let mut state = states
                    .shift_remove(step.id.as_str())
                    .unwrap_or_else(|| StepState::new(step.id.clone()));
                if state.id != step.id {
                    tracing::warn!(step = %step.id, found = %state.id, "recovered state carries a foreign id");
                    state.id = step.id.clone();
                }
                (step.id.clone(), state)
            })
            .collect();
        for unknown in states.keys() {
            tracing::warn!(step = %unknown, "dropping recovered state for unregistered step");
        }

        self.store.replace_all(merged);
        self.commit(step_number - 1);
        self.dirty.clear();
        tracing::info!(step = step_number, "workflow restored");

        self.start().await;
        Ok(())
    }

    /// Discard all progress and return to the first step
    pub async fn reset(&mut self) {
        self.store.reset(&self.registry);
        self.commit(0);
        self.dirty.clear();
        tracing::info!("workflow reset");
        self.start().await;
    }

    /// Current 1-based step number and a copy of every step state
    #[must_use]
    pub fn snapshot_parts(&self) -> (usize, StepStates) {
        (self.current_step_number(), self.store.snapshot())
    }

    fn commit(&mut self, to: usize) {
        self.binding.teardown();
        self.current = to;
        self.binding = bind(
            &self.registry,
            to,
            &self.store,
            &self.dirty,
            &self.events,
            self.binding_config,
        );
        self.dirty.mark();
    }
}

fn bind(
    registry: &StepRegistry,
    position: usize,
    store: &Arc<StepStateStore>,
    dirty: &DirtyFlag,
    events: &broadcast::Sender<ValidationEvent>,
    config: BindingConfig,
) -> ValidationBinding {
    let step = &registry.steps()[position];
    ValidationBinding::from_parts(
        step.id.clone(),
        Arc::clone(&step.validator),
        config,
        Some(Arc::clone(store)),
        Some(dirty.clone()),
        events.clone(),
    )
}

impl std::fmt::Debug for Wizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("current", &self.current_step_id())
            .field("total_steps", &self.total_steps())
            .field("dirty", &self.dirty.is_dirty())
            .finish_non_exhaustive()
    }
}
