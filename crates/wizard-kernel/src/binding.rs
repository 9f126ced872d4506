//! Reactive validation binding for the active step
//!
//! Re-runs the step's validator whenever its data changes, with a
//! trailing-edge debounce: each change cancels a run that is still waiting
//! and schedules a new one. A run that already started is never cancelled,
//! so overlapping runs can both finish; the last one to finish wins.
//!
//! Validator defects (an `Err` or a panic) become the terminal result
//! [`ValidationResult::internal_error`] and never propagate.

use crate::store::StepStateStore;
use crate::types::{DirtyFlag, StepId};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use wizard_validation::{StepData, StepValidator, ValidationResult};

const EVENT_CAPACITY: usize = 64;

/// Binding behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Quiet period before a scheduled run starts, in milliseconds
    pub debounce_ms: u64,
    /// Validate immediately when the step becomes active
    pub validate_on_activation: bool,
    /// Publish [`ValidationEvent`]s after every run
    pub auto_notify: bool,
}

impl BindingConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With debounce interval
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce_ms = u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With validate-on-activation
    #[inline]
    #[must_use]
    pub fn with_validate_on_activation(mut self, enabled: bool) -> Self {
        self.validate_on_activation = enabled;
        self
    }

    /// With auto-notify
    #[inline]
    #[must_use]
    pub fn with_auto_notify(mut self, enabled: bool) -> Self {
        self.auto_notify = enabled;
        self
    }

    /// Debounce interval
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            validate_on_activation: true,
            auto_notify: true,
        }
    }
}

/// Change notification for UI consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationEvent {
    /// Emitted after every run (and on clear)
    ValidityChanged {
        /// Validated step
        step: StepId,
        /// New validity
        is_valid: bool,
    },
    /// Emitted after a run that produced errors
    ErrorsChanged {
        /// Validated step
        step: StepId,
        /// Errors of the run
        errors: Vec<String>,
    },
    /// Emitted after a run that produced warnings
    WarningsChanged {
        /// Validated step
        step: StepId,
        /// Warnings of the run
        warnings: Vec<String>,
    },
}

#[derive(Debug, Default)]
struct BindingState {
    validation: ValidationResult,
    last_validated: Option<DateTime<Utc>>,
    in_flight: usize,
}

const RUN_WAITING: u8 = 0;
const RUN_STARTED: u8 = 1;
const RUN_CANCELLED: u8 = 2;

/// A scheduled run still inside its debounce window (or already started)
#[derive(Debug)]
struct PendingRun {
    handle: JoinHandle<()>,
    phase: Arc<AtomicU8>,
}

impl PendingRun {
    /// Cancel unless the run already started
    fn cancel_if_waiting(self) -> bool {
        let cancelled = self
            .phase
            .compare_exchange(RUN_WAITING, RUN_CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if cancelled {
            self.handle.abort();
        }
        cancelled
    }
}

struct Shared {
    step: StepId,
    validator: Arc<dyn StepValidator>,
    config: BindingConfig,
    state: Mutex<BindingState>,
    store: Option<Arc<StepStateStore>>,
    dirty: Option<DirtyFlag>,
    events: broadcast::Sender<ValidationEvent>,
    completed_runs: AtomicU64,
}

impl Shared {
    async fn run(&self, data: StepData) -> ValidationResult {
        self.state.lock().in_flight += 1;

        let outcome = AssertUnwindSafe(self.validator.validate(&data))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::warn!(step = %self.step, error = %e, "validator returned a defect");
                ValidationResult::internal_error()
            }
            Err(_) => {
                tracing::error!(step = %self.step, "validator panicked");
                ValidationResult::internal_error()
            }
        };

        let now = Utc::now();
        {
            let mut state = self.state.lock();
            state.in_flight -= 1;
            state.validation = result.clone();
            state.last_validated = Some(now);
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.record_validation(self.step.as_str(), result.clone(), now) {
                tracing::warn!(step = %self.step, error = %e, "could not record validation");
            }
        }
        if let Some(dirty) = &self.dirty {
            dirty.mark();
        }
        self.completed_runs.fetch_add(1, Ordering::SeqCst);

        if self.config.auto_notify {
            self.notify(&result);
        }
        tracing::debug!(step = %self.step, valid = result.is_valid, "validation run finished");

        result
    }

    fn notify(&self, result: &ValidationResult) {
        // Send only fails when nobody is subscribed
        let _ = self.events.send(ValidationEvent::ValidityChanged {
            step: self.step.clone(),
            is_valid: result.is_valid,
        });
        if !result.errors.is_empty() {
            let _ = self.events.send(ValidationEvent::ErrorsChanged {
                step: self.step.clone(),
                errors: result.errors.clone(),
            });
        }
        if !result.warnings.is_empty() {
            let _ = self.events.send(ValidationEvent::WarningsChanged {
                step: self.step.clone(),
                warnings: result.warnings.clone(),
            });
        }
    }
}

/// Validation state of the currently active step
///
/// Dropping the binding cancels any run still waiting for its debounce
/// window. Scheduling requires a Tokio runtime.
pub struct ValidationBinding {
    shared: Arc<Shared>,
    pending: Mutex<Option<PendingRun>>,
}

impl ValidationBinding {
    /// Bind `validator` to `step`
    #[must_use]
    pub fn new(step: StepId, validator: Arc<dyn StepValidator>, config: BindingConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self::from_parts(step, validator, config, None, None, events)
    }

    /// Bind with state store write-back, dirty signalling and a shared event channel
    #[must_use]
    pub fn from_parts(
        step: StepId,
        validator: Arc<dyn StepValidator>,
        config: BindingConfig,
        store: Option<Arc<StepStateStore>>,
        dirty: Option<DirtyFlag>,
        events: broadcast::Sender<ValidationEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                step,
                validator,
                config,
                state: Mutex::new(BindingState::default()),
                store,
                dirty,
                events,
                completed_runs: AtomicU64::new(0),
            }),
            pending: Mutex::new(None),
        }
    }

    /// Bound step
    #[inline]
    #[must_use]
    pub fn step(&self) -> &StepId {
        &self.shared.step
    }

    /// Binding configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> BindingConfig {
        self.shared.config
    }

    /// Subscribe to validation events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ValidationEvent> {
        self.shared.events.subscribe()
    }

    /// Step became active; validates immediately if configured to
    pub async fn activate(&self, data: StepData) {
        if self.shared.config.validate_on_activation {
            self.shared.run(data).await;
        }
    }

    /// Validate immediately, bypassing the debounce window
    pub async fn validate_now(&self, data: StepData) -> ValidationResult {
        self.shared.run(data).await
    }

    /// Step data changed; schedule a debounced run with this data
    ///
    /// A run still waiting from an earlier change is cancelled.
    pub fn data_changed(&self, data: StepData) {
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            if previous.cancel_if_waiting() {
                tracing::trace!(step = %self.shared.step, "debounced run superseded");
            }
        }

        let phase = Arc::new(AtomicU8::new(RUN_WAITING));
        let shared = Arc::clone(&self.shared);
        let task_phase = Arc::clone(&phase);
        let deadline = tokio::time::Instant::now() + self.shared.config.debounce();

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let started = task_phase
                .compare_exchange(RUN_WAITING, RUN_STARTED, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok();
            if started {
                shared.run(data).await;
            }
        });

        *pending = Some(PendingRun { handle, phase });
    }

    /// Reset to the initial invalid state and announce validity = false
    pub fn clear_validation(&self) {
        self.cancel_pending();
        {
            let mut state = self.shared.state.lock();
            state.validation = ValidationResult::default();
            state.last_validated = None;
        }
        if let Some(store) = &self.shared.store {
            if let Err(e) = store.clear_validation(self.shared.step.as_str()) {
                tracing::warn!(step = %self.shared.step, error = %e, "could not clear validation");
            }
        }
        let _ = self.shared.events.send(ValidationEvent::ValidityChanged {
            step: self.shared.step.clone(),
            is_valid: false,
        });
    }

    /// Cancel a run still waiting for its debounce window
    pub fn teardown(&self) {
        self.cancel_pending();
    }

    fn cancel_pending(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.cancel_if_waiting();
        }
    }

    /// Whether a debounced run is scheduled but not started
    #[must_use]
    pub fn has_pending_run(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|run| run.phase.load(Ordering::SeqCst) == RUN_WAITING)
    }

    /// Latest validation result
    #[must_use]
    pub fn validation(&self) -> ValidationResult {
        self.shared.state.lock().validation.clone()
    }

    /// Whether the latest result is valid
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.shared.state.lock().validation.is_valid
    }

    /// Errors of the latest result
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.shared.state.lock().validation.errors.clone()
    }

    /// Warnings of the latest result
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.shared.state.lock().validation.warnings.clone()
    }

    /// Whether the latest result has errors
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.shared.state.lock().validation.errors.is_empty()
    }

    /// Whether the latest result has warnings
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.shared.state.lock().validation.warnings.is_empty()
    }

    /// First error, for compact display
    #[must_use]
    pub fn first_error(&self) -> Option<String> {
        self.shared.state.lock().validation.errors.first().cloned()
    }

    /// All errors joined into one line
    #[must_use]
    pub fn error_summary(&self) -> String {
        self.shared.state.lock().validation.errors.join("; ")
    }

    /// When the latest run finished
    #[must_use]
    pub fn last_validated(&self) -> Option<DateTime<Utc>> {
        self.shared.state.lock().last_validated
    }

    /// Whether a run is executing right now
    #[must_use]
    pub fn is_validating(&self) -> bool {
        self.shared.state.lock().in_flight > 0
    }

    /// Number of runs that finished since the binding was created
    #[must_use]
    pub fn completed_runs(&self) -> u64 {
        self.shared.completed_runs.load(Ordering::SeqCst)
    }
}

impl Drop for ValidationBinding {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for ValidationBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationBinding")
            .field("step", &self.shared.step)
            .field("config", &self.shared.config)
            .field("validation", &self.shared.state.lock().validation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use wizard_validation::{CompositeValidator, ValidatorError};

    struct Broken;

    #[async_trait]
    impl StepValidator for Broken {
        async fn validate(&self, _data: &StepData) -> Result<ValidationResult, ValidatorError> {
            Err(ValidatorError::Internal("boom".to_string()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl StepValidator for Panicking {
        async fn validate(&self, _data: &StepData) -> Result<ValidationResult, ValidatorError> {
            panic!("validator bug")
        }
    }

    fn needs_name() -> Arc<dyn StepValidator> {
        Arc::new(
            CompositeValidator::new()
                .error_rule(|d| d.get("name").is_none().then(|| "name missing".to_string()))
                .warning_rule(|d| d.get("nick").is_none().then(|| "no nick".to_string())),
        )
    }

    #[tokio::test]
    async fn activation_validates_immediately() {
        let binding = ValidationBinding::new("s".into(), needs_name(), BindingConfig::default());
        binding.activate(json!({"name": "x"})).await;
        assert!(binding.is_valid());
        assert!(binding.last_validated().is_some());
        assert_eq!(binding.warnings(), vec!["no nick"]);
    }

    #[tokio::test]
    async fn activation_can_be_disabled() {
        let config = BindingConfig::default().with_validate_on_activation(false);
        let binding = ValidationBinding::new("s".into(), needs_name(), config);
        binding.activate(json!({"name": "x"})).await;
        assert_eq!(binding.completed_runs(), 0);
        assert!(!binding.is_valid());
    }

    #[tokio::test]
    async fn validator_error_becomes_internal_error() {
        let binding = ValidationBinding::new("s".into(), Arc::new(Broken), BindingConfig::default());
        let result = binding.validate_now(json!({})).await;
        assert_eq!(result, ValidationResult::internal_error());
        assert_eq!(binding.first_error().as_deref(), Some(wizard_validation::INTERNAL_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn validator_panic_becomes_internal_error() {
        let binding = ValidationBinding::new("s".into(), Arc::new(Panicking), BindingConfig::default());
        let result = binding.validate_now(json!({})).await;
        assert_eq!(result, ValidationResult::internal_error());
        assert!(!binding.is_validating());
    }

    #[tokio::test]
    async fn notifies_validity_errors_and_warnings() {
        let binding = ValidationBinding::new("s".into(), needs_name(), BindingConfig::default());
        let mut rx = binding.subscribe();
        binding.validate_now(json!({})).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            ValidationEvent::ValidityChanged { step: "s".into(), is_valid: false }
        );
        assert!(matches!(rx.recv().await.unwrap(), ValidationEvent::ErrorsChanged { .. }));
        assert!(matches!(rx.recv().await.unwrap(), ValidationEvent::WarningsChanged { .. }));
    }

    #[tokio::test]
    async fn clean_result_emits_only_validity() {
        let binding = ValidationBinding::new("s".into(), needs_name(), BindingConfig::default());
        let mut rx = binding.subscribe();
        binding.validate_now(json!({"name": "a", "nick": "b"})).await;

        assert!(matches!(
            rx.recv().await.unwrap(),
            ValidationEvent::ValidityChanged { is_valid: true, .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn auto_notify_off_is_silent() {
        let config = BindingConfig::default().with_auto_notify(false);
        let binding = ValidationBinding::new("s".into(), needs_name(), config);
        let mut rx = binding.subscribe();
        binding.validate_now(json!({})).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn clear_resets_and_notifies() {
        let binding = ValidationBinding::new("s".into(), needs_name(), BindingConfig::default());
        binding.validate_now(json!({"name": "a"})).await;
        let mut rx = binding.subscribe();

        binding.clear_validation();

        assert!(!binding.is_valid());
        assert!(binding.last_validated().is_none());
        assert!(binding.errors().is_empty());
        assert_eq!(
            rx.recv().await.unwrap(),
            ValidationEvent::ValidityChanged { step: "s".into(), is_valid: false }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_waiting_run() {
        let binding = ValidationBinding::new("s".into(), needs_name(), BindingConfig::default());
        binding.data_changed(json!({"name": "a"}));
        assert!(binding.has_pending_run());

        binding.teardown();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(binding.completed_runs(), 0);
        assert!(!binding.has_pending_run());
    }
}
