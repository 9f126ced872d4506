//! Error types for the workflow kernel
//!
//! Covers:
//! - Registry construction (duplicate ids, unknown or cyclic dependencies)
//! - Step state store lookups
//! - Navigation vetoes raised by guards
//! - Rejected step transitions

use crate::types::StepId;

/// Registry construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Registry declared without steps
    #[error("registry has no steps")]
    Empty,

    /// Two steps share an id
    #[error("duplicate step id: {0}")]
    DuplicateStep(StepId),

    /// Dependency references an id not declared in the registry
    #[error("step {step} depends on unknown step {dependency}")]
    UnknownDependency {
        /// Declaring step
        step: StepId,
        /// Missing dependency
        dependency: StepId,
    },

    /// Step lists itself as a dependency
    #[error("step {0} depends on itself")]
    SelfDependency(StepId),

    /// Dependency relation is not acyclic
    #[error("dependency cycle through step {0}")]
    DependencyCycle(StepId),
}

/// Step state store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No state is tracked for this id
    #[error("no state for step {0}")]
    UnknownStep(StepId),
}

/// Failure raised by a guard hook
///
/// Raising from `before_leave` is the intended way to veto a transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    /// Guard refused the transition
    #[error("vetoed: {0}")]
    Vetoed(String),

    /// Guard side effect failed
    #[error("guard failed: {0}")]
    Failed(String),
}

/// Reasons a step transition did not happen
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// Target id is not in the registry
    #[error("unknown step: {0}")]
    UnknownStep(StepId),

    /// 1-based step number outside the registry
    #[error("step number {number} is outside 1..={total}")]
    StepOutOfRange {
        /// Requested number
        number: usize,
        /// Steps in the registry
        total: usize,
    },

    /// Forward move into a step whose prerequisites are incomplete
    #[error("step {step} has incomplete dependencies: {missing:?}")]
    DependenciesUnsatisfied {
        /// Target step
        step: StepId,
        /// Prerequisites not yet complete
        missing: Vec<StepId>,
    },

    /// `can_leave` returned false
    #[error("guard refused to leave step {0}")]
    LeaveDenied(StepId),

    /// `can_enter` returned false
    #[error("guard refused to enter step {0}")]
    EnterDenied(StepId),

    /// `before_leave` raised
    #[error("leaving step {step} was vetoed: {source}")]
    Vetoed {
        /// Step being left
        step: StepId,
        /// Guard failure
        source: GuardError,
    },

    /// No eligible step after the current one
    #[error("no step available after {0}")]
    NoNextStep(StepId),

    /// Already at the first step
    #[error("no step before {0}")]
    NoPreviousStep(StepId),

    /// State store out of sync with the registry
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl NavigationError {
    /// Whether a guard (rather than registry structure) stopped the transition
    #[inline]
    #[must_use]
    pub fn is_guard_veto(&self) -> bool {
        matches!(
            self,
            Self::LeaveDenied(_) | Self::EnterDenied(_) | Self::Vetoed { .. }
        )
    }

    /// Whether the user can resolve this by completing work and retrying
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_guard_veto() || matches!(self, Self::DependenciesUnsatisfied { .. })
    }
}
