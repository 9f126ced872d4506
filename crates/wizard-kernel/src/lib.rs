//! Wizard Kernel
//!
//! Runtime core for guided multi-step workflows:
//! - **Registry**: ordered step definitions with a validated dependency DAG
//! - **Store**: per-step data, completion and validation state
//! - **Guards**: async entry/exit policy with a fixed hook order
//! - **Binding**: debounced, panic-safe re-validation of the active step
//! - **Wizard**: the controller tying the above together
//!
//! # Example
//!
//! ```rust,ignore
//! use wizard_kernel::prelude::*;
//! use wizard_validation::{ExecutionStepValidator, SelectionStepValidator};
//!
//! let registry = StepRegistry::builder()
//!     .step(StepDefinition::new("select", "Select", SelectionStepValidator::new())
//!         .with_guard(SelectionStepGuard))
//!     .step(StepDefinition::new("run", "Run", ExecutionStepValidator::new())
//!         .depends_on("select"))
//!     .build()?;
//!
//! let mut wizard = Wizard::new(Arc::new(registry), BindingConfig::default());
//! wizard.start().await;
//! wizard.update_step_data(json!({"selectedArticles": [{"id": 1, "title": "A"}]}))?;
//! ```

pub mod binding;
pub mod error;
pub mod guard;
pub mod registry;
pub mod store;
pub mod types;
pub mod wizard;
pub mod workflow;

pub use binding::{BindingConfig, ValidationBinding, ValidationEvent};
pub use error::{GuardError, NavigationError, RegistryError, StoreError};
pub use guard::{ExecutionStepGuard, NavigationGuard, SelectionStepGuard};
pub use registry::{StepDefinition, StepRegistry, StepRegistryBuilder};
pub use store::{StepStateStore, StepStates};
pub use types::{DirtyFlag, StepId, StepState};
pub use wizard::Wizard;
pub use workflow::{article_analysis_registry, EXECUTE_STEP, RESULTS_STEP, SELECT_STEP};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for hosting a workflow
    pub use crate::{
        BindingConfig, NavigationError, NavigationGuard, RegistryError, SelectionStepGuard,
        StepDefinition, StepId, StepRegistry, StepState, Wizard,
    };
    pub use std::sync::Arc;
    pub use wizard_validation::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
