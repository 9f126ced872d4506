//! Wizard Recovery
//!
//! Crash recovery for guided workflows:
//! - **Envelope**: versioned, timestamped snapshot with order-preserving step states
//! - **Storage**: pluggable durable and tab-local scopes (memory, filesystem)
//! - **Manager**: fail-closed load, best-effort save, summaries and restore
//! - **Auto-save**: dirty-flag driven periodic saves with backoff
//!
//! # Example
//!
//! ```rust,ignore
//! use wizard_recovery::prelude::*;
//!
//! let manager = Arc::new(RecoveryManager::new(
//!     RecoveryConfig::default(),
//!     Arc::new(FileStorage::new("/var/lib/wizard")),
//!     Arc::new(MemoryStorage::new()),
//! ));
//! if let Some(wizard_state) = manager.restore_wizard(&mut wizard).await? {
//!     // resume with the host blob
//! }
//! ```

pub mod autosave;
pub mod config;
pub mod envelope;
pub mod error;
pub mod manager;
pub mod storage;

pub use autosave::{AutoSaveScheduler, SnapshotSource};
pub use config::{
    AutoSaveConfig, RecoveryConfig, DEFAULT_MAX_AGE_MS, DEFAULT_SESSION_KEY, DEFAULT_STORAGE_KEY,
};
pub use envelope::{RecoveryEnvelope, WorkflowSnapshot, ENVELOPE_VERSION};
pub use error::{RecoveryError, StorageError};
pub use manager::{
    format_data_size, generate_session_id, step_display_name, RecoveryManager, RecoverySummary,
};
pub use storage::{FileStorage, MemoryStorage, StorageBackend};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for persisting a workflow
    pub use crate::{
        AutoSaveConfig, AutoSaveScheduler, FileStorage, MemoryStorage, RecoveryConfig,
        RecoveryManager, StorageBackend, WorkflowSnapshot,
    };
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
