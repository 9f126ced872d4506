//! Error types for persistence and recovery

use thiserror::Error;
use wizard_kernel::NavigationError;

/// A storage scope failed
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Key cannot be mapped onto the backend
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Backend refused the operation
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A snapshot could not be produced or accepted
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Underlying storage failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored text is not an envelope
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Schema version differs from the current one
    #[error("envelope version {found} does not match {expected}")]
    VersionMismatch {
        /// Version found in storage
        found: String,
        /// Version this build writes
        expected: &'static str,
    },

    /// Snapshot is older than the configured maximum age
    #[error("envelope expired: {age_ms}ms old, limit {max_age_ms}ms")]
    Expired {
        /// Age at load time
        age_ms: i64,
        /// Configured limit
        max_age_ms: u64,
    },

    /// A required field is absent or null
    #[error("envelope is missing {0}")]
    MissingField(&'static str),

    /// `currentStep` is outside the workflow
    #[error("current step {step} is outside 1..={total}")]
    StepOutOfRange {
        /// Stored step number
        step: i64,
        /// Configured step count
        total: usize,
    },

    /// Applying an accepted snapshot to the workflow failed
    #[error("restore failed: {0}")]
    Restore(#[from] NavigationError),
}

impl RecoveryError {
    /// Whether the stored envelope itself was refused (as opposed to I/O failing)
    #[inline]
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_)
                | Self::VersionMismatch { .. }
                | Self::Expired { .. }
                | Self::MissingField(_)
                | Self::StepOutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rejections() {
        assert!(RecoveryError::MissingField("wizardState").is_rejection());
        assert!(RecoveryError::Expired { age_ms: 2, max_age_ms: 1 }.is_rejection());
        let io = StorageError::Io(std::io::Error::other("disk"));
        assert!(!RecoveryError::Storage(io).is_rejection());
    }
}
