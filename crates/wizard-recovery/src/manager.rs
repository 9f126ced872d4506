//! Recovery & persistence manager
//!
//! Best-effort persistence of [`RecoveryEnvelope`]s into a durable scope and,
//! optionally, a tab-local scope. Nothing here returns a storage or rejection
//! error to the caller: writes report success as a flag, reads that fail for
//! any reason clear every stored copy and yield no snapshot.

use crate::config::RecoveryConfig;
use crate::envelope::{RecoveryEnvelope, WorkflowSnapshot};
use crate::error::RecoveryError;
use crate::storage::{MemoryStorage, StorageBackend};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use wizard_kernel::{StepStates, Wizard};

const PROBE_KEY: &str = "__wizard_storage_probe__";
const SESSION_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SESSION_SUFFIX_LEN: usize = 9;

/// Human-facing description of a stored snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySummary {
    /// Display name of the saved step
    pub step_name: String,
    /// When the snapshot was written
    pub last_saved: DateTime<Utc>,
    /// Size of the stored form, formatted
    pub data_size: String,
    /// Whether the snapshot is past its maximum age
    pub is_expired: bool,
}

/// Owns the storage scopes and the session id of one workflow session
pub struct RecoveryManager {
    config: RecoveryConfig,
    durable: Arc<dyn StorageBackend>,
    tab_local: Arc<dyn StorageBackend>,
    session_id: String,
}

impl RecoveryManager {
    /// Manager over explicit scopes, with a fresh session id
    #[must_use]
    pub fn new(
        config: RecoveryConfig,
        durable: Arc<dyn StorageBackend>,
        tab_local: Arc<dyn StorageBackend>,
    ) -> Self {
        let session_id = generate_session_id(now_ms());
        tracing::debug!(%session_id, "recovery manager created");
        Self {
            config,
            durable,
            tab_local,
            session_id,
        }
    }

    /// Manager with both scopes in memory
    #[must_use]
    pub fn in_memory(config: RecoveryConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryStorage::new()),
        )
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Session id stamped on every envelope this manager writes
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Persist a snapshot
    ///
    /// Returns whether every attempted write succeeded. Failures are logged.
    pub async fn save_recovery_state(
        &self,
        current_step: usize,
        step_states: &StepStates,
        wizard_state: &Value,
    ) -> bool {
        let snapshot = WorkflowSnapshot::new(current_step, step_states.clone(), wizard_state.clone());
        self.save_snapshot(snapshot).await
    }

    /// Persist an owned snapshot; see [`RecoveryManager::save_recovery_state`]
    pub async fn save_snapshot(&self, snapshot: WorkflowSnapshot) -> bool {
        let envelope = RecoveryEnvelope::new(snapshot, self.session_id.clone(), now_ms());
        let encoded = match envelope.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(error = %e, "could not serialize recovery envelope");
                return false;
            }
        };

        // Scopes are independent: every write is attempted
        let mut ok = true;
        if let Err(e) = self.durable.set(&self.config.storage_key, &encoded).await {
            tracing::warn!(error = %e, "durable recovery write failed");
            ok = false;
        }
        if let Err(e) = self.durable.set(&self.config.session_key, &self.session_id).await {
            tracing::warn!(error = %e, "session id write failed");
            ok = false;
        }
        if self.config.enable_cross_tab_recovery {
            if let Err(e) = self.tab_local.set(&self.config.storage_key, &encoded).await {
                tracing::warn!(error = %e, "tab-local recovery write failed");
                ok = false;
            }
        }

        tracing::debug!(
            step = envelope.current_step,
            bytes = encoded.len(),
            "recovery state saved"
        );
        ok
    }

    /// Load the stored snapshot if one exists and is acceptable
    ///
    /// Any failure or rejection clears every stored copy.
    pub async fn load_recovery_state(&self) -> Option<RecoveryEnvelope> {
        match self.try_load().await {
            Ok(envelope) => envelope,
            Err(e) => {
                if e.is_rejection() {
                    tracing::info!(reason = %e, "discarding recovery snapshot");
                } else {
                    tracing::warn!(error = %e, "could not read recovery snapshot");
                }
                self.clear_recovery_state().await;
                None
            }
        }
    }

    async fn try_load(&self) -> Result<Option<RecoveryEnvelope>, RecoveryError> {
        let Some(raw) = self.read_raw().await? else {
            return Ok(None);
        };
        let envelope = RecoveryEnvelope::decode(&raw, &self.config, now_ms())?;
        tracing::info!(
            step = envelope.current_step,
            session = %envelope.session_id,
            "recovery snapshot accepted"
        );
        Ok(Some(envelope))
    }

    async fn read_raw(&self) -> Result<Option<String>, RecoveryError> {
        if let Some(raw) = self.durable.get(&self.config.storage_key).await? {
            return Ok(Some(raw));
        }
        if self.config.enable_cross_tab_recovery {
            return Ok(self.tab_local.get(&self.config.storage_key).await?);
        }
        Ok(None)
    }

    /// Remove the snapshot from both scopes; failures are logged
    pub async fn clear_recovery_state(&self) {
        if let Err(e) = self.durable.remove(&self.config.storage_key).await {
            tracing::warn!(error = %e, "could not clear durable recovery state");
        }
        if let Err(e) = self.tab_local.remove(&self.config.storage_key).await {
            tracing::warn!(error = %e, "could not clear tab-local recovery state");
        }
    }

    /// Whether the durable scope accepts writes
    pub async fn is_available(&self) -> bool {
        let probe = match self.durable.set(PROBE_KEY, PROBE_KEY).await {
            Ok(()) => self.durable.remove(PROBE_KEY).await,
            Err(e) => Err(e),
        };
        match probe {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "durable storage unavailable");
                false
            }
        }
    }

    /// Session id of the last successful save, possibly from an earlier session
    pub async fn last_session_id(&self) -> Option<String> {
        match self.durable.get(&self.config.session_key).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "could not read last session id");
                None
            }
        }
    }

    /// Describe the stored snapshot without consuming or clearing it
    ///
    /// Expired snapshots are still described (`is_expired = true`); snapshots
    /// rejected for any other reason yield `None`.
    pub async fn recovery_summary(&self) -> Option<RecoverySummary> {
        let raw = match self.read_raw().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "could not read recovery snapshot");
                return None;
            }
        };
        let envelope = RecoveryEnvelope::parse(&raw).ok()?;
        let is_expired = match envelope.check(&self.config, now_ms()) {
            Ok(()) => false,
            Err(RecoveryError::Expired { .. }) => true,
            Err(_) => return None,
        };

        Some(RecoverySummary {
            step_name: step_display_name(envelope.current_step).to_string(),
            last_saved: envelope.saved_at()?,
            data_size: format_data_size(raw.len()),
            is_expired,
        })
    }

    /// Load the stored snapshot and apply it to `wizard`
    ///
    /// Returns the host blob of the applied snapshot, or `None` if there was
    /// nothing acceptable to restore.
    ///
    /// # Errors
    /// `RecoveryError::Restore` if the workflow refused the snapshot (for
    /// example a step number beyond its registry); the snapshot is cleared.
    pub async fn restore_wizard(&self, wizard: &mut Wizard) -> Result<Option<Value>, RecoveryError> {
        let Some(envelope) = self.load_recovery_state().await else {
            return Ok(None);
        };
        let snapshot = envelope.into_snapshot();
        if let Err(e) = wizard.restore(snapshot.current_step, snapshot.step_states).await {
            tracing::warn!(error = %e, "recovered snapshot does not fit the workflow");
            self.clear_recovery_state().await;
            return Err(e.into());
        }
        Ok(Some(snapshot.wizard_state))
    }
}

impl std::fmt::Debug for RecoveryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryManager")
            .field("config", &self.config)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// Display name of a 1-based step number
#[must_use]
pub fn step_display_name(step: usize) -> &'static str {
    match step {
        1 => "Article Selection",
        2 => "Analysis Execution",
        3 => "Results Review",
        _ => "Unknown Step",
    }
}

/// Byte count as `B`, `KB` or `MB`
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_data_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    let value = bytes as f64;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", value / KB as f64)
    } else {
        format!("{:.1} MB", value / MB as f64)
    }
}

/// `wizard-<epoch ms>-<9 random base-36 chars>`
#[must_use]
pub fn generate_session_id(now_ms: i64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| char::from(SESSION_ALPHABET[rng.gen_range(0..SESSION_ALPHABET.len())]))
        .collect();
    format!("wizard-{now_ms}-{suffix}")
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::MockStorageBackend;
    use mockall::predicate::eq;
    use serde_json::json;
    use wizard_kernel::{StepId, StepState};

    fn states() -> StepStates {
        ["a", "b"]
            .into_iter()
            .map(|id| (StepId::from(id), StepState::new(id)))
            .collect()
    }

    fn unavailable() -> StorageError {
        StorageError::Unavailable("quota exceeded".to_string())
    }

    #[test]
    fn session_id_shape() {
        let id = generate_session_id(1_700_000_000_000);
        let suffix = id.strip_prefix("wizard-1700000000000-").unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn data_size_units() {
        assert_eq!(format_data_size(0), "0 B");
        assert_eq!(format_data_size(1023), "1023 B");
        assert_eq!(format_data_size(1536), "1.5 KB");
        assert_eq!(format_data_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn display_names() {
        assert_eq!(step_display_name(1), "Article Selection");
        assert_eq!(step_display_name(3), "Results Review");
        assert_eq!(step_display_name(0), "Unknown Step");
        assert_eq!(step_display_name(9), "Unknown Step");
    }

    #[tokio::test]
    async fn failed_durable_write_reports_false() {
        let mut durable = MockStorageBackend::new();
        durable.expect_set().returning(|_, _| Err(unavailable()));
        let manager = RecoveryManager::new(
            RecoveryConfig::default(),
            Arc::new(durable),
            Arc::new(MemoryStorage::new()),
        );
        assert!(!manager.save_recovery_state(1, &states(), &json!({})).await);
    }

    #[tokio::test]
    async fn failed_read_clears_both_scopes() {
        let mut durable = MockStorageBackend::new();
        durable
            .expect_get()
            .with(eq("wizard_recovery_state"))
            .returning(|_| Err(unavailable()));
        durable
            .expect_remove()
            .with(eq("wizard_recovery_state"))
            .times(1)
            .returning(|_| Ok(()));
        let mut tab_local = MockStorageBackend::new();
        tab_local.expect_remove().times(1).returning(|_| Ok(()));

        let manager = RecoveryManager::new(
            RecoveryConfig::default(),
            Arc::new(durable),
            Arc::new(tab_local),
        );
        assert!(manager.load_recovery_state().await.is_none());
    }

    #[tokio::test]
    async fn failed_clear_is_swallowed() {
        let mut durable = MockStorageBackend::new();
        durable.expect_remove().returning(|_| Err(unavailable()));
        let manager = RecoveryManager::new(
            RecoveryConfig::default(),
            Arc::new(durable),
            Arc::new(MemoryStorage::new()),
        );
        manager.clear_recovery_state().await;
    }

    #[tokio::test]
    async fn availability_probe() {
        let mut durable = MockStorageBackend::new();
        durable.expect_set().returning(|_, _| Err(unavailable()));
        let manager = RecoveryManager::new(
            RecoveryConfig::default(),
            Arc::new(durable),
            Arc::new(MemoryStorage::new()),
        );
        assert!(!manager.is_available().await);

        let memory = RecoveryManager::in_memory(RecoveryConfig::default());
        assert!(memory.is_available().await);
    }

    #[tokio::test]
    async fn tab_local_failure_keeps_durable_copy() {
        let durable = MemoryStorage::new();
        let mut tab_local = MockStorageBackend::new();
        tab_local.expect_set().returning(|_, _| Err(unavailable()));

        let manager = RecoveryManager::new(
            RecoveryConfig::default().with_cross_tab_recovery(true),
            Arc::new(durable.clone()),
            Arc::new(tab_local),
        );

        assert!(!manager.save_recovery_state(2, &states(), &json!({})).await);
        assert!(durable.contains_key("wizard_recovery_state"));
    }

    #[tokio::test]
    async fn durable_failure_keeps_tab_local_copy() {
        let mut durable = MockStorageBackend::new();
        durable.expect_set().returning(|_, _| Err(unavailable()));
        durable.expect_get().returning(|_| Ok(None));
        let tab_local = MemoryStorage::new();

        let manager = RecoveryManager::new(
            RecoveryConfig::default().with_cross_tab_recovery(true),
            Arc::new(durable),
            Arc::new(tab_local.clone()),
        );

        assert!(!manager.save_recovery_state(2, &states(), &json!({})).await);
        assert!(tab_local.contains_key("wizard_recovery_state"));

        let envelope = manager.load_recovery_state().await.unwrap();
        assert_eq!(envelope.current_step, 2);
    }
}
