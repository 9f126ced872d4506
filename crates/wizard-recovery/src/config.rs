//! Recovery and auto-save configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Durable-scope key of the envelope (also used for the tab-local copy)
pub const DEFAULT_STORAGE_KEY: &str = "wizard_recovery_state";

/// Durable-scope key of the last session id
pub const DEFAULT_SESSION_KEY: &str = "wizard_session_id";

/// Snapshots older than this are discarded (24 hours)
pub const DEFAULT_MAX_AGE_MS: u64 = 24 * 60 * 60 * 1000;

/// Recovery manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Maximum accepted snapshot age in milliseconds
    pub max_age_ms: u64,
    /// Also write to, and fall back to reading from, the tab-local scope
    pub enable_cross_tab_recovery: bool,
    /// Number of steps a restored `currentStep` is checked against
    pub total_steps: usize,
    /// Envelope key
    pub storage_key: String,
    /// Session id key
    pub session_key: String,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_age_ms: DEFAULT_MAX_AGE_MS,
            enable_cross_tab_recovery: false,
            total_steps: 3,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            session_key: DEFAULT_SESSION_KEY.to_string(),
        }
    }
}

impl RecoveryConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With maximum snapshot age
    #[inline]
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With cross-tab recovery
    #[inline]
    #[must_use]
    pub fn with_cross_tab_recovery(mut self, enabled: bool) -> Self {
        self.enable_cross_tab_recovery = enabled;
        self
    }

    /// With total step count
    #[inline]
    #[must_use]
    pub fn with_total_steps(mut self, total_steps: usize) -> Self {
        self.total_steps = total_steps;
        self
    }

    /// With envelope key
    #[inline]
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// With session id key
    #[inline]
    #[must_use]
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    /// Maximum snapshot age
    #[inline]
    #[must_use]
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }
}

/// Auto-save scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Tick interval in milliseconds
    pub interval_ms: u64,
    /// Upper bound on the pause after failed saves, in milliseconds
    pub max_backoff_ms: u64,
    /// Consecutive failures after which the scheduler stops trying
    pub max_consecutive_failures: u32,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            max_backoff_ms: 300_000,
            max_consecutive_failures: 10,
        }
    }
}

impl AutoSaveConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With tick interval
    #[inline]
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With backoff cap
    #[inline]
    #[must_use]
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff_ms = u64::try_from(max_backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With give-up threshold
    #[inline]
    #[must_use]
    pub fn with_max_consecutive_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_failures = failures;
        self
    }

    /// Tick interval (never zero)
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Ticks to skip after `failures` consecutive failed saves
    ///
    /// `2^failures - 1`, capped so the pause never exceeds `max_backoff_ms`.
    #[must_use]
    pub fn backoff_ticks(&self, failures: u32) -> u64 {
        let exponential = 1u64
            .checked_shl(failures)
            .map_or(u64::MAX, |n| n.saturating_sub(1));
        let cap = self.max_backoff_ms / self.interval_ms.max(1);
        exponential.min(cap)
    }
}
