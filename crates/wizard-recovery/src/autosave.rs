//! Auto-save scheduler
//!
//! Saves the workflow on a fixed interval, but only when it changed since the
//! last successful save. The snapshot is pulled from a caller-supplied source
//! at save time. Failed saves back off exponentially and eventually give up
//! until the workflow changes again.

use crate::config::AutoSaveConfig;
use crate::envelope::WorkflowSnapshot;
use crate::manager::RecoveryManager;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use wizard_kernel::DirtyFlag;

/// Produces the snapshot to persist
pub type SnapshotSource = Arc<dyn Fn() -> WorkflowSnapshot + Send + Sync>;

#[derive(Debug, Default)]
struct Backoff {
    failures: u32,
    skip_ticks: u64,
    gave_up: bool,
    // Change generation the last failed save tried to persist
    attempted: u64,
}

struct Inner {
    manager: Arc<RecoveryManager>,
    source: SnapshotSource,
    dirty: DirtyFlag,
    config: AutoSaveConfig,
    backoff: Mutex<Backoff>,
}

impl Inner {
    async fn save(&self) -> bool {
        let generation = self.dirty.generation();
        // Cleared first so changes made during the save are not lost
        self.dirty.clear();
        let snapshot = (self.source)();
        let ok = self.manager.save_snapshot(snapshot).await;
        if ok {
            *self.backoff.lock() = Backoff::default();
        } else {
            self.dirty.reassert();
            self.backoff.lock().attempted = generation;
        }
        ok
    }

    async fn tick(&self) {
        if !self.dirty.is_dirty() {
            return;
        }
        {
            let mut backoff = self.backoff.lock();
            let held = backoff.gave_up || backoff.skip_ticks > 0;
            if held && self.dirty.generation() != backoff.attempted {
                tracing::info!(failures = backoff.failures, "workflow changed, auto-save retrying");
                *backoff = Backoff::default();
            }
            if backoff.gave_up {
                return;
            }
            if backoff.skip_ticks > 0 {
                backoff.skip_ticks -= 1;
                return;
            }
        }

        if self.save().await {
            tracing::debug!("auto-save completed");
            return;
        }

        let mut backoff = self.backoff.lock();
        backoff.failures += 1;
        if backoff.failures >= self.config.max_consecutive_failures {
            backoff.gave_up = true;
            tracing::error!(
                failures = backoff.failures,
                "auto-save giving up until the workflow changes"
            );
        } else {
            backoff.skip_ticks = self.config.backoff_ticks(backoff.failures);
            tracing::warn!(
                failures = backoff.failures,
                skip_ticks = backoff.skip_ticks,
                "auto-save failed, backing off"
            );
        }
    }
}

/// Periodic saver owned by the workflow host
///
/// Dropping the scheduler stops its timer.
pub struct AutoSaveScheduler {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoSaveScheduler {
    /// Scheduler saving through `manager` whenever `dirty` is set
    #[must_use]
    pub fn new<F>(
        manager: Arc<RecoveryManager>,
        config: AutoSaveConfig,
        dirty: DirtyFlag,
        source: F,
    ) -> Self
    where
        F: Fn() -> WorkflowSnapshot + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                manager,
                source: Arc::new(source),
                dirty,
                config,
                backoff: Mutex::new(Backoff::default()),
            }),
            task: Mutex::new(None),
        }
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> AutoSaveConfig {
        self.inner.config
    }

    /// Start the timer; a running timer is stopped first
    ///
    /// The first tick fires one interval from now. Requires a Tokio runtime.
    pub fn start(&self) {
        self.stop();

        let period = self.inner.config.interval();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let inner = Arc::clone(&self.inner);

        let handle = tokio::spawn(async move {
            loop {
                ticker.tick().await;
                inner.tick().await;
            }
        });

        *self.task.lock() = Some(handle);
        tracing::info!(interval_ms = self.inner.config.interval_ms, "auto-save started");
    }

    /// Cancel the timer; a save already in progress runs to completion
    /// only if it is past its last suspension point
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            tracing::debug!("auto-save stopped");
        }
    }

    /// Whether the timer is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Flag unsaved changes; also lifts any backoff
    pub fn mark_dirty(&self) {
        self.inner.dirty.mark();
        *self.inner.backoff.lock() = Backoff::default();
    }

    /// Whether unsaved changes are pending
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.is_dirty()
    }

    /// Save now regardless of the timer; returns whether the save succeeded
    pub async fn force_save(&self) -> bool {
        self.inner.save().await
    }

    /// Failed saves since the last success
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.backoff.lock().failures
    }

    /// Whether the scheduler stopped retrying
    #[must_use]
    pub fn has_given_up(&self) -> bool {
        self.inner.backoff.lock().gave_up
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for AutoSaveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSaveScheduler")
            .field("config", &self.inner.config)
            .field("dirty", &self.inner.dirty.is_dirty())
            .field("backoff", &*self.inner.backoff.lock())
            .finish_non_exhaustive()
    }
}
