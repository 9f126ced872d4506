//! End-to-end simulation of the article-analysis workflow
//!
//! Drives a real workflow against the configured durable scope with the
//! validation binding and auto-save active, then reloads the snapshot the
//! way a restarted host would.

use crate::config::CliConfig;
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wizard_kernel::{
    article_analysis_registry, Wizard, EXECUTE_STEP, RESULTS_STEP, SELECT_STEP,
};
use wizard_recovery::{
    AutoSaveScheduler, FileStorage, MemoryStorage, RecoveryManager, RecoverySummary,
    WorkflowSnapshot,
};

/// What to simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulateOptions {
    /// Articles to select
    pub articles: u64,
    /// Last step to reach before "crashing" (1-based)
    pub stop_at: usize,
}

/// Outcome of a simulation
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Step the workflow was on when the session ended
    pub reached_step: usize,
    /// Whether the final save succeeded
    pub saved: bool,
    /// Session that wrote the snapshot
    pub session_id: String,
    /// Summary seen by the next session
    pub summary: Option<RecoverySummary>,
    /// Step the next session resumed on, if it restored anything
    pub restored_step: Option<usize>,
}

/// Recovery manager over the configured durable directory
pub fn open_manager(config: &CliConfig) -> RecoveryManager {
    RecoveryManager::new(
        config.recovery.clone(),
        Arc::new(FileStorage::new(&config.storage_dir)),
        Arc::new(MemoryStorage::new()),
    )
}

/// Run one session up to `options.stop_at`, save, then restore in a fresh session
///
/// # Errors
/// An out-of-range `stop_at`, a rejected selection, a refused transition, or
/// a snapshot the fresh session cannot apply
pub async fn run(config: &CliConfig, options: SimulateOptions) -> Result<SimulationReport> {
    let registry = Arc::new(article_analysis_registry()?);
    if !(1..=registry.len()).contains(&options.stop_at) {
        bail!("--stop-at must be between 1 and {}", registry.len());
    }

    let manager = Arc::new(open_manager(config));
    let mut wizard = Wizard::new(Arc::clone(&registry), config.binding);

    let position = Arc::new(AtomicUsize::new(wizard.current_step_number()));
    let scheduler = {
        let store = Arc::clone(wizard.store());
        let position = Arc::clone(&position);
        AutoSaveScheduler::new(
            Arc::clone(&manager),
            config.auto_save,
            wizard.dirty_flag(),
            move || {
                WorkflowSnapshot::new(
                    position.load(Ordering::SeqCst),
                    store.snapshot(),
                    json!({ "source": "simulate" }),
                )
            },
        )
    };
    scheduler.start();
    wizard.start().await;

    let settle = config.binding.debounce() + Duration::from_millis(25);

    wizard.update_step_data(selection(options.articles))?;
    tokio::time::sleep(settle).await;
    if !wizard.can_advance() {
        bail!("selection rejected: {}", wizard.binding().error_summary());
    }
    wizard.mark_step_complete(SELECT_STEP, true)?;
    tracing::info!(articles = options.articles, "articles selected");

    if options.stop_at >= 2 {
        wizard
            .navigate_to(EXECUTE_STEP)
            .await
            .context("entering analysis execution")?;
        position.store(wizard.current_step_number(), Ordering::SeqCst);

        let predictions = options.articles * 2;
        for (status, processed, found) in [
            ("PENDING", 0, 0),
            ("RUNNING", options.articles / 2, predictions / 2),
            ("COMPLETED", options.articles, predictions),
        ] {
            wizard.update_step_data(job(status, processed, options.articles, found))?;
            tokio::time::sleep(settle).await;
            tracing::info!(status, processed, "analysis job progressed");
        }
        wizard.mark_step_complete(EXECUTE_STEP, true)?;
    }

    if options.stop_at >= 3 {
        wizard
            .navigate_to(RESULTS_STEP)
            .await
            .context("entering results review")?;
        position.store(wizard.current_step_number(), Ordering::SeqCst);
        wizard.update_step_data(results(options.articles))?;
        tokio::time::sleep(settle).await;
        wizard.mark_step_complete(RESULTS_STEP, true)?;
    }

    let reached_step = wizard.current_step_number();
    let saved = scheduler.force_save().await;
    scheduler.stop();
    let session_id = manager.session_id().to_string();
    tracing::info!(step = reached_step, saved, "session ended");

    // A restarted host: new manager, new workflow, same durable directory
    let next = open_manager(config);
    let summary = next.recovery_summary().await;
    let mut resumed = Wizard::new(registry, config.binding);
    let restored_step = next
        .restore_wizard(&mut resumed)
        .await?
        .map(|_| resumed.current_step_number());

    Ok(SimulationReport {
        reached_step,
        saved,
        session_id,
        summary,
        restored_step,
    })
}

fn selection(count: u64) -> Value {
    let articles: Vec<Value> = (1..=count)
        .map(|id| json!({ "id": id, "title": format!("Article {id}") }))
        .collect();
    json!({ "selectedArticles": articles })
}

fn job(status: &str, processed: u64, total: u64, found: u64) -> Value {
    json!({
        "currentJob": {
            "jobId": "simulated-job",
            "status": status,
            "processedArticles": processed,
            "totalArticles": total,
            "predictionsFound": found,
        }
    })
}

fn results(count: u64) -> Value {
    let results: Vec<Value> = (1..=count)
        .map(|id| json!({ "articleId": id, "prediction": "positive" }))
        .collect();
    json!({ "results": results })
}
