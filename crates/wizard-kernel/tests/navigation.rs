//! Functional tests for step navigation.
//!
//! Guarantees exercised here:
//! - Forward moves are gated by prerequisite completion; backward moves never are.
//! - Guard hooks run in a fixed order and a refusal short-circuits the rest.
//! - A rejected transition leaves the current step untouched.
//! - Restore and reset re-establish a consistent position and state mapping.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wizard_kernel::prelude::*;
use wizard_kernel::{StepStates, ValidationEvent};
use wizard_test_utils::{
    article_workflow, hook_log, job_data, results_data, selection_data, CountingValidator,
    RecordingGuard,
    EXECUTE_STEP, RESULTS_STEP, SELECT_STEP,
};

fn step(id: &str) -> StepDefinition {
    StepDefinition::new(id, id.to_uppercase(), CountingValidator::passing())
}

/// A; B depends on A; C depends on A and B
fn chain() -> Arc<StepRegistry> {
    Arc::new(
        StepRegistry::builder()
            .step(step("a"))
            .step(step("b").depends_on("a"))
            .step(step("c").depends_on("a").depends_on("b"))
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn forward_navigation_waits_for_prerequisites() {
    let mut wizard = Wizard::new(chain(), BindingConfig::default());
    wizard.start().await;

    let err = wizard.navigate_to("b").await.unwrap_err();
    assert_eq!(
        err,
        NavigationError::DependenciesUnsatisfied {
            step: "b".into(),
            missing: vec!["a".into()],
        }
    );
    assert_eq!(wizard.current_step_id().as_str(), "a");
    assert!(!wizard.registry().check_step_dependencies("b", wizard.store()));
    assert!(wizard
        .registry()
        .next_available_step("a", wizard.store())
        .is_none());

    wizard.mark_step_complete("a", true).unwrap();
    assert!(wizard.registry().check_step_dependencies("b", wizard.store()));
    assert!(!wizard.registry().check_step_dependencies("c", wizard.store()));
    assert_eq!(
        wizard
            .registry()
            .next_available_step("a", wizard.store())
            .map(|s| s.id.as_str()),
        Some("b")
    );

    wizard.navigate_to("b").await.unwrap();
    assert_eq!(wizard.current_step_number(), 2);

    let err = wizard.next().await.unwrap_err();
    assert_eq!(err, NavigationError::NoNextStep("b".into()));

    wizard.mark_step_complete("b", true).unwrap();
    assert_eq!(wizard.next().await.unwrap().as_str(), "c");
    assert_eq!(wizard.current_step_number(), 3);
}

#[tokio::test]
async fn backward_navigation_is_never_gated() {
    let mut wizard = Wizard::new(chain(), BindingConfig::default());
    wizard.restore(3, StepStates::new()).await.unwrap();
    assert_eq!(wizard.current_step_id().as_str(), "c");

    assert_eq!(wizard.previous().await.unwrap().as_str(), "b");
    wizard.navigate_to("a").await.unwrap();
    assert_eq!(
        wizard.previous().await.unwrap_err(),
        NavigationError::NoPreviousStep("a".into())
    );
}

#[tokio::test]
async fn unknown_target_and_self_navigation() {
    let mut wizard = Wizard::new(chain(), BindingConfig::default());
    assert_eq!(
        wizard.navigate_to("zzz").await.unwrap_err(),
        NavigationError::UnknownStep("zzz".into())
    );
    wizard.navigate_to("a").await.unwrap();
    assert_eq!(wizard.current_step_number(), 1);
}

fn guarded(from: RecordingGuard, to: RecordingGuard) -> Arc<StepRegistry> {
    Arc::new(
        StepRegistry::builder()
            .step(step("a").with_guard(from))
            .step(step("b").with_guard(to))
            .build()
            .unwrap(),
    )
}

/// Hooks run leave-check, enter-check, before-leave, then after-enter.
#[tokio::test]
async fn guard_hooks_run_in_order() {
    let log = hook_log();
    let registry = guarded(RecordingGuard::new("a", &log), RecordingGuard::new("b", &log));
    let mut wizard = Wizard::new(registry, BindingConfig::default());

    wizard.navigate_to("b").await.unwrap();

    assert_eq!(
        *log.lock(),
        vec!["a.can_leave", "b.can_enter", "a.before_leave", "b.after_enter"]
    );
    assert_eq!(wizard.current_step_id().as_str(), "b");
}

/// A false `can_leave` means no other hook is consulted.
#[tokio::test]
async fn refused_leave_short_circuits() {
    let log = hook_log();
    let registry = guarded(
        RecordingGuard::new("a", &log).deny_leave(),
        RecordingGuard::new("b", &log),
    );
    let mut wizard = Wizard::new(registry, BindingConfig::default());

    let err = wizard.navigate_to("b").await.unwrap_err();

    assert_eq!(err, NavigationError::LeaveDenied("a".into()));
    assert!(err.is_guard_veto());
    assert_eq!(*log.lock(), vec!["a.can_leave"]);
    assert_eq!(wizard.current_step_id().as_str(), "a");
}

#[tokio::test]
async fn refused_enter_skips_before_leave() {
    let log = hook_log();
    let registry = guarded(
        RecordingGuard::new("a", &log),
        RecordingGuard::new("b", &log).deny_enter(),
    );
    let mut wizard = Wizard::new(registry, BindingConfig::default());

    let err = wizard.navigate_to("b").await.unwrap_err();

    assert_eq!(err, NavigationError::EnterDenied("b".into()));
    assert_eq!(*log.lock(), vec!["a.can_leave", "b.can_enter"]);
}

#[tokio::test]
async fn before_leave_veto_keeps_current_step() {
    let log = hook_log();
    let registry = guarded(
        RecordingGuard::new("a", &log).veto("unsaved work"),
        RecordingGuard::new("b", &log),
    );
    let mut wizard = Wizard::new(registry, BindingConfig::default());

    let err = wizard.navigate_to("b").await.unwrap_err();

    assert!(matches!(err, NavigationError::Vetoed { ref step, .. } if step.as_str() == "a"));
    assert_eq!(*log.lock(), vec!["a.can_leave", "b.can_enter", "a.before_leave"]);
    assert_eq!(wizard.current_step_id().as_str(), "a");
}

#[tokio::test]
async fn failing_after_enter_does_not_revert() {
    let log = hook_log();
    let registry = guarded(
        RecordingGuard::new("a", &log),
        RecordingGuard::new("b", &log).fail_after_enter(),
    );
    let mut wizard = Wizard::new(registry, BindingConfig::default());

    wizard.navigate_to("b").await.unwrap();
    assert_eq!(wizard.current_step_id().as_str(), "b");
}

#[tokio::test(start_paused = true)]
async fn article_workflow_end_to_end() {
    let mut wizard = Wizard::new(Arc::new(article_workflow()), BindingConfig::default());
    wizard.start().await;
    assert!(!wizard.can_advance());

    // Completion alone does not satisfy the selection guard
    wizard.mark_step_complete(SELECT_STEP, true).unwrap();
    assert_eq!(
        wizard.navigate_to(EXECUTE_STEP).await.unwrap_err(),
        NavigationError::LeaveDenied(SELECT_STEP.into())
    );

    wizard.update_step_data(selection_data(2)).unwrap();
    wizard.navigate_to(EXECUTE_STEP).await.unwrap();
    assert_eq!(
        wizard.binding().errors(),
        vec!["No analysis job has been started".to_string()]
    );

    wizard.update_step_data(job_data("RUNNING", 1, 0)).unwrap();
    wizard.mark_step_complete(EXECUTE_STEP, true).unwrap();
    let err = wizard.navigate_to(RESULTS_STEP).await.unwrap_err();
    assert!(matches!(err, NavigationError::Vetoed { .. }));

    wizard.update_step_data(job_data("COMPLETED", 2, 3)).unwrap();
    wizard.navigate_to(RESULTS_STEP).await.unwrap();
    assert_eq!(wizard.current_step_number(), 3);
    assert_eq!(
        wizard.binding().errors(),
        vec!["Results data is not in the expected format".to_string()]
    );

    wizard.update_step_data(results_data(0)).unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(wizard.can_advance());
    assert_eq!(
        wizard.binding().warnings(),
        vec!["No results are available for review".to_string()]
    );

    wizard.update_step_data(results_data(2)).unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(wizard.store().is_valid(RESULTS_STEP));
    assert!(!wizard.binding().has_warnings());
}

#[tokio::test]
async fn restore_merges_with_registry() {
    let mut wizard = Wizard::new(chain(), BindingConfig::default());

    let mut states = StepStates::new();
    let mut b = StepState::new("b");
    b.is_complete = true;
    b.data = json!({"kept": true});
    states.insert("ghost".into(), StepState::new("ghost"));
    states.insert("b".into(), b);

    wizard.restore(2, states).await.unwrap();

    let (number, snapshot) = wizard.snapshot_parts();
    assert_eq!(number, 2);
    let ids: Vec<&str> = snapshot.keys().map(StepId::as_str).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(snapshot["b"].data, json!({"kept": true}));
    assert!(snapshot["b"].is_complete);
}

#[tokio::test]
async fn restore_keys_states_by_slot() {
    let mut wizard = Wizard::new(chain(), BindingConfig::default());

    let mut mislabelled = StepState::new("b");
    mislabelled.data = json!({"from": "slot a"});
    let mut states = StepStates::new();
    states.insert("a".into(), mislabelled);

    wizard.restore(1, states).await.unwrap();

    let restored = wizard.store().get("a").unwrap();
    assert_eq!(restored.id.as_str(), "a");
    assert_eq!(restored.data, json!({"from": "slot a"}));
    assert_eq!(wizard.store().get("b").unwrap().data, json!({}));
}

#[tokio::test]
async fn restore_rejects_out_of_range_step() {
    let mut wizard = Wizard::new(chain(), BindingConfig::default());
    for bad in [0, 4] {
        assert_eq!(
            wizard.restore(bad, StepStates::new()).await.unwrap_err(),
            NavigationError::StepOutOfRange { number: bad, total: 3 }
        );
    }
    assert_eq!(wizard.current_step_number(), 1);
}

#[tokio::test]
async fn reset_discards_progress() {
    let mut wizard = Wizard::new(chain(), BindingConfig::default());
    wizard.mark_step_complete("a", true).unwrap();
    wizard.navigate_to("b").await.unwrap();

    wizard.reset().await;

    assert_eq!(wizard.current_step_number(), 1);
    assert!(!wizard.store().is_complete("a"));
}

#[tokio::test(start_paused = true)]
async fn leaving_a_step_cancels_its_waiting_validation() {
    let a = CountingValidator::passing();
    let registry = Arc::new(
        StepRegistry::builder()
            .step(StepDefinition::new("a", "A", a.clone()))
            .step(step("b"))
            .build()
            .unwrap(),
    );
    let config = BindingConfig::default().with_validate_on_activation(false);
    let mut wizard = Wizard::new(registry, config);

    wizard.update_step_data(json!({"draft": 1})).unwrap();
    wizard.navigate_to("b").await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(a.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn debounced_run_writes_back_to_store() {
    let mut wizard = Wizard::new(chain(), BindingConfig::default());
    let mut events = wizard.subscribe();
    wizard.dirty_flag().clear();

    wizard.update_step_data(json!({"x": 1})).unwrap();
    assert!(!wizard.store().is_valid("a"));
    assert!(wizard.dirty_flag().is_dirty());

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(wizard.store().is_valid("a"));
    assert!(wizard.can_advance());
    assert_eq!(
        events.recv().await.unwrap(),
        ValidationEvent::ValidityChanged { step: "a".into(), is_valid: true }
    );

    // Navigation itself is unaffected by the re-bind
    wizard.mark_step_complete("a", true).unwrap();
    wizard.navigate_to("b").await.unwrap();
}
