//! Property tests for the dependency resolver.
//!
//! Guarantees exercised here:
//! - A step's dependencies are satisfied exactly when every prerequisite is complete.
//! - The next available step is the first later step whose prerequisites are complete.
//! - The previous step is always the one immediately before, regardless of completion.

use proptest::prelude::*;
use wizard_kernel::{StepDefinition, StepRegistry, StepStateStore};
use wizard_test_utils::CountingValidator;

fn id(index: usize) -> String {
    format!("s{index}")
}

/// Per-step prerequisite masks over earlier steps, plus a completion vector
fn arb_layout() -> impl Strategy<Value = (Vec<Vec<bool>>, Vec<bool>)> {
    (2usize..7).prop_flat_map(|n| {
        let masks: Vec<_> = (0..n)
            .map(|i| proptest::collection::vec(any::<bool>(), i))
            .collect();
        (masks, proptest::collection::vec(any::<bool>(), n))
    })
}

fn registry_for(masks: &[Vec<bool>]) -> StepRegistry {
    masks
        .iter()
        .enumerate()
        .fold(StepRegistry::builder(), |builder, (i, mask)| {
            let step = mask
                .iter()
                .enumerate()
                .filter(|(_, on)| **on)
                .fold(
                    StepDefinition::new(id(i), id(i).to_uppercase(), CountingValidator::passing()),
                    |step, (j, _)| step.depends_on(id(j)),
                );
            builder.step(step)
        })
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn gating_follows_prerequisite_completion((masks, complete) in arb_layout()) {
        let registry = registry_for(&masks);
        let store = StepStateStore::for_registry(&registry);
        for (i, done) in complete.iter().enumerate() {
            store.set_complete(&id(i), *done).unwrap();
        }

        let satisfied = |i: usize| {
            masks[i]
                .iter()
                .zip(&complete)
                .all(|(on, done)| !on || *done)
        };
        let n = masks.len();

        for i in 0..n {
            prop_assert_eq!(registry.check_step_dependencies(&id(i), &store), satisfied(i));
        }
        for from in 0..n {
            let expected = (from + 1..n).find(|&i| satisfied(i)).map(id);
            let actual = registry
                .next_available_step(&id(from), &store)
                .map(|step| step.id.as_str().to_string());
            prop_assert_eq!(actual, expected);

            let previous = registry
                .previous_available_step(&id(from))
                .map(|step| step.id.as_str().to_string());
            prop_assert_eq!(previous, from.checked_sub(1).map(id));
        }
    }
}
