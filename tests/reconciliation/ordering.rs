//! Arrival order and repeated delivery do not change the result.

use crate::{backends, by_number, fetch, submit_all};
use proptest::prelude::*;
use stepline::{Event, RawUpdate};

fn trace(with_start: bool) -> Vec<RawUpdate> {
    let mut updates = vec![
        RawUpdate::step("E1", "U1", 1, "compile", 2000),
        RawUpdate::label("E1", "U1", 1, "compile", "a", "x"),
        RawUpdate::end("E1", "U1", 2, 3000, "pass"),
    ];
    if with_start {
        updates.push(RawUpdate::start("E1", "U1", 0, "init", 1000));
    }
    updates
}

fn permutations(items: &[RawUpdate]) -> Vec<Vec<RawUpdate>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

fn reconcile(updates: &[RawUpdate]) -> Vec<Event> {
    backends()
        .iter()
        .map(|db| {
            submit_all(db, updates);
            by_number(fetch(db, "E1", "U1"))
        })
        .collect()
}

#[test]
fn test_every_permutation_converges() {
    let canonical = trace(true);
    let reference = reconcile(&canonical)[0].clone();
    assert_eq!(reference.creation_time, Some(1000));

    let orders = permutations(&canonical);
    assert_eq!(orders.len(), 24);
    for order in orders {
        for event in reconcile(&order) {
            assert_eq!(event, reference);
        }
    }
}

#[test]
fn test_without_start_creation_time_stays_unset() {
    for order in permutations(&trace(false)) {
        for event in reconcile(&order) {
            assert_eq!(event.creation_time, None);
            assert_eq!(event.result.as_deref(), Some("pass"));
            assert_eq!(event.step(1).unwrap().timestamp, 2000);
        }
    }
}

#[test]
fn test_repeated_step_and_start_are_idempotent() {
    let once = reconcile(&trace(true));
    let mut twice = trace(true);
    twice.extend(trace(true));
    twice.push(RawUpdate::start("E1", "U1", 0, "init", 1000));
    assert_eq!(reconcile(&twice), once);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn shuffled_deliveries_with_duplicates_converge(
        order in Just({
            let mut all = trace(true);
            all.extend(trace(true));
            all
        })
        .prop_shuffle()
    ) {
        let reference = reconcile(&trace(true));
        prop_assert_eq!(reconcile(&order), reference);
    }
}
