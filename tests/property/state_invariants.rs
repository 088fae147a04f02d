//! Property tests for the task slice's local transitions.
//!
//! Uses proptest to verify:
//! 1. Pagination metadata stays consistent under any mix of inserts and removals.
//! 2. Removing an id that is not listed changes nothing.
//! 3. Failed updates rolled back newest-first restore the original task.
//! 4. Rollback never leaves a field at a value nobody wrote.
//! 5. Resetting filters keeps the configured page size.

use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use taskdeck::engine::RollbackSnapshot;
use taskdeck::store::TaskState;
use taskdeck_proto::filter::FilterPatch;
use taskdeck_proto::task::{Task, TaskField, TaskId, TaskListMeta, TaskPatch, TaskStatus};

fn make_task(id: &str) -> Task {
    let at = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).single().unwrap_or_default();
    Task {
        id: TaskId::new(id),
        name: format!("task {id}"),
        description: None,
        status: TaskStatus::Todo,
        due_date: None,
        created_at: at,
        updated_at: at,
    }
}

/// A loaded first page of `n` tasks with ids "0".."n-1" and `total`
/// matching tasks server-side.
fn loaded(n: usize, total: u64, per_page: u32) -> TaskState {
    let mut state = TaskState::new(per_page);
    let tasks: Vec<Task> = (0..n).map(|i| make_task(&i.to_string())).collect();
    let meta = TaskListMeta {
        total: total.max(n as u64),
        count: n as u64,
        per_page: u64::from(per_page),
        current_page: 1,
        total_pages: total.max(n as u64).div_ceil(u64::from(per_page)).max(1),
    };
    state.load_succeeded(tasks, meta);
    state
}

#[derive(Debug, Clone)]
enum Op {
    Insert,
    Remove(usize),
    RemoveMissing,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Insert),
        (0usize..20).prop_map(Op::Remove),
        Just(Op::RemoveMissing),
    ]
}

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Done),
    ]
}

fn arb_field_patch() -> impl Strategy<Value = TaskPatch> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(TaskPatch::name),
        arb_status().prop_map(TaskPatch::status),
        prop::option::of("[a-z ]{0,12}").prop_map(|d| TaskPatch {
            description: Some(d),
            ..TaskPatch::default()
        }),
        prop::option::of((1u32..=28).prop_map(|d| NaiveDate::from_ymd_opt(2031, 2, d).unwrap_or_default()))
            .prop_map(|due| TaskPatch {
                due_date: Some(due),
                ..TaskPatch::default()
            }),
    ]
}

/// Applies each patch optimistically, as the engine does, returning the
/// snapshots in application order.
fn apply_all(state: &mut TaskState, id: &TaskId, patches: &[TaskPatch]) -> Vec<RollbackSnapshot> {
    patches
        .iter()
        .filter_map(|patch| {
            let snapshot = RollbackSnapshot::capture(state.get(id)?, patch);
            state.patch_by_id(id, patch);
            Some(snapshot)
        })
        .collect()
}

const FIELDS: [TaskField; 4] = [TaskField::Name, TaskField::Description, TaskField::Status, TaskField::DueDate];

proptest! {
    /// `count` never exceeds `per_page`, and `total` tracks inserts and
    /// successful removals without underflowing.
    #[test]
    fn meta_stays_consistent(
        listed in 0usize..10,
        extra in 0u64..30,
        ops in prop::collection::vec(arb_op(), 0..40),
    ) {
        let per_page = 10;
        let mut state = loaded(listed, listed as u64 + extra, per_page);
        let mut expected_total = state.meta().total;

        for op in ops {
            match op {
                Op::Insert => {
                    state.insert_local(make_task(&TaskId::temporary().to_string()));
                    expected_total += 1;
                }
                Op::Remove(i) => {
                    let id = state.tasks().get(i).map(|t| t.id.clone());
                    if let Some(id) = id {
                        prop_assert!(state.remove_by_id(&id).is_some());
                        expected_total = expected_total.saturating_sub(1);
                    }
                }
                Op::RemoveMissing => {
                    let before = state.clone();
                    prop_assert!(state.remove_by_id(&TaskId::new("missing")).is_none());
                    prop_assert_eq!(&state, &before);
                }
            }
            prop_assert!(state.meta().count <= state.meta().per_page);
            prop_assert_eq!(state.meta().total, expected_total);
        }
    }

    /// Rolling back failed updates newest-first leaves the task exactly as
    /// it was before any of them.
    #[test]
    fn lifo_rollback_restores_original(patches in prop::collection::vec(arb_field_patch(), 1..8)) {
        let mut state = loaded(3, 3, 10);
        let id = TaskId::new("1");
        let original = state.get(&id).cloned();

        let snapshots = apply_all(&mut state, &id, &patches);
        for snapshot in snapshots.iter().rev() {
            snapshot.restore(&mut state);
        }
        prop_assert_eq!(state.get(&id).cloned(), original);
    }

    /// Whatever order failures settle in, every field ends at its original
    /// value or at a value one of the mutations wrote.
    #[test]
    fn rollback_in_any_order_only_yields_written_values(
        patches in prop::collection::vec(arb_field_patch(), 1..8),
        order in Just((0..8).collect::<Vec<usize>>()).prop_shuffle(),
    ) {
        let mut state = loaded(3, 3, 10);
        let id = TaskId::new("1");
        let original = state.get(&id).cloned().unwrap_or_else(|| make_task("1"));

        let snapshots = apply_all(&mut state, &id, &patches);
        for index in order.into_iter().filter(|i| *i < snapshots.len()) {
            snapshots[index].restore(&mut state);
        }

        let task = state.get(&id).cloned().unwrap_or_else(|| make_task("1"));
        for field in FIELDS {
            let value = task.field_value(field);
            let allowed = value == original.field_value(field)
                || patches.iter().any(|p| p.restricted_to(&[field]) == value);
            prop_assert!(allowed, "{field} ended at an unwritten value");
        }
        prop_assert_eq!(state.meta(), &TaskListMeta {
            total: 3,
            count: 3,
            per_page: 10,
            current_page: 1,
            total_pages: 1,
        });
    }

    /// Any filter history followed by a reset yields the defaults at the
    /// configured page size.
    #[test]
    fn reset_keeps_configured_page_size(
        per_page in 1u32..50,
        pages in prop::collection::vec(1u32..10, 0..5),
        status in prop::option::of(arb_status()),
    ) {
        let mut state = TaskState::new(per_page);
        state.set_filters(FilterPatch::status(status));
        for page in pages {
            state.set_filters(FilterPatch::page(page));
        }
        state.reset_filters();
        prop_assert_eq!(state.filters().page, 1);
        prop_assert_eq!(state.filters().per_page, per_page);
        prop_assert!(!state.filters().is_narrowed());
    }
}
