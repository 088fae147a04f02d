//! Integration tests for optimistic create, update, status change and
//! delete against the in-memory backend.
//!
//! Verification command: `cargo test --test optimistic_updates`

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use taskdeck::api::loopback::{LoopbackBackend, Operation};
use taskdeck::api::{ApiClient, ApiError};
use taskdeck::config::ClientConfig;
use taskdeck::engine::{MutationOutcome, OptimisticEngine};
use taskdeck::session::{AuthSession, TokenStore};
use taskdeck::store::{NotificationLevel, Store, UiEvent};
use taskdeck_proto::task::{TaskDraft, TaskId, TaskPatch, TaskStatus};

// =============================================================================
// Test helpers
// =============================================================================

/// Engine over a signed-in loopback backend with `names` already on the
/// server, loaded into the store.
async fn setup(names: &[&str]) -> (OptimisticEngine<LoopbackBackend>, mpsc::Receiver<UiEvent>) {
    let (store, rx) = Store::init(&ClientConfig::default());
    let backend = LoopbackBackend::new();
    let token = backend.seed_session();
    for name in names {
        backend.seed_task(TaskDraft::named(*name));
    }
    let tokens = Arc::new(TokenStore::in_memory());
    tokens.save(AuthSession::authenticated(None, token));
    let api = ApiClient::new(backend, tokens, store, Duration::from_secs(30));
    let engine = OptimisticEngine::new(Arc::new(api));
    engine.refresh().await.expect("initial load");
    (engine, rx)
}

fn store(engine: &OptimisticEngine<LoopbackBackend>) -> &Store {
    engine.api().store()
}

fn backend(engine: &OptimisticEngine<LoopbackBackend>) -> &LoopbackBackend {
    engine.api().backend()
}

fn drain(rx: &mut mpsc::Receiver<UiEvent>) -> Vec<UiEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn errors(events: &[UiEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            UiEvent::Notify(n) if n.level == NotificationLevel::Error => Some(n.message.as_str()),
            _ => None,
        })
        .collect()
}

fn server_error() -> ApiError {
    ApiError::Server {
        status: 500,
        message: "Server Error".into(),
    }
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn create_inserts_placeholder_at_head_then_replaces_it() {
    let (engine, mut rx) = setup(&["a", "b", "c"]).await;

    let mutation = engine.create(TaskDraft::named("Write report"));
    let temp_id = mutation.target().clone();
    assert!(temp_id.is_temporary());

    let state = store(&engine).tasks();
    assert_eq!(state.tasks().len(), 4);
    assert_eq!(state.tasks()[0].id, temp_id);
    assert_eq!(state.tasks()[0].name, "Write report");
    assert_eq!(state.meta().total, 4);

    let MutationOutcome::Confirmed(Some(server)) = mutation.settled().await else {
        panic!("create should confirm");
    };
    let state = store(&engine).tasks();
    assert_eq!(state.tasks().len(), 4);
    assert_eq!(state.tasks()[0].id, server.id);
    assert!(!state.contains(&temp_id));
    assert!(state.tasks().iter().all(|t| !t.is_temporary()));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        UiEvent::Notify(n) if n.message == "Task created successfully"
    )));
}

#[tokio::test]
async fn create_matches_by_temporary_id_not_name() {
    let (engine, _rx) = setup(&[]).await;
    backend(&engine).delay_next(Operation::CreateTask, Duration::from_millis(20));

    let first = engine.create(TaskDraft::named("same"));
    let second = engine.create(TaskDraft::named("same"));
    let (first_id, second_id) = (first.target().clone(), second.target().clone());

    let MutationOutcome::Confirmed(Some(second_server)) = second.settled().await else {
        panic!("second create should confirm");
    };
    let state = store(&engine).tasks();
    assert!(state.contains(&first_id), "first placeholder untouched");
    assert!(!state.contains(&second_id));
    assert!(state.contains(&second_server.id));

    assert!(first.settled().await.is_confirmed());
    let state = store(&engine).tasks();
    assert_eq!(state.tasks().len(), 2);
    assert!(state.tasks().iter().all(|t| !t.is_temporary()));
}

#[tokio::test]
async fn failed_create_keeps_placeholder_and_notifies_once() {
    let (engine, mut rx) = setup(&["a"]).await;
    backend(&engine).fail_next(Operation::CreateTask, server_error());

    let mutation = engine.create(TaskDraft::named("doomed"));
    let temp_id = mutation.target().clone();
    let outcome = mutation.settled().await;
    assert!(matches!(outcome, MutationOutcome::Unreconciled(ApiError::Server { .. })));

    let state = store(&engine).tasks();
    assert!(state.contains(&temp_id));
    assert_eq!(state.meta().total, 2);
    assert_eq!(errors(&drain(&mut rx)), ["Server Error"]);

    engine.refresh().await.unwrap();
    assert!(!store(&engine).tasks().contains(&temp_id));
}

#[tokio::test(start_paused = true)]
async fn deleting_placeholder_in_flight_deletes_server_copy() {
    let (engine, _rx) = setup(&[]).await;
    backend(&engine).delay_next(Operation::CreateTask, Duration::from_millis(100));

    let create = engine.create(TaskDraft::named("oops"));
    let temp_id = create.target().clone();

    let delete = engine.delete(temp_id.clone());
    assert_eq!(delete.settled().await, MutationOutcome::Confirmed(None));
    assert!(store(&engine).tasks().tasks().is_empty());
    assert_eq!(store(&engine).tasks().meta().total, 0);

    assert!(create.settled().await.is_confirmed());
    assert!(store(&engine).tasks().tasks().is_empty());
    assert!(backend(&engine).tasks().is_empty());
    assert_eq!(backend(&engine).call_count(Operation::DeleteTask), 1);
}

#[tokio::test(start_paused = true)]
async fn opening_placeholder_in_flight_stays_local() {
    let (engine, mut rx) = setup(&["a"]).await;
    backend(&engine).delay_next(Operation::CreateTask, Duration::from_secs(5));

    let create = engine.create(TaskDraft::named("draft card"));
    let temp_id = create.target().clone();
    let opened = engine.fetch_task(&temp_id).await.unwrap();

    assert_eq!(opened.id, temp_id);
    assert_eq!(opened.name, "draft card");
    assert_eq!(store(&engine).tasks().current().map(|t| &t.id), Some(&temp_id));
    assert!(store(&engine).tasks().error().is_none());
    assert_eq!(backend(&engine).call_count(Operation::GetTask), 0);
    assert!(errors(&drain(&mut rx)).is_empty());

    assert!(create.settled().await.is_confirmed());
    assert_eq!(backend(&engine).call_count(Operation::GetTask), 0);
}

#[tokio::test(start_paused = true)]
async fn create_settling_after_sign_out_is_silent() {
    let (engine, mut rx) = setup(&["a"]).await;
    backend(&engine).delay_next(Operation::CreateTask, Duration::from_millis(100));

    let create = engine.create(TaskDraft::named("late"));
    engine.api().tokens().clear();
    store(&engine).sign_out();
    drain(&mut rx);

    assert!(create.settled().await.is_confirmed());
    assert!(drain(&mut rx).is_empty());
    assert_eq!(backend(&engine).call_count(Operation::ListTasks), 1);
    let state = store(&engine).tasks();
    assert!(state.tasks().is_empty());
    assert!(state.error().is_none());
}

// =============================================================================
// Update and status change
// =============================================================================

#[tokio::test]
async fn status_change_reverts_on_server_error() {
    let (engine, mut rx) = setup(&[]).await;
    let mut draft = TaskDraft::named("ship it");
    draft.status = TaskStatus::InProgress;
    let task = backend(&engine).seed_task(draft);
    engine.refresh().await.unwrap();
    backend(&engine).fail_next(Operation::UpdateTask, server_error());

    let mutation = engine.change_status(task.id.clone(), TaskStatus::Done);
    assert_eq!(
        store(&engine).tasks().get(&task.id).map(|t| t.status),
        Some(TaskStatus::Done)
    );

    assert!(matches!(mutation.settled().await, MutationOutcome::RolledBack(_)));
    assert_eq!(
        store(&engine).tasks().get(&task.id).map(|t| t.status),
        Some(TaskStatus::InProgress)
    );
    assert_eq!(errors(&drain(&mut rx)), ["Server Error"]);
}

#[tokio::test]
async fn status_change_success_notifies_with_status_label() {
    let (engine, mut rx) = setup(&["a"]).await;
    let id = TaskId::new("1");

    assert!(engine.change_status(id.clone(), TaskStatus::Done).settled().await.is_confirmed());
    assert_eq!(backend(&engine).task(&id).map(|t| t.status), Some(TaskStatus::Done));
    assert!(drain(&mut rx).iter().any(|e| matches!(
        e,
        UiEvent::Notify(n) if n.message == "Task moved to Done"
    )));
}

#[tokio::test]
async fn unchanged_or_unknown_status_change_is_noop() {
    let (engine, _rx) = setup(&["a"]).await;
    let before = store(&engine).tasks();

    let same = engine.change_status(TaskId::new("1"), TaskStatus::Todo);
    assert_eq!(same.settled().await, MutationOutcome::Noop);
    let unknown = engine.change_status(TaskId::new("999"), TaskStatus::Done);
    assert_eq!(unknown.settled().await, MutationOutcome::Noop);

    assert_eq!(store(&engine).tasks().tasks(), before.tasks());
    assert_eq!(backend(&engine).call_count(Operation::UpdateTask), 0);
}

#[tokio::test]
async fn rollback_restores_exactly_the_patched_fields() {
    let (engine, _rx) = setup(&[]).await;
    let mut draft = TaskDraft::named("original");
    draft.description = Some("keep me".into());
    draft.due_date = chrono::NaiveDate::from_ymd_opt(2030, 1, 1);
    let task = backend(&engine).seed_task(draft);
    engine.refresh().await.unwrap();
    let before = store(&engine).tasks().get(&task.id).cloned().unwrap();

    backend(&engine).fail_next(Operation::UpdateTask, ApiError::Network("reset".into()));
    let patch = TaskPatch::name("renamed").with_due_date(None);
    let mutation = engine.update(task.id.clone(), patch);

    let applied = store(&engine).tasks().get(&task.id).cloned().unwrap();
    assert_eq!(applied.name, "renamed");
    assert_eq!(applied.due_date, None);
    assert_eq!(applied.description, before.description);

    assert!(matches!(mutation.settled().await, MutationOutcome::RolledBack(_)));
    assert_eq!(store(&engine).tasks().get(&task.id), Some(&before));
}

#[tokio::test(start_paused = true)]
async fn timed_out_update_rolls_back_like_a_network_failure() {
    let (engine, mut rx) = setup(&["a"]).await;
    let id = TaskId::new("1");
    let before = store(&engine).tasks().get(&id).cloned().unwrap();
    backend(&engine).delay_next(Operation::UpdateTask, Duration::from_secs(31));

    let mutation = engine.update(id.clone(), TaskPatch::name("too slow"));
    assert_eq!(store(&engine).tasks().get(&id).map(|t| t.name.as_str()), Some("too slow"));

    assert_eq!(mutation.settled().await, MutationOutcome::RolledBack(ApiError::Timeout));
    assert_eq!(store(&engine).tasks().get(&id), Some(&before));
    assert_eq!(errors(&drain(&mut rx)).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_updates_on_different_fields_both_survive() {
    let (engine, _rx) = setup(&["a"]).await;
    let id = TaskId::new("1");
    backend(&engine).delay_next(Operation::UpdateTask, Duration::from_millis(100));
    backend(&engine).delay_next(Operation::UpdateTask, Duration::from_millis(50));

    let rename = engine.update(id.clone(), TaskPatch::name("renamed"));
    let status = engine.change_status(id.clone(), TaskStatus::Done);

    assert!(status.settled().await.is_confirmed());
    let mid = store(&engine).tasks().get(&id).cloned().unwrap();
    assert_eq!(mid.name, "renamed", "pending rename not clobbered by status response");
    assert_eq!(mid.status, TaskStatus::Done);

    assert!(rename.settled().await.is_confirmed());
    let done = store(&engine).tasks().get(&id).cloned().unwrap();
    assert_eq!(done.name, "renamed");
    assert_eq!(done.status, TaskStatus::Done);
}

#[tokio::test(start_paused = true)]
async fn failed_rename_does_not_undo_concurrent_status_change() {
    let (engine, _rx) = setup(&["a"]).await;
    let id = TaskId::new("1");
    backend(&engine).delay_next(Operation::UpdateTask, Duration::from_millis(100));
    backend(&engine).delay_next(Operation::UpdateTask, Duration::from_millis(50));
    backend(&engine).fail_next(Operation::UpdateTask, server_error());

    let rename = engine.update(id.clone(), TaskPatch::name("renamed"));
    let status = engine.change_status(id.clone(), TaskStatus::Done);

    assert!(matches!(rename.settled().await, MutationOutcome::RolledBack(_)));
    assert!(status.settled().await.is_confirmed());
    let task = store(&engine).tasks().get(&id).cloned().unwrap();
    assert_eq!(task.name, "a");
    assert_eq!(task.status, TaskStatus::Done);
}

#[tokio::test(start_paused = true)]
async fn same_field_race_is_last_settled_wins() {
    let (engine, _rx) = setup(&["a"]).await;
    let id = TaskId::new("1");
    backend(&engine).delay_next(Operation::UpdateTask, Duration::from_millis(100));
    backend(&engine).delay_next(Operation::UpdateTask, Duration::from_millis(50));

    let slow = engine.update(id.clone(), TaskPatch::name("slow"));
    let fast = engine.update(id.clone(), TaskPatch::name("fast"));
    assert_eq!(store(&engine).tasks().get(&id).map(|t| t.name.clone()).unwrap(), "fast");

    assert!(fast.settled().await.is_confirmed());
    assert!(slow.settled().await.is_confirmed());
    assert_eq!(store(&engine).tasks().get(&id).map(|t| t.name.clone()).unwrap(), "slow");
    assert_eq!(backend(&engine).task(&id).map(|t| t.name).unwrap(), "slow");
}

#[tokio::test(start_paused = true)]
async fn failed_earlier_write_leaves_later_value_in_place() {
    let (engine, _rx) = setup(&["a"]).await;
    let id = TaskId::new("1");
    backend(&engine).delay_next(Operation::UpdateTask, Duration::from_millis(100));
    backend(&engine).delay_next(Operation::UpdateTask, Duration::from_millis(50));
    backend(&engine).fail_next(Operation::UpdateTask, server_error());

    let slow = engine.update(id.clone(), TaskPatch::name("slow"));
    let fast = engine.update(id.clone(), TaskPatch::name("fast"));

    assert!(fast.settled().await.is_confirmed());
    assert!(matches!(slow.settled().await, MutationOutcome::RolledBack(_)));
    assert_eq!(store(&engine).tasks().get(&id).map(|t| t.name.clone()).unwrap(), "fast");
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn delete_removes_immediately_and_decrements_meta() {
    let (engine, _rx) = setup(&["a", "b", "c"]).await;
    let id = TaskId::new("2");
    store(&engine).with_tasks(|t| t.set_current(t.get(&id).cloned()));

    let mutation = engine.delete(id.clone());
    let state = store(&engine).tasks();
    assert_eq!(state.tasks().len(), 2);
    assert_eq!(state.meta().total, 2);
    assert!(state.current().is_none());

    assert_eq!(mutation.settled().await, MutationOutcome::Confirmed(None));
    assert!(backend(&engine).task(&id).is_none());
}

#[tokio::test]
async fn failed_delete_refetches_then_notifies_once() {
    let (engine, mut rx) = setup(&["a", "b", "c"]).await;
    backend(&engine).fail_next(Operation::DeleteTask, ApiError::Network("offline".into()));

    let outcome = engine.delete(TaskId::new("2")).settled().await;
    assert!(matches!(outcome, MutationOutcome::Unreconciled(ApiError::Network(_))));

    let state = store(&engine).tasks();
    assert_eq!(state.tasks().len(), 3);
    assert_eq!(state.meta().total, 3);
    assert_eq!(backend(&engine).call_count(Operation::ListTasks), 2);
    assert_eq!(errors(&drain(&mut rx)).len(), 1);
}

#[tokio::test]
async fn meta_total_never_goes_negative() {
    let (engine, _rx) = setup(&["a"]).await;
    store(&engine).with_tasks(|t| {
        let mut meta = t.meta().clone();
        meta.total = 0;
        meta.count = 0;
        let tasks = t.tasks().to_vec();
        t.load_succeeded(tasks, meta);
    });
    assert!(engine.delete(TaskId::new("1")).settled().await.is_confirmed());
    assert_eq!(store(&engine).tasks().meta().total, 0);
    assert_eq!(store(&engine).tasks().meta().count, 0);
}
