//! Integration tests for dragging cards between board columns.
//!
//! Drives [`DragState`] the way the board does and feeds its drops into the
//! engine.
//!
//! Verification command: `cargo test --test drag_drop`

use std::sync::Arc;
use std::time::Duration;

use taskdeck::api::ApiClient;
use taskdeck::api::loopback::{LoopbackBackend, Operation};
use taskdeck::board;
use taskdeck::config::ClientConfig;
use taskdeck::dragdrop::{DragState, DropEffect, StatusChange};
use taskdeck::engine::{MutationOutcome, OptimisticEngine};
use taskdeck::session::{AuthSession, TokenStore};
use taskdeck::store::Store;
use taskdeck_proto::task::{TaskDraft, TaskId, TaskStatus};

async fn setup() -> OptimisticEngine<LoopbackBackend> {
    let (store, _rx) = Store::init(&ClientConfig::default());
    let backend = LoopbackBackend::new();
    let token = backend.seed_session();
    backend.seed_task(TaskDraft::named("t1"));
    let mut doing = TaskDraft::named("t2");
    doing.status = TaskStatus::InProgress;
    backend.seed_task(doing);

    let tokens = Arc::new(TokenStore::in_memory());
    tokens.save(AuthSession::authenticated(None, token));
    let api = ApiClient::new(backend, tokens, store, Duration::from_secs(30));
    let engine = OptimisticEngine::new(Arc::new(api));
    engine.refresh().await.expect("initial load");
    engine
}

/// Plays a drop through the engine, as the board's drop handler does.
async fn drop_onto(engine: &OptimisticEngine<LoopbackBackend>, drag: &mut DragState) -> Option<MutationOutcome> {
    let StatusChange { id, status } = drag.drag_end()?;
    Some(engine.change_status(id, status).settled().await)
}

#[tokio::test]
async fn drop_on_other_column_moves_card_once() {
    let engine = setup().await;
    let mut drag = DragState::default();
    let id = TaskId::new("1");

    drag.drag_start(id.clone(), TaskStatus::Todo);
    drag.drag_enter(TaskStatus::Done);
    assert_eq!(drag.drag_over(), DropEffect::Move);

    let outcome = drop_onto(&engine, &mut drag).await;
    assert!(outcome.is_some_and(|o| o.is_confirmed()));
    assert!(drop_onto(&engine, &mut drag).await.is_none());

    let [todo, _, done] = engine.api().store().tasks().columns();
    assert!(todo.iter().all(|t| t.id != id));
    assert!(done.iter().any(|t| t.id == id));
    assert_eq!(engine.api().backend().call_count(Operation::UpdateTask), 1);
}

#[tokio::test]
async fn drop_on_source_column_issues_nothing() {
    let engine = setup().await;
    let mut drag = DragState::default();

    drag.drag_start(TaskId::new("2"), TaskStatus::InProgress);
    drag.drag_enter(TaskStatus::InProgress);
    assert!(drop_onto(&engine, &mut drag).await.is_none());
    assert_eq!(engine.api().backend().call_count(Operation::UpdateTask), 0);
}

#[tokio::test]
async fn cancelled_drag_issues_nothing() {
    let engine = setup().await;
    let mut drag = DragState::default();

    drag.drag_start(TaskId::new("1"), TaskStatus::Todo);
    drag.drag_enter(TaskStatus::InProgress);
    drag.cancel();
    assert!(drop_onto(&engine, &mut drag).await.is_none());
    assert_eq!(engine.api().backend().call_count(Operation::UpdateTask), 0);
}

#[tokio::test]
async fn stale_source_column_is_a_noop_in_the_engine() {
    let engine = setup().await;
    let mut drag = DragState::default();

    // Card already in Done on the server copy the store holds.
    let id = TaskId::new("1");
    assert!(engine.change_status(id.clone(), TaskStatus::Done).settled().await.is_confirmed());

    drag.drag_start(id, TaskStatus::Todo);
    drag.drag_enter(TaskStatus::Done);
    assert_eq!(drop_onto(&engine, &mut drag).await, Some(MutationOutcome::Noop));
    assert_eq!(engine.api().backend().call_count(Operation::UpdateTask), 1);
}

#[tokio::test]
async fn columns_reflect_optimistic_move_before_settle() {
    let engine = setup().await;
    let mut drag = DragState::default();

    drag.drag_start(TaskId::new("2"), TaskStatus::InProgress);
    drag.drag_enter(TaskStatus::Todo);
    let change = drag.drag_end().expect("drop");
    let mutation = engine.change_status(change.id, change.status);

    let columns = board::columns(engine.api().store().tasks().tasks());
    assert_eq!(columns[TaskStatus::Todo.column_index()].len(), 2);
    assert!(columns[TaskStatus::InProgress.column_index()].is_empty());
    assert!(mutation.settled().await.is_confirmed());
}
