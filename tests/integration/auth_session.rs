//! Integration tests for sign-in, session persistence and forced logout.
//!
//! Verification command: `cargo test --test auth_session`

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use taskdeck::api::ApiClient;
use taskdeck::api::loopback::{LoopbackBackend, Operation};
use taskdeck::auth::AuthController;
use taskdeck::config::{ClientConfig, DEFAULT_STORAGE_KEY};
use taskdeck::engine::{MutationOutcome, OptimisticEngine};
use taskdeck::session::{FileStore, KeyValueStore, TokenStore};
use taskdeck::store::{NotificationLevel, Store, Surface, UiEvent};
use taskdeck_proto::auth::{Credentials, Registration};
use taskdeck_proto::task::{TaskDraft, TaskId, TaskPatch, TaskStatus};
use tokio::sync::mpsc;

struct Harness {
    auth: AuthController<LoopbackBackend>,
    engine: OptimisticEngine<LoopbackBackend>,
    rx: mpsc::Receiver<UiEvent>,
}

impl Harness {
    fn events(&mut self) -> Vec<UiEvent> {
        std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
    }

    fn store(&self) -> &Arc<Store> {
        self.engine.api().store()
    }

    fn backend(&self) -> &LoopbackBackend {
        self.engine.api().backend()
    }
}

fn harness(backend: LoopbackBackend, tokens: TokenStore) -> Harness {
    let (store, rx) = Store::init(&ClientConfig::default());
    let api = Arc::new(ApiClient::new(backend, Arc::new(tokens), store, Duration::from_secs(30)));
    Harness {
        auth: AuthController::new(Arc::clone(&api)),
        engine: OptimisticEngine::new(api),
        rx,
    }
}

fn file_tokens(path: &Path) -> TokenStore {
    TokenStore::open(FileStore::new(path), DEFAULT_STORAGE_KEY)
}

fn backend_with_user() -> LoopbackBackend {
    let backend = LoopbackBackend::new();
    backend.add_user("Grace", "grace@example.com", "hopper42");
    backend.seed_task(TaskDraft::named("write report"));
    backend
}

fn grace() -> Credentials {
    Credentials {
        email: "grace@example.com".into(),
        password: "hopper42".into(),
    }
}

fn redirects(events: &[UiEvent], to: Surface) -> usize {
    events.iter().filter(|e| **e == UiEvent::Redirect(to)).count()
}

fn error_toasts(events: &[UiEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, UiEvent::Notify(n) if n.level == NotificationLevel::Error))
        .count()
}

#[tokio::test]
async fn session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let backend = backend_with_user();

    let first = harness(backend.clone(), file_tokens(&path));
    first.auth.login(&grace()).await.unwrap();
    assert!(path.exists());

    let second = harness(backend, file_tokens(&path));
    assert!(second.auth.restore().await);
    let state = second.store().auth();
    assert!(state.is_authenticated());
    assert_eq!(state.user().map(|u| u.name.as_str()), Some("Grace"));
    assert_eq!(second.backend().call_count(Operation::Profile), 0);

    second.engine.refresh().await.unwrap();
    assert_eq!(second.store().tasks().tasks().len(), 1);
}

#[tokio::test]
async fn logout_removes_persisted_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let mut h = harness(backend_with_user(), file_tokens(&path));
    h.auth.login(&grace()).await.unwrap();
    h.events();

    h.auth.logout().await;
    let persisted = FileStore::new(&path).get(DEFAULT_STORAGE_KEY).unwrap();
    assert_eq!(persisted, None);
    assert!(!file_tokens(&path).session().is_authenticated);

    let events = h.events();
    assert_eq!(redirects(&events, Surface::Login), 1);
    assert_eq!(h.backend().call_count(Operation::Logout), 1);
}

#[tokio::test]
async fn corrupt_session_file_starts_signed_out() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    FileStore::new(&path)
        .set(DEFAULT_STORAGE_KEY, "{not json")
        .unwrap();

    let h = harness(backend_with_user(), file_tokens(&path));
    assert!(!h.auth.restore().await);
    assert!(!h.store().auth().is_authenticated());
}

#[tokio::test]
async fn register_then_board_loads() {
    let mut h = harness(backend_with_user(), TokenStore::in_memory());
    h.auth
        .register(&Registration::new("Linus", "linus@example.com", "penguins"))
        .await
        .unwrap();
    let events = h.events();
    assert_eq!(redirects(&events, Surface::Board), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        UiEvent::Notify(n) if n.message == "Registration successful!"
    )));

    h.engine.refresh().await.unwrap();
    assert_eq!(h.store().tasks().meta().total, 1);
}

#[tokio::test]
async fn concurrent_unauthorized_calls_redirect_once() {
    let mut h = harness(backend_with_user(), TokenStore::in_memory());
    h.auth.login(&grace()).await.unwrap();
    h.engine.refresh().await.unwrap();
    h.events();
    h.backend().expire_tokens();

    let id = TaskId::new("1");
    let (list, fetch, moved) = tokio::join!(
        h.engine.refresh(),
        h.engine.fetch_task(&id),
        h.engine.change_status(id.clone(), TaskStatus::Done).settled(),
    );
    assert!(list.unwrap_err().is_unauthorized());
    assert!(fetch.unwrap_err().is_unauthorized());
    assert!(matches!(moved, MutationOutcome::RolledBack(ref e) if e.is_unauthorized()));

    let events = h.events();
    assert_eq!(redirects(&events, Surface::Login), 1);
    assert_eq!(error_toasts(&events), 0);
    assert!(!h.store().auth().is_authenticated());
    assert!(h.store().tasks().tasks().is_empty());
}

#[tokio::test]
async fn unauthorized_update_leaves_no_stale_task() {
    let mut h = harness(backend_with_user(), TokenStore::in_memory());
    h.auth.login(&grace()).await.unwrap();
    h.engine.refresh().await.unwrap();
    h.events();
    h.backend().expire_tokens();

    let outcome = h
        .engine
        .update(TaskId::new("1"), TaskPatch::name("renamed"))
        .settled()
        .await;
    assert!(outcome.error().is_some_and(|e| e.is_unauthorized()));
    assert!(h.store().tasks().get(&TaskId::new("1")).is_none());
    assert_eq!(error_toasts(&h.events()), 0);
}

#[tokio::test]
async fn failed_login_keeps_existing_session_untouched() {
    let mut h = harness(backend_with_user(), TokenStore::in_memory());
    h.auth.login(&grace()).await.unwrap();
    let token = h.engine.api().tokens().token();
    h.events();

    let wrong = Credentials {
        password: "nope".into(),
        ..grace()
    };
    assert!(h.auth.login(&wrong).await.is_err());
    assert_eq!(h.engine.api().tokens().token(), token);
    assert_eq!(redirects(&h.events(), Surface::Login), 0);
}

#[tokio::test]
async fn login_after_forced_logout_restores_access() {
    let mut h = harness(backend_with_user(), TokenStore::in_memory());
    h.auth.login(&grace()).await.unwrap();
    h.backend().expire_tokens();
    assert!(h.engine.refresh().await.is_err());
    h.events();

    h.auth.login(&grace()).await.unwrap();
    h.engine.refresh().await.unwrap();
    assert_eq!(h.store().tasks().tasks().len(), 1);
    assert_eq!(redirects(&h.events(), Surface::Board), 1);
}
