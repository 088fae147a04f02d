//! Process-wide client state.
//!
//! A [`Store`] owns one slice per concern ([`AuthState`], [`TaskState`]) and
//! the sending half of the UI event channel. It is built explicitly with
//! [`Store::init`] and shared by `Arc`; tests create one per case.
//!
//! Slices are only reachable through closures that run under the slice's
//! lock, so a guard can never be held across an `.await`.

pub mod auth;
pub mod notify;
pub mod tasks;

pub use auth::AuthState;
pub use notify::{Notification, NotificationLevel, Notifier, Surface, UiEvent};
pub use tasks::TaskState;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::config::ClientConfig;
use crate::session::AuthSession;

/// Shared container of all state slices.
#[derive(Debug)]
pub struct Store {
    auth: Mutex<AuthState>,
    tasks: Mutex<TaskState>,
    notifier: Notifier,
}

impl Store {
    /// Builds an empty store and returns it with the UI event receiver.
    #[must_use]
    pub fn init(config: &ClientConfig) -> (Arc<Self>, mpsc::Receiver<UiEvent>) {
        let (notifier, rx) = Notifier::channel(config.notification_buffer);
        let store = Self {
            auth: Mutex::new(AuthState::default()),
            tasks: Mutex::new(TaskState::new(config.per_page)),
            notifier,
        };
        (Arc::new(store), rx)
    }

    /// Runs `f` with exclusive access to the auth slice.
    pub fn with_auth<R>(&self, f: impl FnOnce(&mut AuthState) -> R) -> R {
        f(&mut self.auth.lock())
    }

    /// Runs `f` with exclusive access to the task slice.
    pub fn with_tasks<R>(&self, f: impl FnOnce(&mut TaskState) -> R) -> R {
        f(&mut self.tasks.lock())
    }

    /// A copy of the auth slice.
    #[must_use]
    pub fn auth(&self) -> AuthState {
        self.auth.lock().clone()
    }

    /// A copy of the task slice.
    #[must_use]
    pub fn tasks(&self) -> TaskState {
        self.tasks.lock().clone()
    }

    /// The UI event sender.
    #[must_use]
    pub const fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Seeds the auth slice from a persisted session.
    pub fn hydrate(&self, session: &AuthSession) {
        *self.auth.lock() = AuthState::from_session(session);
    }

    /// Signs out locally: auth and task slices are reset.
    pub fn sign_out(&self) {
        self.auth.lock().logout();
        self.tasks.lock().clear();
    }
}
