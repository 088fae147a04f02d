//! Boundary to the task server.
//!
//! [`Backend`] is the raw REST contract. Implementations:
//! - [`http::HttpBackend`]: `reqwest` against a real server
//! - [`loopback::LoopbackBackend`]: in-memory server for tests and demos
//!
//! [`ApiClient`] wraps a backend and is the only thing the rest of the
//! client talks to. It attaches the bearer token, enforces the transport
//! timeout, and turns a 401 on an authenticated call into a forced logout.

pub mod http;
pub mod loopback;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use taskdeck_proto::auth::{AuthPayload, Credentials, Registration, User};
use taskdeck_proto::envelope::ErrorEnvelope;
use taskdeck_proto::filter::FilterSet;
use taskdeck_proto::task::{Task, TaskDraft, TaskId, TaskPage, TaskPatch};

use crate::session::TokenStore;
use crate::store::{Store, Surface, UiEvent};

/// Failure of a server call, already classified.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The server rejected the input (422).
    #[error("{message}")]
    Validation {
        /// Summary message.
        message: String,
        /// First message per offending field.
        errors: BTreeMap<String, String>,
    },

    /// Missing or expired credentials (401).
    #[error("{message}")]
    Unauthorized {
        /// Server message.
        message: String,
    },

    /// The addressed record does not exist (404).
    #[error("{message}")]
    NotFound {
        /// Server message.
        message: String,
    },

    /// Any other non-2xx status, or `success: false` on a 2xx.
    #[error("{message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Server message.
        message: String,
    },

    /// No response: connection refused, reset, DNS failure.
    #[error("network error: {0}")]
    Network(String),

    /// No response within the transport timeout.
    #[error("request timed out")]
    Timeout,

    /// A response arrived but its body did not decode.
    #[error("unexpected response from server: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status of the failure, or 0 when no response was received.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 422,
            Self::Unauthorized { .. } => 401,
            Self::NotFound { .. } => 404,
            Self::Server { status, .. } => *status,
            Self::Network(_) | Self::Timeout | Self::Decode(_) => 0,
        }
    }

    /// Per-field messages, for validation failures.
    #[must_use]
    pub const fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// The normalized `{status, message, errors}` shape.
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        let envelope = ErrorEnvelope::new(self.status(), self.to_string());
        match self {
            Self::Validation { errors, .. } => envelope.with_errors(errors.clone()),
            _ => envelope,
        }
    }
}

/// The REST contract of the task server.
///
/// Every method takes the bearer token to send, if any. Implementations
/// classify failures into [`ApiError`] but do not enforce timeouts or react
/// to 401s; [`ApiClient`] does both.
pub trait Backend: Send + Sync + 'static {
    /// `POST /register`
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<AuthPayload, ApiError>> + Send;

    /// `POST /login`
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<AuthPayload, ApiError>> + Send;

    /// `POST /logout`
    fn logout(&self, token: Option<&str>) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /user`
    fn profile(&self, token: Option<&str>) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// `GET /tasks`
    fn list_tasks(
        &self,
        token: Option<&str>,
        filters: &FilterSet,
    ) -> impl Future<Output = Result<TaskPage, ApiError>> + Send;

    /// `GET /tasks/:id`
    fn get_task(
        &self,
        token: Option<&str>,
        id: &TaskId,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `POST /tasks`
    fn create_task(
        &self,
        token: Option<&str>,
        draft: &TaskDraft,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `PUT /tasks/:id`
    fn update_task(
        &self,
        token: Option<&str>,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `DELETE /tasks/:id`
    fn delete_task(
        &self,
        token: Option<&str>,
        id: &TaskId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// The client's single entry point to the server.
pub struct ApiClient<B> {
    backend: B,
    tokens: Arc<TokenStore>,
    store: Arc<Store>,
    timeout: Duration,
}

impl<B> std::fmt::Debug for ApiClient<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> ApiClient<B> {
    /// Wraps `backend`. On a forced logout, `tokens` and `store` are
    /// cleared.
    pub const fn new(backend: B, tokens: Arc<TokenStore>, store: Arc<Store>, timeout: Duration) -> Self {
        Self {
            backend,
            tokens,
            store,
            timeout,
        }
    }

    /// The wrapped backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The token store.
    pub const fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// The shared state store.
    pub const fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// `POST /register`, sent without a token.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn register(&self, registration: &Registration) -> Result<AuthPayload, ApiError> {
        self.bounded(self.backend.register(registration)).await
    }

    /// `POST /login`, sent without a token. A 401 here is an ordinary
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, ApiError> {
        self.bounded(self.backend.login(credentials)).await
    }

    /// `POST /logout`
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn logout(&self) -> Result<(), ApiError> {
        let token = self.tokens.token();
        let result = self.bounded(self.backend.logout(token.as_deref())).await;
        self.check_auth(token.as_deref(), result)
    }

    /// `GET /user`
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn profile(&self) -> Result<User, ApiError> {
        let token = self.tokens.token();
        let result = self.bounded(self.backend.profile(token.as_deref())).await;
        self.check_auth(token.as_deref(), result)
    }

    /// `GET /tasks`
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn list_tasks(&self, filters: &FilterSet) -> Result<TaskPage, ApiError> {
        let token = self.tokens.token();
        let result = self
            .bounded(self.backend.list_tasks(token.as_deref(), filters))
            .await;
        self.check_auth(token.as_deref(), result)
    }

    /// `GET /tasks/:id`
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn get_task(&self, id: &TaskId) -> Result<Task, ApiError> {
        let token = self.tokens.token();
        let result = self.bounded(self.backend.get_task(token.as_deref(), id)).await;
        self.check_auth(token.as_deref(), result)
    }

    /// `POST /tasks`
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, ApiError> {
        let token = self.tokens.token();
        let result = self
            .bounded(self.backend.create_task(token.as_deref(), draft))
            .await;
        self.check_auth(token.as_deref(), result)
    }

    /// `PUT /tasks/:id`
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ApiError> {
        let token = self.tokens.token();
        let result = self
            .bounded(self.backend.update_task(token.as_deref(), id, patch))
            .await;
        self.check_auth(token.as_deref(), result)
    }

    /// `DELETE /tasks/:id`
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError> {
        let token = self.tokens.token();
        let result = self
            .bounded(self.backend.delete_task(token.as_deref(), id))
            .await;
        self.check_auth(token.as_deref(), result)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ApiError>> + Send,
    ) -> Result<T, ApiError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis(), "request timed out");
                Err(ApiError::Timeout)
            }
        }
    }

    /// A 401 on a call that carried `token` signs the user out, unless the
    /// token has since been replaced or another call already did so.
    fn check_auth<T>(&self, token: Option<&str>, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if matches!(result, Err(ApiError::Unauthorized { .. }))
            && token.is_some_and(|token| self.tokens.clear_if_current(token))
        {
            tracing::warn!("session rejected by server, signing out");
            self.store.sign_out();
            self.store.notifier().emit(UiEvent::Redirect(Surface::Login));
        }
        result
    }
}
