//! Sign-in flows on top of the auth slice and the token store.

use std::sync::Arc;

use taskdeck_proto::auth::{AuthPayload, Credentials, Registration, User};

use crate::api::{ApiClient, ApiError, Backend};
use crate::session::AuthSession;
use crate::store::{AuthState, Store, Surface, UiEvent};

/// Drives register, login, logout, profile and session restore.
pub struct AuthController<B> {
    api: Arc<ApiClient<B>>,
}

impl<B> Clone for AuthController<B> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<B: Backend> AuthController<B> {
    pub const fn new(api: Arc<ApiClient<B>>) -> Self {
        Self { api }
    }

    fn store(&self) -> &Store {
        self.api.store()
    }

    /// Creates an account and signs in with it.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`]; validation errors are also stored inline
    /// on the auth slice.
    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        self.store().with_auth(|auth| auth.start());
        let result = self.api.register(registration).await;
        self.finish_sign_in(result, "Registration successful!")
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`]; wrong credentials are an ordinary failure.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        self.store().with_auth(|auth| auth.start());
        let result = self.api.login(credentials).await;
        self.finish_sign_in(result, "Successfully logged in!")
    }

    fn finish_sign_in(&self, result: Result<AuthPayload, ApiError>, success: &str) -> Result<(), ApiError> {
        match result {
            Ok(payload) => {
                let session = AuthSession::authenticated(payload.user.clone(), payload.access_token.clone());
                self.api.tokens().save(session);
                self.store()
                    .with_auth(|auth| auth.succeeded(payload.user, payload.access_token));
                tracing::info!("signed in");
                let notifier = self.store().notifier();
                notifier.success(success);
                notifier.emit(UiEvent::Redirect(Surface::Board));
                Ok(())
            }
            Err(e) => {
                let envelope = e.envelope();
                tracing::warn!(status = envelope.status, error = %e, "sign-in failed");
                if envelope.errors.is_empty() {
                    self.store().notifier().error(envelope.message.clone());
                }
                self.store()
                    .with_auth(|auth| auth.failed(envelope.message, envelope.errors));
                Err(e)
            }
        }
    }

    /// Signs out. The server call is best effort; local state is always
    /// cleared.
    pub async fn logout(&self) {
        if self.api.tokens().token().is_some() {
            if let Err(e) = self.api.logout().await {
                tracing::warn!(error = %e, "logout request failed, clearing local session anyway");
            }
        }
        self.api.tokens().clear();
        self.store().sign_out();
        tracing::info!("signed out");
        let notifier = self.store().notifier();
        notifier.success("Successfully signed out");
        notifier.emit(UiEvent::Redirect(Surface::Login));
    }

    /// Fetches the signed-in user. Does nothing without a token.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the profile call.
    pub async fn get_profile(&self) -> Result<Option<User>, ApiError> {
        if self.api.tokens().token().is_none() {
            return Ok(None);
        }
        self.store().with_auth(AuthState::profile_start);
        match self.api.profile().await {
            Ok(user) => {
                self.api.tokens().set_user(user.clone());
                self.store().with_auth(|auth| auth.profile_loaded(user.clone()));
                Ok(Some(user))
            }
            Err(e) => {
                self.store()
                    .with_auth(|auth| auth.failed(e.to_string(), Default::default()));
                Err(e)
            }
        }
    }

    /// Rehydrates the persisted session at startup. A session with a token
    /// but no user fetches the profile; if that fails, the session is
    /// dropped. Returns whether the user ends up signed in.
    pub async fn restore(&self) -> bool {
        let session = self.api.tokens().session();
        if session.token.is_none() {
            return false;
        }
        self.store().hydrate(&session);
        if session.user.is_some() {
            tracing::info!("session restored");
            return true;
        }
        match self.get_profile().await {
            Ok(_) => {
                tracing::info!("session restored after profile fetch");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored session rejected");
                self.api.tokens().clear();
                self.store().sign_out();
                false
            }
        }
    }
}
