//! Authentication slice.

use std::collections::BTreeMap;

use taskdeck_proto::auth::User;

use crate::session::AuthSession;

/// `{user, token, isAuthenticated, isLoading, error}` plus inline field
/// errors from the last failed auth request.
///
/// Fields change only through the transition methods; readers take a
/// snapshot from [`Store::auth`](super::Store::auth).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    user: Option<User>,
    token: Option<String>,
    is_authenticated: bool,
    is_loading: bool,
    error: Option<String>,
    field_errors: BTreeMap<String, String>,
}

impl AuthState {
    /// Seeds the slice from a persisted session.
    #[must_use]
    pub fn from_session(session: &AuthSession) -> Self {
        Self {
            user: session.user.clone(),
            token: session.token.clone(),
            is_authenticated: session.is_authenticated && session.token.is_some(),
            ..Self::default()
        }
    }

    /// An auth request started.
    pub fn start(&mut self) {
        self.is_loading = true;
        self.error = None;
        self.field_errors.clear();
    }

    /// A profile fetch started. Earlier errors stay visible until it settles.
    pub fn profile_start(&mut self) {
        self.is_loading = true;
    }

    /// Sign-in or registration succeeded.
    pub fn succeeded(&mut self, user: Option<User>, token: String) {
        if user.is_some() {
            self.user = user;
        }
        self.token = Some(token);
        self.is_authenticated = true;
        self.is_loading = false;
        self.error = None;
        self.field_errors.clear();
    }

    /// The profile was fetched.
    pub fn profile_loaded(&mut self, user: User) {
        self.user = Some(user);
        self.is_loading = false;
    }

    /// An auth request failed.
    pub fn failed(&mut self, message: String, errors: BTreeMap<String, String>) {
        self.is_loading = false;
        self.error = Some(message);
        self.field_errors = errors;
    }

    /// Signs out, keeping nothing.
    pub fn logout(&mut self) {
        *self = Self::default();
    }

    /// Dismisses the last error.
    pub fn clear_error(&mut self) {
        self.error = None;
        self.field_errors.clear();
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.field_errors
    }
}
