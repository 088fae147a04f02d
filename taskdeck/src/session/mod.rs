//! Persisted session storage.
//!
//! The signed-in session (`{user, token, isAuthenticated}`) is stored as
//! JSON under a single key in a [`KeyValueStore`]. [`TokenStore`] keeps an
//! in-memory copy so request paths never touch the disk, and writes through
//! on every change.

mod file;

pub use file::FileStore;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use taskdeck_proto::auth::User;

/// Errors from a [`KeyValueStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("session storage I/O error at {path}: {source}")]
    Io {
        /// File that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Stored data is not valid JSON of the expected shape.
    #[error("session storage is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A string key-value store that survives restarts.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`; removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// Process-local store, used by tests and when no data directory exists.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// The persisted part of the auth state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// The signed-in account, if known.
    #[serde(default)]
    pub user: Option<User>,
    /// Bearer token.
    #[serde(default)]
    pub token: Option<String>,
    /// Whether the session is considered signed in.
    #[serde(default)]
    pub is_authenticated: bool,
}

impl AuthSession {
    /// A signed-in session.
    #[must_use]
    pub const fn authenticated(user: Option<User>, token: String) -> Self {
        Self {
            user,
            token: Some(token),
            is_authenticated: true,
        }
    }
}

/// Holder of the bearer token, backed by a [`KeyValueStore`].
///
/// Storage failures are logged and swallowed: the in-memory session stays
/// authoritative for the running process.
pub struct TokenStore {
    backend: Box<dyn KeyValueStore>,
    key: String,
    current: Mutex<AuthSession>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("key", &self.key)
            .field("authenticated", &self.current.lock().is_authenticated)
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Opens the store and loads any session persisted under `key`.
    ///
    /// An unreadable or corrupt entry is logged and treated as signed out.
    pub fn open(backend: impl KeyValueStore + 'static, key: impl Into<String>) -> Self {
        let key = key.into();
        let current = match backend.get(&key) {
            Ok(Some(raw)) => serde_json::from_str::<AuthSession>(&raw).unwrap_or_else(|e| {
                tracing::warn!(key = %key, error = %e, "discarding unreadable session");
                AuthSession::default()
            }),
            Ok(None) => AuthSession::default(),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to read persisted session");
                AuthSession::default()
            }
        };
        Self {
            backend: Box::new(backend),
            key,
            current: Mutex::new(current),
        }
    }

    /// An empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(MemoryStore::new(), crate::config::DEFAULT_STORAGE_KEY)
    }

    /// The current session.
    #[must_use]
    pub fn session(&self) -> AuthSession {
        self.current.lock().clone()
    }

    /// The current bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.current.lock().token.clone()
    }

    /// Replaces and persists the session.
    pub fn save(&self, session: AuthSession) {
        let mut current = self.current.lock();
        self.persist(&session);
        *current = session;
    }

    /// Updates the stored user, keeping the token.
    pub fn set_user(&self, user: User) {
        let mut current = self.current.lock();
        let mut next = current.clone();
        next.user = Some(user);
        self.persist(&next);
        *current = next;
    }

    /// Forgets the session.
    pub fn clear(&self) {
        let mut current = self.current.lock();
        *current = AuthSession::default();
        if let Err(e) = self.backend.remove(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "failed to remove persisted session");
        }
    }

    /// Clears the session only if its token is still `token`.
    ///
    /// Returns `true` if this call cleared it. The comparison and the clear
    /// happen under one lock, so concurrent callers holding the same stale
    /// token see exactly one `true`.
    pub fn clear_if_current(&self, token: &str) -> bool {
        let mut current = self.current.lock();
        if current.token.as_deref() != Some(token) {
            return false;
        }
        *current = AuthSession::default();
        if let Err(e) = self.backend.remove(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "failed to remove persisted session");
        }
        true
    }

    fn persist(&self, session: &AuthSession) {
        let encoded = match serde_json::to_string(session) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode session");
                return;
            }
        };
        if let Err(e) = self.backend.set(&self.key, &encoded) {
            tracing::warn!(key = %self.key, error = %e, "failed to persist session");
        }
    }
}
