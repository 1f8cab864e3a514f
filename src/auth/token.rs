//! Bearer token persistence and the credential accessor
//!
//! The bearer token returned by `POST /api/auth/login` is stored in the
//! operating system's native credential store (Keychain on macOS, Secret
//! Service on Linux, Windows Credential Manager on Windows) via the
//! `keyring` crate.
//!
//! The request client never reads the keyring (or any global) directly:
//! it is handed a [`TokenSource`] capability at construction time and asks
//! it for the current credential at every call. This keeps the client
//! testable in isolation and lets an out-of-band refresh (a re-login from
//! another command) become visible to an in-flight retry.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

/// Keyring account under which the bearer token is stored.
const KEYRING_USER: &str = "bearer_token";

/// Source of the current bearer credential.
///
/// Implementations must be cheap to call: the request client reads the
/// token before every attempt, including the retry attempt after a 401.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns the current bearer token, if any.
    async fn current(&self) -> Option<String>;

    /// Re-reads the underlying store, picking up tokens written by another
    /// process or command since the last read.
    ///
    /// Called by the request client between a 401 response and its single
    /// retry, so a concurrently refreshed credential is used for the
    /// second attempt.
    async fn refresh(&self) -> Option<String>;
}

/// Namespaced accessor over the OS keyring entry holding the bearer token.
///
/// # Examples
///
/// ```no_run
/// use askdesk::auth::TokenStore;
///
/// let store = TokenStore::new("askdesk");
/// store.save("eyJhbGciOi...").unwrap();
/// assert!(store.load().unwrap().is_some());
/// store.clear().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct TokenStore {
    service: String,
}

impl TokenStore {
    /// Create a token store namespaced under the given keyring service.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(&self.service, KEYRING_USER)?)
    }

    /// Persist the bearer token.
    pub fn save(&self, token: &str) -> Result<()> {
        self.entry()?.set_password(token)?;
        tracing::debug!("Stored bearer token in keyring service '{}'", self.service);
        Ok(())
    }

    /// Load the bearer token, returning `None` when no entry exists.
    pub fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the stored token (logout). Missing entries are not an error.
    pub fn clear(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// [`TokenSource`] backed by the keyring with an in-memory cache.
///
/// `current()` serves from the cache; `refresh()` re-reads the keyring and
/// replaces the cache, which is how a token written by a concurrent
/// `askdesk login` becomes visible to the retry path.
pub struct KeyringTokenSource {
    store: TokenStore,
    cached: Arc<RwLock<Option<String>>>,
}

impl KeyringTokenSource {
    /// Create a source over the given keyring service, priming the cache
    /// from whatever the keyring currently holds.
    pub fn new(service: impl Into<String>) -> Self {
        let store = TokenStore::new(service);
        let initial = store.load().unwrap_or_else(|e| {
            tracing::warn!("Failed to read bearer token from keyring: {}", e);
            None
        });
        Self {
            store,
            cached: Arc::new(RwLock::new(initial)),
        }
    }
}

#[async_trait]
impl TokenSource for KeyringTokenSource {
    async fn current(&self) -> Option<String> {
        self.cached.read().await.clone()
    }

    async fn refresh(&self) -> Option<String> {
        let fresh = self.store.load().unwrap_or_else(|e| {
            tracing::warn!("Failed to re-read bearer token from keyring: {}", e);
            None
        });
        let mut guard = self.cached.write().await;
        *guard = fresh.clone();
        fresh
    }
}

/// Fixed-token [`TokenSource`] for tests and one-shot scripting.
///
/// `refresh()` returns the same token; the retry path still works, it just
/// cannot pick up a newer credential.
///
/// # Examples
///
/// ```
/// use askdesk::auth::{StaticTokenSource, TokenSource};
///
/// # tokio_test::block_on(async {
/// let source = StaticTokenSource::new("tok");
/// assert_eq!(source.current().await.as_deref(), Some("tok"));
/// # });
/// ```
pub struct StaticTokenSource {
    token: Option<String>,
}

impl StaticTokenSource {
    /// Create a source that always hands out `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Create a source with no credential at all.
    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn current(&self) -> Option<String> {
        self.token.clone()
    }

    async fn refresh(&self) -> Option<String> {
        self.token.clone()
    }
}
