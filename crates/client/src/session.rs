//! Credentials and shared session state
//!
//! The session token is the one piece of shared mutable state in the client:
//! every in-flight request reads it, and a (re-)authentication replaces it
//! wholesale. Expiry is never known in advance — it is discovered reactively
//! when a request comes back 401.

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Immutable login credential pair, supplied at construction.
#[derive(Clone)]
pub(crate) struct Credentials {
    pub(crate) email: String,
    pub(crate) password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Thread-safe holder of the opaque session token.
#[derive(Clone, Default)]
pub struct SessionStore {
    token: Arc<RwLock<Option<String>>>,
}

impl SessionStore {
    /// Create an empty (unauthenticated) store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token, if a session is established.
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Replace the token after a successful login. The previous token is
    /// discarded, never merged.
    pub async fn replace(&self, token: String) {
        *self.token.write().await = Some(token);
    }

    /// Drop the session.
    pub async fn clear(&self) {
        *self.token.write().await = None;
    }

    /// `true` once a login has stored a token.
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }
}
