//! Client-side credential storage.
//!
//! The auth service issues a bearer token that both the realtime channel and
//! the HTTP client read from a shared store. The channel re-checks the store
//! before every reconnect attempt so a logout immediately stops reconnection.

use std::sync::{Arc, RwLock};

/// Source of the current session credential.
///
/// Implemented by the shared store below; tests may supply their own.
pub trait CredentialSource: Send + Sync {
    /// Returns the current bearer token, or `None` when logged out.
    fn token(&self) -> Option<String>;
}

/// A shared, mutable credential store.
///
/// Writes are last-write-wins; `clear` models logout.
#[derive(Debug, Default)]
pub struct SharedCredential {
    token: RwLock<Option<String>>,
}

impl SharedCredential {
    /// Creates an empty store (logged out).
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a store seeded with a token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Arc<Self> {
        let store = Self::default();
        *store.token.write().expect("credential lock poisoned") = Some(token.into());
        Arc::new(store)
    }

    /// Stores a new token.
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().expect("credential lock poisoned") = Some(token.into());
    }

    /// Clears the stored token (logout).
    pub fn clear(&self) {
        *self.token.write().expect("credential lock poisoned") = None;
    }
}

impl CredentialSource for SharedCredential {
    fn token(&self) -> Option<String> {
        self.token.read().expect("credential lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_has_no_token() {
        let store = SharedCredential::new();
        assert!(store.token().is_none());
    }

    #[test]
    fn set_and_clear() {
        let store = SharedCredential::new();
        store.set("abc123");
        assert_eq!(store.token().as_deref(), Some("abc123"));

        store.clear();
        assert!(store.token().is_none());
    }

    #[test]
    fn seeded_store() {
        let store = SharedCredential::with_token("seed");
        assert_eq!(store.token().as_deref(), Some("seed"));
    }
}
