//! Credential storage trait and in-memory implementation.
//!
//! The login use case only needs a yes/no answer for a username/password
//! pair. How credentials are stored and compared is up to the backend.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::AuthResult;
use crate::error::AuthError;
use crate::password::{burn_verification, hash_password, verify_password};

/// Verifies username/password pairs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Checks `password` against the stored credential for `username`.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the password matches
    /// - `Ok(false)` if the user exists and the password does not match
    ///
    /// # Errors
    ///
    /// - `AuthError::UserNotFound` if the username is unknown
    /// - `AuthError::Storage` if the backend could not answer
    async fn verify(&self, username: &str, password: &str) -> AuthResult<bool>;
}

/// Credential store held in process memory.
///
/// Passwords are kept only as salted Argon2id PHC strings. Unknown
/// usernames are checked against a throwaway hash so timing does not
/// reveal which accounts exist.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<String, String>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from `(username, password)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if a password cannot be hashed.
    pub fn with_users<I, U, P>(users: I) -> AuthResult<Self>
    where
        I: IntoIterator<Item = (U, P)>,
        U: Into<String>,
        P: AsRef<str>,
    {
        let store = Self::new();
        for (username, password) in users {
            store.set_password(username, password.as_ref())?;
        }
        Ok(store)
    }

    /// Adds a user or replaces their password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the password cannot be hashed.
    pub fn set_password(&self, username: impl Into<String>, password: &str) -> AuthResult<()> {
        let hash = hash_password(password)
            .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?;
        self.users.insert(username.into(), hash);
        Ok(())
    }

    /// Removes a user. Returns `true` if the user existed.
    pub fn remove_user(&self, username: &str) -> bool {
        self.users.remove(username).is_some()
    }

    /// Number of users held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if no users are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn verify(&self, username: &str, password: &str) -> AuthResult<bool> {
        let stored = self.users.get(username).map(|entry| entry.value().clone());
        let password = password.to_owned();

        // Argon2 is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || match stored {
            Some(hash) => verify_password(&password, &hash)
                .map_err(|e| AuthError::storage(format!("stored hash is invalid: {e}"))),
            None => {
                burn_verification(&password);
                Err(AuthError::UserNotFound)
            }
        })
        .await
        .map_err(|e| AuthError::internal(format!("credential check aborted: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryCredentialStore {
        InMemoryCredentialStore::with_users([("alice", "correct horse"), ("bob", "hunter2")])
            .unwrap()
    }

    #[tokio::test]
    async fn test_verify_correct_password() {
        assert!(store().verify("alice", "correct horse").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_wrong_password() {
        let store = store();
        assert!(!store.verify("alice", "hunter2").await.unwrap());
        assert!(!store.verify("alice", "").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let result = store().verify("mallory", "anything").await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[test]
    fn test_passwords_stored_as_salted_hashes() {
        let store =
            InMemoryCredentialStore::with_users([("alice", "shared"), ("bob", "shared")]).unwrap();
        let alice = store.users.get("alice").unwrap().clone();
        let bob = store.users.get("bob").unwrap().clone();

        assert!(alice.starts_with("$argon2id$"));
        assert!(!alice.contains("shared"));
        assert_ne!(alice, bob);
    }

    #[tokio::test]
    async fn test_corrupt_hash_is_storage_error() {
        let store = InMemoryCredentialStore::new();
        store.users.insert("alice".into(), "garbage".into());
        let result = store.verify("alice", "anything").await;
        assert!(matches!(result, Err(AuthError::Storage { .. })));
    }

    #[tokio::test]
    async fn test_set_and_remove_user() {
        let store = store();
        store.set_password("alice", "new password").unwrap();
        assert!(!store.verify("alice", "correct horse").await.unwrap());
        assert!(store.verify("alice", "new password").await.unwrap());

        assert!(store.remove_user("bob"));
        assert!(!store.remove_user("bob"));
        assert_eq!(store.len(), 1);
        assert!(store.verify("bob", "hunter2").await.is_err());
    }
}
