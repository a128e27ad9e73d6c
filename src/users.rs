// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User store collaborator.
//!
//! The session layer only needs two lookups: by credentials at login and by
//! id on every request. Both are fallible and may be slow, so they are async.
//! [`InMemoryUserStore`] is the implementation used by the binary and tests;
//! persistent stores implement [`UserStore`] the same way.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;
use tokio::sync::RwLock;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Identity, UserId};

/// Default PBKDF2 iteration count for stored password hashes.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 600_000;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Errors surfaced by a user store.
#[derive(Debug, Error)]
pub enum UserStoreError {
    /// The backing service could not be reached.
    #[error("user store unavailable: {0}")]
    Unavailable(String),

    #[error("username already taken: {0}")]
    Conflict(String),

    #[error("user store failure: {0}")]
    Internal(String),
}

/// Lookup service for user identities.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find the user matching `credential` (username or email) and `password`.
    ///
    /// Returns `Ok(None)` for an unknown user and for a wrong password alike.
    async fn find_by_credentials(
        &self,
        credential: &str,
        password: &str,
    ) -> Result<Option<Identity>, UserStoreError>;

    /// Find a user by id. `Ok(None)` when the user no longer exists.
    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>, UserStoreError>;

    /// Readiness check for health probes.
    async fn health_check(&self) -> Result<(), UserStoreError> {
        Ok(())
    }
}

/// Salted PBKDF2-HMAC-SHA256 password hash.
#[derive(Clone)]
struct PasswordHash {
    iterations: NonZeroU32,
    salt: [u8; SALT_LEN],
    hash: [u8; HASH_LEN],
}

impl PasswordHash {
    fn derive(password: &str, iterations: NonZeroU32) -> Result<Self, UserStoreError> {
        let mut salt = [0_u8; SALT_LEN];
        SystemRandom::new()
            .fill(&mut salt)
            .map_err(|_| UserStoreError::Internal("salt generation failed".to_string()))?;

        let mut hash = [0_u8; HASH_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations,
            &salt,
            password.as_bytes(),
            &mut hash,
        );
        Ok(Self {
            iterations,
            salt,
            hash,
        })
    }

    /// Constant-time verification.
    fn verify(&self, password: &str) -> bool {
        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            &self.salt,
            password.as_bytes(),
            &self.hash,
        )
        .is_ok()
    }
}

struct StoredUser {
    identity: Identity,
    email: Option<String>,
    password: PasswordHash,
}

struct Users {
    by_id: HashMap<UserId, StoredUser>,
    next_id: UserId,
}

/// In-memory [`UserStore`].
#[derive(Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<Users>>,
    iterations: NonZeroU32,
    /// Verified against when the credential matches nobody, so unknown users
    /// cost the same as wrong passwords.
    decoy: Arc<PasswordHash>,
}

impl InMemoryUserStore {
    pub fn new() -> Result<Self, UserStoreError> {
        Self::with_iterations(DEFAULT_PBKDF2_ITERATIONS)
    }

    /// Store with a custom PBKDF2 cost.
    pub fn with_iterations(iterations: u32) -> Result<Self, UserStoreError> {
        let iterations = NonZeroU32::new(iterations)
            .ok_or_else(|| UserStoreError::Internal("iterations must be non-zero".to_string()))?;
        let decoy = PasswordHash::derive("decoy-password", iterations)?;
        Ok(Self {
            users: Arc::new(RwLock::new(Users {
                by_id: HashMap::new(),
                next_id: 1,
            })),
            iterations,
            decoy: Arc::new(decoy),
        })
    }

    /// Add a user with the next free id.
    pub async fn insert(
        &self,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<Identity, UserStoreError> {
        self.insert_inner(None, username, email, password).await
    }

    /// Add a user under a fixed id.
    pub async fn insert_with_id(
        &self,
        id: UserId,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<Identity, UserStoreError> {
        self.insert_inner(Some(id), username, email, password).await
    }

    async fn insert_inner(
        &self,
        id: Option<UserId>,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<Identity, UserStoreError> {
        let hash = hash_blocking(password.to_string(), self.iterations).await?;

        let mut users = self.users.write().await;
        let id = id.unwrap_or(users.next_id);
        let key = normalize(username);
        let taken = users.by_id.contains_key(&id)
            || users
                .by_id
                .values()
                .any(|u| normalize(&u.identity.username) == key);
        if taken {
            return Err(UserStoreError::Conflict(username.to_string()));
        }

        let mut identity = Identity::new(id, username);
        if let Some(email) = email {
            identity = identity.with_field("email", email);
        }

        users.by_id.insert(
            id,
            StoredUser {
                identity: identity.clone(),
                email: email.map(|e| e.trim().to_lowercase()),
                password: hash,
            },
        );
        users.next_id = users.next_id.max(id + 1);

        tracing::debug!(user_id = id, "user added to in-memory store");
        Ok(identity)
    }

    /// Delete a user. Sessions naming it resolve to anonymous afterwards.
    pub async fn remove(&self, id: UserId) -> Option<Identity> {
        self.users
            .write()
            .await
            .by_id
            .remove(&id)
            .map(|stored| stored.identity)
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_credentials(
        &self,
        credential: &str,
        password: &str,
    ) -> Result<Option<Identity>, UserStoreError> {
        let username_key = normalize(credential);
        let email_key = credential.trim().to_lowercase();

        let candidate = {
            let users = self.users.read().await;
            users
                .by_id
                .values()
                .find(|u| {
                    normalize(&u.identity.username) == username_key
                        || u.email.as_deref() == Some(email_key.as_str())
                })
                .map(|u| (u.identity.clone(), u.password.clone()))
        };

        let (identity, hash) = match candidate {
            Some((identity, hash)) => (Some(identity), hash),
            None => (None, (*self.decoy).clone()),
        };

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || hash.verify(&password))
            .await
            .map_err(|e| UserStoreError::Internal(e.to_string()))?;

        Ok(identity.filter(|_| matches))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>, UserStoreError> {
        Ok(self
            .users
            .read()
            .await
            .by_id
            .get(&id)
            .map(|stored| stored.identity.clone()))
    }
}

async fn hash_blocking(
    password: String,
    iterations: NonZeroU32,
) -> Result<PasswordHash, UserStoreError> {
    tokio::task::spawn_blocking(move || PasswordHash::derive(&password, iterations))
        .await
        .map_err(|e| UserStoreError::Internal(e.to_string()))?
}

/// Usernames compare after NFKC folding and lowercasing.
fn normalize(username: &str) -> String {
    username.trim().nfkc().collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> InMemoryUserStore {
        let store = InMemoryUserStore::with_iterations(1_000).unwrap();
        store
            .insert_with_id(7, "demo", Some("demo@example.com"), "password")
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn finds_user_by_username_and_password() {
        let store = store().await;
        let identity = store
            .find_by_credentials("demo", "password")
            .await
            .unwrap()
            .expect("user");
        assert_eq!(identity.id, 7);
        assert_eq!(identity.username, "demo");
    }

    #[tokio::test]
    async fn finds_user_by_email_case_insensitively() {
        let store = store().await;
        let identity = store
            .find_by_credentials("Demo@Example.com", "password")
            .await
            .unwrap();
        assert_eq!(identity.map(|i| i.id), Some(7));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_both_return_none() {
        let store = store().await;
        assert!(store
            .find_by_credentials("demo", "wrong")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_by_credentials("nobody", "password")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn usernames_are_unique_after_normalisation() {
        let store = store().await;
        let err = store.insert("DEMO", None, "other").await.unwrap_err();
        assert!(matches!(err, UserStoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = store().await;
        let next = store.insert("second", None, "pw").await.unwrap();
        assert_eq!(next.id, 8);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn removed_user_is_no_longer_found() {
        let store = store().await;
        assert!(store.find_by_id(7).await.unwrap().is_some());
        store.remove(7).await;
        assert!(store.find_by_id(7).await.unwrap().is_none());
    }

    #[test]
    fn zero_iterations_are_rejected() {
        assert!(InMemoryUserStore::with_iterations(0).is_err());
    }
}
