//! Persisted client session.
//!
//! A session is three logically inseparable keys: `user` (User JSON),
//! `authToken` and `role` (a mirror of `user.role`). Loading is
//! schema-validated; anything short of a complete, consistent record is
//! treated as corrupt, wiped, and reported as "no session".

mod storage;

pub use storage::{FileStorage, KeyValueStore, MemoryStorage, StorageError};

use std::sync::Arc;
use thiserror::Error;

use crate::db::{Role, User};

pub const USER_KEY: &str = "user";
pub const TOKEN_KEY: &str = "authToken";
pub const ROLE_KEY: &str = "role";

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("persisted session is corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to serialize user: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Persist a freshly authenticated user and token.
    pub fn save(&self, user: &User, token: &str) -> Result<(), SessionError> {
        let user_json = serde_json::to_string(user)?;
        self.storage.set(USER_KEY, &user_json)?;
        self.storage.set(TOKEN_KEY, token)?;
        self.storage.set(ROLE_KEY, user.role.as_str())?;
        Ok(())
    }

    /// Read and validate the persisted record without side effects.
    pub fn parse(&self) -> Result<Option<Session>, SessionError> {
        let user = self.storage.get(USER_KEY)?;
        let token = self.storage.get(TOKEN_KEY)?;
        let role = self.storage.get(ROLE_KEY)?;

        let (user, token, role) = match (user, token, role) {
            (None, None, None) => return Ok(None),
            (Some(user), Some(token), Some(role)) => (user, token, role),
            _ => return Err(SessionError::Corrupt("incomplete session record".to_string())),
        };

        let user: User = serde_json::from_str(&user)
            .map_err(|e| SessionError::Corrupt(format!("invalid user record: {}", e)))?;
        let role: Role = role.parse().map_err(SessionError::Corrupt)?;

        if token.trim().is_empty() {
            return Err(SessionError::Corrupt("empty auth token".to_string()));
        }
        if role != user.role {
            return Err(SessionError::Corrupt(format!(
                "role mirror '{}' disagrees with user role '{}'",
                role, user.role
            )));
        }

        Ok(Some(Session { user, token, role }))
    }

    /// Load the session, wiping all keys if the record is not fully valid.
    pub fn load(&self) -> Option<Session> {
        match self.parse() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding persisted session");
                if let Err(e) = self.clear() {
                    tracing::warn!(error = %e, "Failed to clear persisted session");
                }
                None
            }
        }
    }

    /// Remove all session keys. Idempotent.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.storage.remove(USER_KEY)?;
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(ROLE_KEY)?;
        Ok(())
    }

    /// The raw bearer token, read the way a request interceptor would.
    pub fn token(&self) -> Option<String> {
        self.storage
            .get(TOKEN_KEY)
            .ok()
            .flatten()
            .filter(|t| !t.trim().is_empty())
    }

    /// The persisted role mirror, without deserializing the user.
    pub fn role(&self) -> Option<Role> {
        self.storage.get(ROLE_KEY).ok().flatten()?.parse().ok()
    }
}
