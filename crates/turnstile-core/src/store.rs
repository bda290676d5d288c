//! Credential stores.
//!
//! The login flow asks for the record matching a username and password
//! pair. [`JsonFileStore`] reads
//! a JSON array of user records from disk on every lookup, so edits to the
//! file take effect without a restart. [`MemoryStore`] backs tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::identity::Identity;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the first record whose username and password both match
    /// exactly, `Ok(None)` if there is none, or an error if the store itself
    /// cannot be read. Records sharing a username are each tried in order.
    async fn find(&self, username: &str, password: &str) -> Result<Option<Identity>, StoreError>;
}

/// A `users.json` style file: `[{"Username", "Password", "Name", "Code"}, ...]`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<Identity>, StoreError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StoreError::NotFound(self.path.clone()),
                _ => StoreError::Io(e),
            })?;

        let users: Vec<Identity> =
            serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        if users.is_empty() {
            return Err(StoreError::Empty(self.path.clone()));
        }
        Ok(users)
    }
}

#[async_trait]
impl CredentialStore for JsonFileStore {
    async fn find(&self, username: &str, password: &str) -> Result<Option<Identity>, StoreError> {
        let users = self.load().await?;
        Ok(users.into_iter().find(|u| u.matches(username, password)))
    }
}

/// An in-memory store. An empty store is reported as [`StoreError::Empty`],
/// the same as an empty file.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: Vec<Identity>,
}

impl MemoryStore {
    pub fn new(users: Vec<Identity>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find(&self, username: &str, password: &str) -> Result<Option<Identity>, StoreError> {
        if self.users.is_empty() {
            return Err(StoreError::Empty(PathBuf::from("<memory>")));
        }
        Ok(self
            .users
            .iter()
            .find(|u| u.matches(username, password))
            .cloned())
    }
}
