//! Storage trait for registered public keys.
//!
//! This module provides the [`CredentialStore`] trait that abstracts
//! persistence of the identity → public key mapping. Implementations can use
//! different backends (SQLite for production, in-memory for testing).
//!
//! # Record Lifecycle
//!
//! ```text
//! ┌─────────────┐   login    ┌─────────────┐
//! │   Absent    │───────────►│ Registered  │◄──┐
//! │ (NotFound)  │            │  (one key)  │   │ later login
//! └─────────────┘            └──────┬──────┘   │ (key replaced)
//!                                   └──────────┘
//! ```
//!
//! Records are never deleted by the gateway.
//!
//! # Usage
//!
//! ```no_run
//! use keygate_storage::auth::CredentialStore;
//! use keygate_storage::StorageError;
//!
//! async fn bind_key<S: CredentialStore>(
//!     store: &S,
//!     username: &str,
//!     public_key: &str,
//! ) -> Result<(), StorageError> {
//!     store.register(username, public_key).await
//! }
//! ```

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::{
    auth::PublicKeyRecord,
    error::{StorageError, StorageResult},
};

/// Persistence layer for the identity → public key mapping.
///
/// # Consistency
///
/// - [`register`](Self::register) is an atomic upsert. Concurrent registrations for the same
///   identity are serialized; the last one to commit wins and no reader ever observes a
///   partially written key.
/// - [`lookup`](Self::lookup) observes only committed records.
///
/// # Error Handling
///
/// Operations return [`StorageResult`]. An identity that never registered is
/// reported as [`StorageError::NotFound`] by [`lookup`](Self::lookup) and as
/// `Ok(None)` by [`get_record`](Self::get_record).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Binds `public_key` to `username`, replacing any key registered before.
    ///
    /// Registering the same key twice is a no-op apart from `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write conflicts
    /// with a concurrent writer that holds the store lock.
    async fn register(&self, username: &str, public_key: &str) -> StorageResult<()>;

    /// Retrieves the full record for `username`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))` if a key is registered
    /// - `Ok(None)` if the identity never registered
    /// - `Err(...)` on storage errors
    async fn get_record(&self, username: &str) -> StorageResult<Option<PublicKeyRecord>>;

    /// Returns the public key currently registered for `username`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the identity never registered,
    /// or any error from [`get_record`](Self::get_record).
    async fn lookup(&self, username: &str) -> StorageResult<String> {
        self.get_record(username)
            .await?
            .map(|record| record.public_key)
            .ok_or_else(|| StorageError::not_found(username))
    }
}

#[async_trait]
impl<S: CredentialStore + ?Sized> CredentialStore for Arc<S> {
    async fn register(&self, username: &str, public_key: &str) -> StorageResult<()> {
        (**self).register(username, public_key).await
    }

    async fn get_record(&self, username: &str) -> StorageResult<Option<PublicKeyRecord>> {
        (**self).get_record(username).await
    }

    async fn lookup(&self, username: &str) -> StorageResult<String> {
        (**self).lookup(username).await
    }
}

/// In-memory implementation of [`CredentialStore`] for testing.
///
/// Stores records in a thread-safe hash map. Nothing survives a restart.
///
/// # Thread Safety
///
/// Uses [`parking_lot::RwLock`]: the whole read-modify-write of an upsert runs
/// under the write lock, so concurrent registrations never interleave.
///
/// # Examples
///
/// ```
/// use keygate_storage::{CredentialStore, MemoryCredentialStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryCredentialStore::new();
///
///     store.register("admin", "MCowBQYDK2VwAyEA...").await?;
///
///     let record = store.get_record("admin").await?;
///     assert!(record.is_some());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryCredentialStore {
    /// Records indexed by username.
    records: Arc<RwLock<HashMap<String, PublicKeyRecord>>>,
}

impl MemoryCredentialStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities with a registered key.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if no identity has registered a key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    #[tracing::instrument(skip(self, public_key))]
    async fn register(&self, username: &str, public_key: &str) -> StorageResult<()> {
        let now = Utc::now();
        let mut records = self.records.write();

        let record = match records.get(username) {
            Some(existing) => existing.replaced(public_key, now),
            None => PublicKeyRecord::registered_at(username, public_key, now),
        };
        records.insert(username.to_owned(), record);

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_record(&self, username: &str) -> StorageResult<Option<PublicKeyRecord>> {
        let records = self.records.read();
        Ok(records.get(username).cloned())
    }
}
