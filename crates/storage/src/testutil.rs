//! Shared test utilities for credential store testing.
//!
//! This module provides helpers for generating deterministic test keys and
//! asserting on [`StorageResult`](crate::StorageResult) values. It is
//! feature-gated behind `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! keygate-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use keygate_storage::testutil::{make_public_key, populated_store};
//! ```

use crate::auth::{CredentialStore, MemoryCredentialStore};

/// Create a deterministic opaque public key tagged with a task and sequence number.
///
/// Produces values like `"pk-task3-seq042"`. Stores treat keys as opaque
/// strings, so concurrent tests can tell which writer a stored key came from.
#[must_use]
pub fn make_public_key(task: usize, seq: usize) -> String {
    format!("pk-task{task}-seq{seq:03}")
}

/// Create a deterministic username from an index (`"user-000042"`).
#[must_use]
pub fn make_username(idx: usize) -> String {
    format!("user-{idx:06}")
}

/// Create a [`MemoryCredentialStore`] with `count` users, each holding one key.
///
/// # Panics
///
/// Panics if any registration fails (should not happen in memory).
pub async fn populated_store(count: usize) -> MemoryCredentialStore {
    let store = MemoryCredentialStore::new();
    for i in 0..count {
        store
            .register(&make_username(i), &make_public_key(0, i))
            .await
            .expect("populate register failed");
    }
    store
}

/// Assert that a [`StorageResult`](crate::StorageResult) is a [`StorageError::NotFound`](crate::StorageError::NotFound).
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use keygate_storage::assert_not_found;
/// use keygate_storage::{StorageError, StorageResult};
///
/// let result: StorageResult<String> = Err(StorageError::not_found("missing"));
/// assert_not_found!(result);
/// ```
#[macro_export]
macro_rules! assert_not_found {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::NotFound { .. })),
            "expected StorageError::NotFound, got: {:?}",
            $result,
        );
    };
    ($result:expr, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::StorageError::NotFound { .. })),
            "{}: expected StorageError::NotFound, got: {:?}",
            $msg,
            $result,
        );
    };
}
