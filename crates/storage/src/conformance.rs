//! Conformance test suite for [`CredentialStore`] implementations.
//!
//! Every store, in-memory or durable, runs the same functions to prove it
//! honours the trait contract: upsert semantics, `NotFound` on unknown
//! identities, and atomic last-write-wins under concurrent registration.
//!
//! # Usage
//!
//! Enable the `testutil` feature and call each conformance function with a
//! fresh store:
//!
//! ```no_run
//! use keygate_storage::conformance;
//! use keygate_storage::MemoryCredentialStore;
//!
//! #[tokio::test]
//! async fn lookup_unknown_identity_is_not_found() {
//!     conformance::lookup_unknown_identity_is_not_found(&MemoryCredentialStore::new()).await;
//! }
//! ```
//!
//! # Test Categories
//!
//! | Category | Functions | Contract aspect |
//! |----------|-----------|-----------------|
//! | Lookup | 2 tests | `NotFound` vs `Ok(None)` for unknown identities |
//! | Upsert | 4 tests | Register, overwrite, idempotence, timestamp rules |
//! | Isolation | 1 test | Identities never see each other's keys |
//! | Concurrent | 2 tests | Atomic last-write-wins, consistent reads |

use std::{collections::HashSet, sync::Arc};

use crate::{assert_not_found, auth::CredentialStore, testutil::make_public_key};

// ============================================================================
// Lookup
// ============================================================================

/// `lookup` on an identity that never registered fails with `NotFound`.
pub async fn lookup_unknown_identity_is_not_found<S: CredentialStore>(store: &S) {
    assert_not_found!(store.lookup("ghost").await);
}

/// `get_record` on an identity that never registered returns `Ok(None)`.
pub async fn get_record_unknown_identity_is_none<S: CredentialStore>(store: &S) {
    let record = store.get_record("ghost").await.expect("get_record should not error");
    assert!(record.is_none(), "unknown identity should have no record: {record:?}");
}

// ============================================================================
// Upsert
// ============================================================================

/// `register` then `lookup` returns the registered key.
pub async fn register_then_lookup_returns_key<S: CredentialStore>(store: &S) {
    store.register("admin", "key-a").await.expect("register");
    assert_eq!(store.lookup("admin").await.expect("lookup"), "key-a");
}

/// A second `register` for the same identity replaces the key.
pub async fn register_overwrites_previous_key<S: CredentialStore>(store: &S) {
    store.register("admin", "key-a").await.expect("first register");
    store.register("admin", "key-b").await.expect("second register");
    assert_eq!(store.lookup("admin").await.expect("lookup"), "key-b");
}

/// Registering the same key twice succeeds and leaves it in place.
pub async fn register_is_idempotent<S: CredentialStore>(store: &S) {
    store.register("admin", "key-a").await.expect("first register");
    store.register("admin", "key-a").await.expect("repeat register");
    assert_eq!(store.lookup("admin").await.expect("lookup"), "key-a");
}

/// An overwrite keeps `registered_at` and moves `updated_at` forward.
pub async fn register_preserves_registration_time<S: CredentialStore>(store: &S) {
    store.register("admin", "key-a").await.expect("first register");
    let first = store.get_record("admin").await.expect("get").expect("record exists");

    store.register("admin", "key-b").await.expect("second register");
    let second = store.get_record("admin").await.expect("get").expect("record exists");

    assert_eq!(second.username, "admin");
    assert_eq!(second.registered_at, first.registered_at, "registered_at must not move");
    assert!(second.updated_at >= first.updated_at, "updated_at must not go backwards");
}

// ============================================================================
// Isolation
// ============================================================================

/// Keys are scoped to their identity; names differing only in case are distinct.
pub async fn identities_are_isolated<S: CredentialStore>(store: &S) {
    store.register("alice", "key-alice").await.expect("register alice");
    store.register("Alice", "key-Alice").await.expect("register Alice");
    store.register("bob", "key-bob").await.expect("register bob");

    assert_eq!(store.lookup("alice").await.expect("lookup"), "key-alice");
    assert_eq!(store.lookup("Alice").await.expect("lookup"), "key-Alice");
    assert_eq!(store.lookup("bob").await.expect("lookup"), "key-bob");
    assert_not_found!(store.lookup("carol").await);
}

// ============================================================================
// Concurrent
// ============================================================================

/// Concurrent registrations for one identity leave exactly one complete key
/// that was written by one of the writers.
pub async fn concurrent_register_last_write_wins<S: CredentialStore + 'static>(store: Arc<S>) {
    const WRITERS: usize = 16;
    const ROUNDS: usize = 10;

    let mut handles = Vec::new();
    for task in 0..WRITERS {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for seq in 0..ROUNDS {
                store.register("admin", &make_public_key(task, seq)).await.expect("register");
            }
        }));
    }
    for handle in handles {
        handle.await.expect("task join");
    }

    let written: HashSet<String> =
        (0..WRITERS).flat_map(|t| (0..ROUNDS).map(move |s| make_public_key(t, s))).collect();
    let stored = store.lookup("admin").await.expect("lookup after concurrent writes");
    assert!(written.contains(&stored), "stored key must be one that was written, got {stored}");
}

/// Readers racing a writer only ever observe complete, previously written keys.
pub async fn concurrent_reads_observe_committed_keys<S: CredentialStore + 'static>(
    store: Arc<S>,
) {
    store.register("admin", &make_public_key(0, 0)).await.expect("seed register");

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for seq in 1..50 {
                store.register("admin", &make_public_key(0, seq)).await.expect("register");
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        readers.push(tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..50 {
                seen.push(store.lookup("admin").await.expect("lookup"));
            }
            seen
        }));
    }

    writer.await.expect("writer join");
    let committed: HashSet<String> = (0..50).map(|seq| make_public_key(0, seq)).collect();
    for reader in readers {
        for key in reader.await.expect("reader join") {
            assert!(committed.contains(&key), "reader observed a key never written: {key}");
        }
    }
}
