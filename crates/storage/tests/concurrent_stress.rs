//! Concurrent access stress tests for the credential stores.
//!
//! Many simultaneous logins for the same identity must leave exactly one
//! complete key behind, and logins for distinct identities must never lose
//! each other's writes.

#![allow(clippy::expect_used, clippy::panic)]

use std::{collections::HashSet, sync::Arc};

use keygate_storage::{
    CredentialStore, MemoryCredentialStore, SqliteCredentialStore,
    testutil::{make_public_key, make_username},
};
use tokio::task::JoinSet;

/// Number of concurrent tasks for most tests.
const CONCURRENCY: usize = 16;

/// Number of identities each task registers in the distinct-identity test.
const USERS_PER_TASK: usize = 25;

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

async fn same_identity_leaves_one_complete_key<S: CredentialStore + 'static>(store: Arc<S>) {
    let mut set = JoinSet::new();
    for task in 0..CONCURRENCY {
        let store = Arc::clone(&store);
        set.spawn(async move {
            store.register("admin", &make_public_key(task, 0)).await.expect("register");
        });
    }
    while let Some(joined) = set.join_next().await {
        joined.expect("task panicked");
    }

    let candidates: HashSet<String> = (0..CONCURRENCY).map(|t| make_public_key(t, 0)).collect();
    let stored = store.lookup("admin").await.expect("lookup");
    assert!(candidates.contains(&stored), "torn or foreign key stored: {stored}");

    let record = store.get_record("admin").await.expect("get").expect("record");
    assert_eq!(record.public_key, stored);
}

async fn distinct_identities_lose_no_writes<S: CredentialStore + 'static>(store: Arc<S>) {
    let mut set = JoinSet::new();
    for task in 0..CONCURRENCY {
        let store = Arc::clone(&store);
        set.spawn(async move {
            for i in 0..USERS_PER_TASK {
                let user = make_username(task * USERS_PER_TASK + i);
                store.register(&user, &make_public_key(task, i)).await.expect("register");
            }
        });
    }
    while let Some(joined) = set.join_next().await {
        joined.expect("task panicked");
    }

    for task in 0..CONCURRENCY {
        for i in 0..USERS_PER_TASK {
            let user = make_username(task * USERS_PER_TASK + i);
            let key = store.lookup(&user).await.expect("lookup");
            assert_eq!(key, make_public_key(task, i), "lost write for {user}");
        }
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn memory_concurrent_logins_same_identity() {
    same_identity_leaves_one_complete_key(Arc::new(MemoryCredentialStore::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn memory_concurrent_logins_distinct_identities() {
    let store = Arc::new(MemoryCredentialStore::new());
    distinct_identities_lose_no_writes(Arc::clone(&store)).await;
    assert_eq!(store.len(), CONCURRENCY * USERS_PER_TASK);
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn sqlite_concurrent_logins_same_identity() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteCredentialStore::open(dir.path().join("sqlite.storage")).expect("open");
    same_identity_leaves_one_complete_key(Arc::new(store)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn sqlite_concurrent_logins_distinct_identities() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteCredentialStore::open(dir.path().join("sqlite.storage")).expect("open");
    distinct_identities_lose_no_writes(Arc::new(store)).await;
}
