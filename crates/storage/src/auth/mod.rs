//! Public key registration and lookup.
//!
//! This module contains the record type and storage trait for the public keys
//! callers bind to their identity at login. The session layer writes keys
//! (one per identity, overwritten on every login); the request signature
//! verifier reads them back to check per-request signatures.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐       ┌──────────────┐       ┌───────────────┐
//! │SessionIssuer │       │ Credential   │       │   Signature   │
//! │              │──────►│   Store      │◄──────│   Verifier    │
//! │  register    │       │ (one key per │       │    lookup     │
//! └──────────────┘       │   username)  │       └───────────────┘
//!                        └──────────────┘
//! ```
//!
//! # Storage Trait
//!
//! The [`CredentialStore`](crate::auth::CredentialStore) trait provides the
//! interface. Use [`MemoryCredentialStore`](crate::auth::MemoryCredentialStore)
//! for testing and [`SqliteCredentialStore`](crate::auth::SqliteCredentialStore)
//! for a durable deployment.
//!
//! # Examples
//!
//! ```no_run
//! use keygate_storage::auth::{CredentialStore, MemoryCredentialStore};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = MemoryCredentialStore::new();
//!
//! store.register("admin", "MCowBQYDK2VwAyEA...").await.unwrap();
//! store.register("admin", "MCowBQYDK2VwAyEB...").await.unwrap();
//!
//! let key = store.lookup("admin").await.unwrap();
//! assert_eq!(key, "MCowBQYDK2VwAyEB...");
//! # });
//! ```

mod public_key;
mod sqlite;
mod store;

pub use public_key::PublicKeyRecord;
pub use sqlite::SqliteCredentialStore;
pub use store::{CredentialStore, MemoryCredentialStore};
