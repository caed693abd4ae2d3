//! Credential storage for Keygate.
//!
//! This crate provides the [`CredentialStore`] trait and the types that back
//! the gateway's only durable state: the mapping from a username to the
//! public key that user registered at their most recent login.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    keygate-server                           │
//! │            (login, refresh, protected routes)               │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    keygate-authn                            │
//! │  SessionIssuer (register) │ RequestSignatureVerifier (lookup)│
//! ├─────────────────────────────────────────────────────────────┤
//! │                   keygate-storage                           │
//! │              CredentialStore trait                          │
//! │           (register, lookup, get_record)                    │
//! ├──────────────────────┬──────────────────────────────────────┤
//! │ MemoryCredentialStore│        SqliteCredentialStore         │
//! │      (testing)       │           (production)               │
//! └──────────────────────┴──────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use keygate_storage::{CredentialStore, MemoryCredentialStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryCredentialStore::new();
//!
//!     store.register("admin", "MCowBQYDK2VwAyEA...").await?;
//!     let key = store.lookup("admin").await?;
//!     assert_eq!(key, "MCowBQYDK2VwAyEA...");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`]. Implementations map their
//! internal failures onto [`StorageError`] so callers can tell a missing
//! identity ([`StorageError::NotFound`]) apart from an unavailable store.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` and `conformance` modules with shared test helpers and
//!   the store conformance suite. Enable this in `[dev-dependencies]` for integration tests.

#![deny(unsafe_code)]

pub mod auth;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod conformance;
pub mod error;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use auth::{CredentialStore, MemoryCredentialStore, PublicKeyRecord, SqliteCredentialStore};
pub use error::{BoxError, StorageError, StorageResult};
pub use types::Identity;
