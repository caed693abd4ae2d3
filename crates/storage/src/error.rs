//! Storage error types and result alias.
//!
//! This module defines the errors that can occur while registering or looking
//! up credentials. Every [`CredentialStore`](crate::CredentialStore)
//! implementation maps its internal failures onto these variants.
//!
//! # Error Types
//!
//! - [`StorageError::NotFound`] - No public key has been registered for the identity
//! - [`StorageError::Conflict`] - The store was locked by a concurrent writer
//! - [`StorageError::Connection`] - The store could not be opened or reached
//! - [`StorageError::Serialization`] - A stored record could not be decoded
//! - [`StorageError::Internal`] - Backend-specific internal errors
//!
//! # Example
//!
//! ```
//! use keygate_storage::{StorageError, StorageResult};
//!
//! fn lookup(username: &str) -> StorageResult<String> {
//!     Err(StorageError::not_found(username))
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during credential storage operations.
///
/// Errors preserve their source chain via the `#[source]` attribute, enabling
/// debugging tools to display the full error context.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`. Downstream match expressions must
/// include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// No record exists for the requested identity.
    ///
    /// This is a recoverable error; callers decide whether absence is fatal.
    #[error("Key not found: {key}")]
    NotFound {
        /// The identity that was not found.
        key: String,
    },

    /// The store is locked by a concurrent writer.
    ///
    /// The operation did not take effect and may be retried.
    #[error("Transaction conflict")]
    Conflict,

    /// The store could not be opened or reached.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// A stored record could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// Internal storage backend error.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error for the given identity.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict() -> Self {
        Self::Conflict
    }

    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with a message and source error.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Returns `true` when the identity simply has no record.
    ///
    /// Every other variant means the store itself misbehaved.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(StorageError::not_found("admin").to_string(), "Key not found: admin");
        assert_eq!(StorageError::conflict().to_string(), "Transaction conflict");
        assert_eq!(
            StorageError::connection("unable to open database file").to_string(),
            "Connection error: unable to open database file"
        );
        assert_eq!(StorageError::internal("boom").to_string(), "Internal error: boom");
    }

    #[test]
    fn test_source_chain_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs");
        let err = StorageError::connection_with_source("cannot open sqlite.storage", io);

        let source = err.source().expect("source should be preserved");
        assert_eq!(source.to_string(), "read-only fs");
    }

    #[test]
    fn test_constructors_without_source_have_none() {
        assert!(StorageError::serialization("bad timestamp").source().is_none());
        assert!(StorageError::internal("x").source().is_none());
    }

    #[test]
    fn test_is_not_found() {
        assert!(StorageError::not_found("ghost").is_not_found());
        assert!(!StorageError::conflict().is_not_found());
        assert!(!StorageError::internal("x").is_not_found());
    }
}
