//! Authentication error types.
//!
//! This module defines errors that can occur while logging in, validating
//! session tokens, verifying request signatures and applying the
//! authorization policy.

use keygate_storage::StorageError;
use thiserror::Error;

/// Authentication and authorization errors.
///
/// Messages are deliberately short. They end up in HTTP responses, so they
/// never carry token contents, signatures or key material.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`. Downstream match expressions must
/// include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Username or password did not match a known account.
    #[error("incorrect Username or Password")]
    AuthenticationFailed,

    /// A required login field is missing or unusable.
    #[error("{message}")]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// The session token is past its expiry.
    #[error("Token is expired")]
    TokenExpired,

    /// The session token failed its integrity check or could not be decoded.
    #[error("Token is invalid: {message}")]
    TokenInvalid {
        /// Why the token was rejected.
        message: String,
    },

    /// The token's refresh lineage is older than the refresh window allows.
    #[error("Token is expired")]
    RefreshWindowExpired,

    /// No public key is registered for the identity.
    #[error("No public key registered for {identity}")]
    UnknownIdentity {
        /// Identity whose key was looked up.
        identity: String,
    },

    /// A signature-related header or encoded value could not be parsed.
    #[error("Malformed request: {message}")]
    MalformedInput {
        /// Which input was malformed.
        message: String,
    },

    /// The request signature does not match the registered public key.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// The authorization policy denied the action.
    #[error("You don't have permission to access")]
    Forbidden {
        /// Identity that was denied.
        identity: String,
    },

    /// The credential store failed while serving the request.
    ///
    /// Wraps the original [`StorageError`] to preserve the full error source
    /// chain for debugging and structured logging.
    #[error("Credential store unavailable")]
    StorageUnavailable(
        /// The underlying storage error.
        #[source]
        StorageError,
    ),
}

impl AuthError {
    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Creates a new `TokenInvalid` error.
    #[must_use]
    pub fn token_invalid(message: impl Into<String>) -> Self {
        Self::TokenInvalid { message: message.into() }
    }

    /// Creates a new `UnknownIdentity` error.
    #[must_use]
    pub fn unknown_identity(identity: impl Into<String>) -> Self {
        Self::UnknownIdentity { identity: identity.into() }
    }

    /// Creates a new `MalformedInput` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput { message: message.into() }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(identity: impl Into<String>) -> Self {
        Self::Forbidden { identity: identity.into() }
    }

    /// Returns `true` for failures of the session credential itself
    /// (login, token and refresh errors).
    #[must_use]
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed
                | Self::Validation { .. }
                | Self::TokenExpired
                | Self::TokenInvalid { .. }
                | Self::RefreshWindowExpired
        )
    }

    /// Returns `true` for failures of the per-request signature or the
    /// authorization policy.
    #[must_use]
    pub fn is_request_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnknownIdentity { .. }
                | Self::MalformedInput { .. }
                | Self::SignatureInvalid
                | Self::Forbidden { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature => AuthError::token_invalid("signature mismatch"),
            ErrorKind::InvalidAlgorithm => {
                AuthError::token_invalid("algorithm does not match session tokens")
            },
            ErrorKind::InvalidToken => AuthError::token_invalid("malformed token"),
            ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::token_invalid(format!("missing claim {claim}"))
            },
            _ => AuthError::token_invalid(format!("{err}")),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::StorageUnavailable(err)
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised when building a [`SessionConfig`](crate::SessionConfig).
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required field was empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A value is smaller than the allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// Smallest accepted value.
        min: String,
        /// Value that was supplied.
        value: String,
    },
}
