//! # Keygate Authentication
//!
//! Dual-factor request authentication: a session token proves who the caller
//! logged in as, and a per-request Ed25519 signature proves the request came
//! from the holder of the key registered at that login.
//!
//! This crate provides:
//! - **Session tokens**: login, verification, refresh and logout ([`SessionIssuer`])
//! - **Credential checks**: fixed-account and password-directory verifiers
//! - **Request signatures**: canonical string and verification ([`RequestSignatureVerifier`])
//! - **Authorization**: pluggable [`AuthorizationPolicy`]
//! - **Algorithm validation**: session tokens accept HS256 only
//!
//! ## Pipeline
//!
//! ```text
//! bearer token ──► SessionIssuer::verify ──► identity
//!                                              │
//! X-Signature ──► RequestSignatureVerifier ◄───┤ (CredentialStore lookup)
//!                                              │
//!                 AuthorizationPolicy ◄────────┘
//!                          │
//!                  protected operation
//! ```
//!
//! Each stage short-circuits with an [`AuthError`]; later stages never run
//! after a failure.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use keygate_authn::{
//!     Action, AuthorizationPolicy, FixedAccountVerifier, RequestSignatureVerifier,
//!     SessionConfig, SessionIssuer, SignedRequest, SingleIdentityPolicy,
//! };
//! use keygate_storage::{CredentialStore, MemoryCredentialStore};
//!
//! # async fn example(
//! #     token: &str,
//! #     request: SignedRequest,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
//! let config = Arc::new(SessionConfig::builder().secret("31337").build()?);
//! let issuer =
//!     SessionIssuer::new(config, Arc::new(FixedAccountVerifier::reference()), store.clone())?;
//! let signatures = RequestSignatureVerifier::new(store);
//! let policy = SingleIdentityPolicy::reference();
//!
//! let identity = issuer.verify(token)?;
//! signatures.verify(&identity, &request).await?;
//! policy.enforce(&identity, &Action::new(request.method(), "/user"))?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Time source.
pub mod clock;
/// Session configuration.
pub mod config;
/// Username/password verification.
pub mod credentials;
/// Authentication error types.
pub mod error;
/// Authorization policy.
pub mod policy;
/// Session token lifecycle.
pub mod session;
/// Request signature verification.
pub mod signature;
/// Shared test utilities.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
/// Algorithm validation.
pub mod validation;

// Re-export key types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use credentials::{
    CredentialVerifier, DelegatedVerifier, DirectoryEntry, FixedAccountVerifier,
    InMemoryPasswordDirectory, PasswordDirectory,
};
pub use error::{AuthError, ConfigError, Result};
pub use policy::{Action, AuthorizationPolicy, SingleIdentityPolicy};
pub use session::{IssuedToken, SessionClaims, SessionIssuer};
pub use signature::{RequestSignatureVerifier, SignedRequest};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
