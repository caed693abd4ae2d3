//! Shared state injected into handlers and middleware.

use std::sync::Arc;

use keygate_authn::{
    AuthorizationPolicy, Clock, ConfigError, CredentialVerifier, FixedAccountVerifier,
    RequestSignatureVerifier, SessionConfig, SessionIssuer, SingleIdentityPolicy,
};
use keygate_storage::CredentialStore;

/// Components of the authentication pipeline, built once at startup.
///
/// Cloning is cheap; every component sits behind an [`Arc`].
#[derive(Clone)]
pub struct AppState {
    issuer: Arc<SessionIssuer>,
    signatures: Arc<RequestSignatureVerifier>,
    policy: Arc<dyn AuthorizationPolicy>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").field("issuer", &self.issuer).finish_non_exhaustive()
    }
}

#[bon::bon]
impl AppState {
    /// Wires the pipeline around one credential store.
    ///
    /// # Arguments
    ///
    /// * `config` - Session settings shared read-only by the issuer.
    /// * `store` - Backs both key registration at login and signature lookup.
    /// * `verifier` - Username/password check (default: the `admin` account).
    /// * `policy` - Authorization policy (default: only `admin` is allowed).
    /// * `clock` - Time source for token expiry (default: the system clock).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` is invalid.
    #[builder]
    pub fn new(
        config: Arc<SessionConfig>,
        store: Arc<dyn CredentialStore>,
        verifier: Option<Arc<dyn CredentialVerifier>>,
        policy: Option<Arc<dyn AuthorizationPolicy>>,
        clock: Option<Arc<dyn Clock>>,
    ) -> Result<Self, ConfigError> {
        let verifier: Arc<dyn CredentialVerifier> = match verifier {
            Some(verifier) => verifier,
            None => Arc::new(FixedAccountVerifier::reference()),
        };
        let policy: Arc<dyn AuthorizationPolicy> = match policy {
            Some(policy) => policy,
            None => Arc::new(SingleIdentityPolicy::reference()),
        };

        let mut issuer = SessionIssuer::new(config, verifier, Arc::clone(&store))?;
        if let Some(clock) = clock {
            issuer = issuer.with_clock(clock);
        }

        Ok(Self {
            issuer: Arc::new(issuer),
            signatures: Arc::new(RequestSignatureVerifier::new(store)),
            policy,
        })
    }

    /// Returns the session token issuer.
    #[must_use]
    pub fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    /// Returns the request signature verifier.
    #[must_use]
    pub fn signatures(&self) -> &RequestSignatureVerifier {
        &self.signatures
    }

    /// Returns the authorization policy.
    #[must_use]
    pub fn policy(&self) -> &dyn AuthorizationPolicy {
        self.policy.as_ref()
    }
}
