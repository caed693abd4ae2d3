//! Session token lifecycle: login, verification, refresh and logout.
//!
//! Session tokens are compact HS256 JWTs signed with the process-wide secret
//! from [`SessionConfig`]:
//!
//! ```json
//! { "id": "admin", "iat": 1700000000, "exp": 1700003600, "orig_iat": 1700000000 }
//! ```
//!
//! `orig_iat` is the issue time of the first token in a refresh lineage; it
//! bounds how long the lineage may be extended.
//!
//! # State Machine
//!
//! ```text
//!            login                      now > exp
//!   ────────────────────► Valid ─────────────────────► Expired
//!                           ▲                             │
//!                           │   refresh while             │
//!                           │   now <= orig_iat + max     │
//!                           └─────────────────────────────┘
//! ```
//!
//! The server keeps no session table, so logout cannot revoke a token that
//! is still valid.

use std::{fmt, sync::Arc};

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode};
use keygate_storage::CredentialStore;
use serde::{Deserialize, Serialize};

use crate::{
    clock::{Clock, SystemClock},
    config::SessionConfig,
    credentials::CredentialVerifier,
    error::{AuthError, ConfigError, Result},
    signature::decode_public_key,
    validation::{SESSION_ALGORITHM, validate_algorithm},
};

/// Claims carried by a session token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Identity claim (the username).
    pub id: String,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiration time (seconds since epoch).
    pub exp: i64,
    /// Issue time of the first token in this refresh lineage.
    pub orig_iat: i64,
}

/// A freshly minted session token and its validity bounds.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// The encoded token.
    pub token: String,
    /// When this token was issued.
    pub issued_at: DateTime<Utc>,
    /// When this token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues and checks session tokens.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use keygate_authn::{FixedAccountVerifier, SessionConfig, SessionIssuer};
/// use keygate_storage::MemoryCredentialStore;
///
/// # async fn example(public_key: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let config = SessionConfig::builder().secret("31337").build()?;
/// let issuer = SessionIssuer::new(
///     Arc::new(config),
///     Arc::new(FixedAccountVerifier::reference()),
///     Arc::new(MemoryCredentialStore::new()),
/// )?;
///
/// let issued = issuer.authenticate("admin", "admin", public_key).await?;
/// assert_eq!(issuer.verify(&issued.token)?, "admin");
/// # Ok(())
/// # }
/// ```
pub struct SessionIssuer {
    config: Arc<SessionConfig>,
    verifier: Arc<dyn CredentialVerifier>,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl SessionIssuer {
    /// Creates an issuer reading the wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails [`SessionConfig::validate`].
    pub fn new(
        config: Arc<SessionConfig>,
        verifier: Arc<dyn CredentialVerifier>,
        store: Arc<dyn CredentialStore>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let encoding_key = EncodingKey::from_secret(config.secret());
        let decoding_key = DecodingKey::from_secret(config.secret());

        Ok(Self {
            config,
            verifier,
            store,
            clock: Arc::new(SystemClock),
            encoding_key,
            decoding_key,
        })
    }

    /// Replaces the clock used for issuance and expiry checks.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configuration this issuer was built with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Checks credentials, binds `public_key` to the identity and issues a token.
    ///
    /// The key is decoded before anything is stored, so a malformed key never
    /// replaces a working one.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] if a field is empty or `public_key` is not an Ed25519 key
    /// - [`AuthError::AuthenticationFailed`] if the credentials are wrong
    /// - [`AuthError::StorageUnavailable`] if the key cannot be stored
    #[tracing::instrument(skip(self, password, public_key))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        public_key: &str,
    ) -> Result<IssuedToken> {
        if username.is_empty() || password.is_empty() || public_key.is_empty() {
            return Err(AuthError::validation("missing Username, Password or Public Key"));
        }
        decode_public_key(public_key).map_err(|e| {
            tracing::debug!(error = %e, "rejecting undecodable public key");
            AuthError::validation("Public Key is not a valid Ed25519 public key")
        })?;

        let identity = self.verifier.verify(username, password).await?;
        self.store.register(&identity.username, public_key).await?;

        let now = self.clock.now().timestamp();
        let issued = self.mint(&identity.username, now, now)?;
        tracing::debug!(identity = %identity.username, "session issued");
        Ok(issued)
    }

    /// Verifies a session token and returns its identity claim.
    ///
    /// A token is valid up to and including its expiry second.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenExpired`] if the current time is past `exp`
    /// - [`AuthError::TokenInvalid`] if the token is malformed, names an algorithm other than
    ///   [`SESSION_ALGORITHM`] or was not signed with this secret
    pub fn verify(&self, token: &str) -> Result<String> {
        let claims = self.decode_claims(token)?;
        if self.clock.now().timestamp() > claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims.id)
    }

    /// Exchanges a token for a new one with a later expiry.
    ///
    /// The presented token may itself have expired; only the lineage's
    /// refresh window matters. The new token keeps the original `orig_iat`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::RefreshWindowExpired`] if the window has closed
    /// - any integrity error from [`verify`](Self::verify) except expiry
    #[tracing::instrument(skip(self, token))]
    pub fn refresh(&self, token: &str) -> Result<IssuedToken> {
        let claims = self.decode_claims(token)?;
        let now = self.clock.now().timestamp();
        let window = i64::try_from(self.config.max_refresh().as_secs()).unwrap_or(i64::MAX);

        if now < claims.orig_iat || now > claims.orig_iat.saturating_add(window) {
            tracing::debug!(identity = %claims.id, "refresh window closed");
            return Err(AuthError::RefreshWindowExpired);
        }

        let issued = self.mint(&claims.id, now, claims.orig_iat)?;
        tracing::debug!(identity = %claims.id, "session refreshed");
        Ok(issued)
    }

    /// Acknowledges a logout.
    ///
    /// Tokens are not tracked server-side; the client is expected to discard
    /// its copy and a still-valid token keeps working until it expires.
    pub fn logout(&self, token: Option<&str>) {
        match token.map(|t| self.verify(t)) {
            Some(Ok(identity)) => tracing::debug!(%identity, "logout acknowledged"),
            _ => tracing::debug!("logout acknowledged for anonymous caller"),
        }
    }

    fn mint(&self, identity: &str, now: i64, orig_iat: i64) -> Result<IssuedToken> {
        let timeout = i64::try_from(self.config.timeout().as_secs()).unwrap_or(i64::MAX);
        let claims = SessionClaims {
            id: identity.to_owned(),
            iat: now,
            exp: now.saturating_add(timeout),
            orig_iat,
        };

        let token = encode(&Header::new(SESSION_ALGORITHM), &claims, &self.encoding_key)?;

        Ok(IssuedToken {
            token,
            issued_at: timestamp(claims.iat)?,
            expires_at: timestamp(claims.exp)?,
        })
    }

    /// Checks integrity and algorithm but not expiry.
    fn decode_claims(&self, token: &str) -> Result<SessionClaims> {
        let header = decode_header(token)?;
        validate_algorithm(&format!("{:?}", header.alg))?;

        let mut validation = Validation::new(SESSION_ALGORITHM);
        // Expiry is checked against the injected clock by the callers.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| AuthError::token_invalid("timestamp out of range"))
}
