//! Username/password checks performed at login.
//!
//! The check is an injected [`CredentialVerifier`]. Two implementations are
//! provided:
//!
//! - [`FixedAccountVerifier`]: one configured account, compared in constant time.
//! - [`DelegatedVerifier`]: accounts held by a [`PasswordDirectory`] as Argon2id PHC hashes.

use std::{collections::HashMap, sync::Arc};

use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use async_trait::async_trait;
use keygate_storage::Identity;
use parking_lot::RwLock;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{AuthError, Result};

/// Checks a username/password pair and returns the account it belongs to.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verifies the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthenticationFailed`] when the pair does not
    /// match an account. Unknown usernames and wrong passwords are
    /// indistinguishable to the caller.
    async fn verify(&self, username: &str, password: &str) -> Result<Identity>;
}

#[async_trait]
impl<V: CredentialVerifier + ?Sized> CredentialVerifier for Arc<V> {
    async fn verify(&self, username: &str, password: &str) -> Result<Identity> {
        (**self).verify(username, password).await
    }
}

/// A single hardcoded account.
pub struct FixedAccountVerifier {
    identity: Identity,
    password: Zeroizing<String>,
}

impl FixedAccountVerifier {
    /// Creates a verifier accepting only `identity` with `password`.
    #[must_use]
    pub fn new(identity: Identity, password: impl Into<String>) -> Self {
        Self { identity, password: Zeroizing::new(password.into()) }
    }

    /// The stock `admin` / `admin` account.
    #[must_use]
    pub fn reference() -> Self {
        let identity = Identity::builder()
            .username("admin")
            .first_name("Eugene")
            .last_name("Belford")
            .build();
        Self::new(identity, "admin")
    }

    /// Returns the account this verifier accepts.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl std::fmt::Debug for FixedAccountVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedAccountVerifier")
            .field("username", &self.identity.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialVerifier for FixedAccountVerifier {
    async fn verify(&self, username: &str, password: &str) -> Result<Identity> {
        let user_ok = username.as_bytes().ct_eq(self.identity.username.as_bytes());
        let pass_ok = password.as_bytes().ct_eq(self.password.as_bytes());

        if bool::from(user_ok & pass_ok) {
            Ok(self.identity.clone())
        } else {
            Err(AuthError::AuthenticationFailed)
        }
    }
}

/// Account held by a [`PasswordDirectory`].
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// The account's identity and profile.
    pub identity: Identity,
    /// Argon2id hash in PHC string format.
    pub password_hash: String,
}

/// Source of accounts for [`DelegatedVerifier`].
#[async_trait]
pub trait PasswordDirectory: Send + Sync {
    /// Returns the account registered under `username`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory itself is unavailable.
    async fn find(&self, username: &str) -> Result<Option<DirectoryEntry>>;
}

/// In-memory [`PasswordDirectory`].
#[derive(Debug, Default, Clone)]
pub struct InMemoryPasswordDirectory {
    entries: Arc<RwLock<HashMap<String, DirectoryEntry>>>,
}

impl InMemoryPasswordDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) an account, hashing `password` with Argon2id.
    ///
    /// # Errors
    ///
    /// Returns the hashing error if Argon2 rejects the input.
    pub fn insert(&self, identity: Identity, password: &str) -> password_hash::Result<()> {
        let password_hash = hash_password(password)?;
        self.insert_hash(identity, password_hash);
        Ok(())
    }

    /// Adds (or replaces) an account with an existing PHC hash.
    pub fn insert_hash(&self, identity: Identity, password_hash: impl Into<String>) {
        let entry = DirectoryEntry { identity, password_hash: password_hash.into() };
        self.entries.write().insert(entry.identity.username.clone(), entry);
    }
}

#[async_trait]
impl PasswordDirectory for InMemoryPasswordDirectory {
    async fn find(&self, username: &str) -> Result<Option<DirectoryEntry>> {
        Ok(self.entries.read().get(username).cloned())
    }
}

/// Verifies passwords against hashes held by a [`PasswordDirectory`].
///
/// Argon2 is deliberately slow, so the comparison runs on the blocking pool.
#[derive(Clone)]
pub struct DelegatedVerifier {
    directory: Arc<dyn PasswordDirectory>,
}

impl DelegatedVerifier {
    /// Creates a verifier backed by `directory`.
    #[must_use]
    pub fn new(directory: Arc<dyn PasswordDirectory>) -> Self {
        Self { directory }
    }
}

impl std::fmt::Debug for DelegatedVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatedVerifier").finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialVerifier for DelegatedVerifier {
    #[tracing::instrument(skip(self, password))]
    async fn verify(&self, username: &str, password: &str) -> Result<Identity> {
        let Some(entry) = self.directory.find(username).await? else {
            return Err(AuthError::AuthenticationFailed);
        };

        let password = Zeroizing::new(password.to_owned());
        let hash = entry.password_hash.clone();
        let matched = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "password verification task failed");
                AuthError::AuthenticationFailed
            })?;

        if matched {
            Ok(entry.identity)
        } else {
            Err(AuthError::AuthenticationFailed)
        }
    }
}

/// Hashes a password with Argon2id and a random salt, returning a PHC string.
///
/// # Errors
///
/// Returns the Argon2 error if hashing fails.
pub fn hash_password(password: &str) -> password_hash::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default().hash_password(password.as_bytes(), &salt).map(|hash| hash.to_string())
}

/// Returns `true` if `password` matches the PHC `hash`.
///
/// An unparseable hash never matches.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is not a valid PHC string");
            false
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("admin", "admin", true)]
    #[case("admin", "Admin", false)]
    #[case("admin", "", false)]
    #[case("root", "admin", false)]
    #[case("", "", false)]
    #[case("admin", "admin ", false)]
    #[tokio::test]
    async fn test_reference_account(
        #[case] username: &str,
        #[case] password: &str,
        #[case] accepted: bool,
    ) {
        let verifier = FixedAccountVerifier::reference();

        let result = verifier.verify(username, password).await;

        assert_eq!(result.is_ok(), accepted, "{username}/{password}");
        if let Ok(identity) = result {
            assert_eq!(identity.username, "admin");
            assert_eq!(identity.display_name(), "Eugene Belford");
        } else {
            assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
        }
    }

    #[test]
    fn test_fixed_account_debug_hides_password() {
        let verifier = FixedAccountVerifier::new(Identity::new("ops"), "s3cret");
        let debug = format!("{verifier:?}");
        assert!(debug.contains("ops"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct-horse-battery-staple", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn test_invalid_hash_never_matches() {
        assert!(!verify_password("password", "not-a-valid-hash"));
    }

    #[tokio::test]
    async fn test_delegated_verifier() {
        let directory = InMemoryPasswordDirectory::new();
        let alice = Identity::builder().username("alice").first_name("Alice").build();
        directory.insert(alice, "wonderland").unwrap();
        let verifier = DelegatedVerifier::new(Arc::new(directory));

        let identity = verifier.verify("alice", "wonderland").await.unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.first_name, "Alice");

        let wrong = verifier.verify("alice", "looking-glass").await;
        assert!(matches!(wrong, Err(AuthError::AuthenticationFailed)));

        let unknown = verifier.verify("bob", "wonderland").await;
        assert!(matches!(unknown, Err(AuthError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_delegated_verifier_with_corrupt_hash() {
        let directory = InMemoryPasswordDirectory::new();
        directory.insert_hash(Identity::new("mallory"), "$argon2id$garbage");
        let verifier = DelegatedVerifier::new(Arc::new(directory));

        let result = verifier.verify("mallory", "anything").await;
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }
}
