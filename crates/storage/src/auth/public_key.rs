//! Registered public key record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The public key currently bound to an identity.
///
/// Holds only public material: the transport-encoded key the caller sent at
/// login. The matching private key never leaves the caller.
///
/// # Invariants
///
/// - At most one record exists per `username`.
/// - A later login replaces `public_key` and bumps `updated_at`, while `registered_at` keeps the
///   time of the first registration.
///
/// # Example
///
/// ```
/// use keygate_storage::PublicKeyRecord;
///
/// let record = PublicKeyRecord::new("admin", "MCowBQYDK2VwAyEAabcd1234...");
///
/// assert_eq!(record.registered_at, record.updated_at);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicKeyRecord {
    /// Identity the key belongs to.
    pub username: String,

    /// Serialized public key, as sent by the caller (base64).
    pub public_key: String,

    /// When the identity first registered a key.
    pub registered_at: DateTime<Utc>,

    /// When the key was last replaced.
    pub updated_at: DateTime<Utc>,
}

impl PublicKeyRecord {
    /// Creates the first record for an identity, registered now.
    #[must_use]
    pub fn new(username: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self::registered_at(username, public_key, Utc::now())
    }

    /// Creates the first record for an identity, registered at `now`.
    #[must_use]
    pub fn registered_at(
        username: impl Into<String>,
        public_key: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            username: username.into(),
            public_key: public_key.into(),
            registered_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy carrying `public_key` as its new key, registered at `now`.
    ///
    /// `registered_at` is preserved; this is the upsert rule every store applies.
    #[must_use]
    pub fn replaced(&self, public_key: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            username: self.username.clone(),
            public_key: public_key.into(),
            registered_at: self.registered_at,
            updated_at: now,
        }
    }
}
