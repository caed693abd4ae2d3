//! Identity type shared by the credential store and the session layer.

use serde::{Deserialize, Serialize};

/// An authenticated principal.
///
/// The `username` is the unique key under which a public key is registered
/// and the value carried as the identity claim inside session tokens. It
/// never changes once created; only the profile fields may be updated.
///
/// # Examples
///
/// ```
/// use keygate_storage::Identity;
///
/// let identity = Identity::builder()
///     .username("admin")
///     .first_name("Eugene")
///     .last_name("Belford")
///     .build();
///
/// assert_eq!(identity.username, "admin");
/// assert_eq!(identity.display_name(), "Eugene Belford");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, bon::Builder)]
pub struct Identity {
    /// Unique username.
    #[builder(into)]
    pub username: String,

    /// Given name.
    #[builder(into, default)]
    #[serde(default)]
    pub first_name: String,

    /// Family name.
    #[builder(into, default)]
    #[serde(default)]
    pub last_name: String,
}

impl Identity {
    /// Creates an identity with an empty profile.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self { username: username.into(), first_name: String::new(), last_name: String::new() }
    }

    /// Full name for display, falling back to the username when no profile is set.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() { self.username.clone() } else { full.to_owned() }
    }
}
