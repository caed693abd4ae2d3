//! Session token configuration.
//!
//! [`SessionConfig`] is built once at startup and shared read-only by every
//! component that mints or checks session tokens.

use std::{fmt, time::Duration};

use serde::{Deserialize, Deserializer};
use zeroize::Zeroizing;

use crate::error::ConfigError;

/// Default realm reported to clients.
pub const DEFAULT_REALM: &str = "keygate";

/// Default session token lifetime (1 hour).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Default refresh window measured from the first token of a lineage (1 hour).
pub const DEFAULT_MAX_REFRESH: Duration = Duration::from_secs(60 * 60);

/// Name of the claim carrying the identity inside a session token.
pub const IDENTITY_KEY: &str = "id";

/// Configuration for [`SessionIssuer`](crate::SessionIssuer).
///
/// The signing secret is held in [`Zeroizing`] memory and never printed by
/// the `Debug` implementation.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use keygate_authn::SessionConfig;
///
/// let config = SessionConfig::builder()
///     .secret("correct horse battery staple")
///     .timeout(Duration::from_secs(15 * 60))
///     .build()?;
///
/// assert_eq!(config.realm(), "keygate");
/// assert_eq!(config.max_refresh(), Duration::from_secs(3600));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Realm name reported to clients.
    #[serde(default = "default_realm")]
    realm: String,

    /// HMAC secret used to sign session tokens.
    #[serde(deserialize_with = "deserialize_secret")]
    secret: Zeroizing<String>,

    /// Lifetime of each issued token.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    timeout: Duration,

    /// How long after the first login a token lineage may still be refreshed.
    #[serde(with = "humantime_serde", default = "default_max_refresh")]
    max_refresh: Duration,
}

fn default_realm() -> String {
    DEFAULT_REALM.to_owned()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_max_refresh() -> Duration {
    DEFAULT_MAX_REFRESH
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Zeroizing<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Zeroizing::new)
}

#[bon::bon]
impl SessionConfig {
    /// Creates a new session configuration.
    ///
    /// # Arguments
    ///
    /// * `realm` - Realm name (default: `keygate`).
    /// * `secret` - HMAC signing secret (required, non-empty).
    /// * `timeout` - Token lifetime (default: 1 hour).
    /// * `max_refresh` - Refresh window from the first login (default: 1 hour).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the secret is empty or the timeout is zero.
    #[builder]
    pub fn new(
        #[builder(into, default = DEFAULT_REALM.to_owned())] realm: String,
        #[builder(into)] secret: String,
        #[builder(default = DEFAULT_TIMEOUT)] timeout: Duration,
        #[builder(default = DEFAULT_MAX_REFRESH)] max_refresh: Duration,
    ) -> Result<Self, ConfigError> {
        let config = Self { realm, secret: Zeroizing::new(secret), timeout, max_refresh };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the builder enforces.
    ///
    /// Call this on configurations obtained through `Deserialize`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Empty`] for an empty secret and
    /// [`ConfigError::BelowMinimum`] for a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::Empty { field: "secret" });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::BelowMinimum {
                field: "timeout",
                min: "1s".into(),
                value: humantime::format_duration(self.timeout).to_string(),
            });
        }
        Ok(())
    }

    /// Returns the realm name.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Returns the signing secret bytes.
    #[must_use]
    pub fn secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Returns the token lifetime.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the refresh window.
    #[must_use]
    pub fn max_refresh(&self) -> Duration {
        self.max_refresh
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("realm", &self.realm)
            .field("secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("max_refresh", &self.max_refresh)
            .finish()
    }
}
