//! Command-line and environment configuration.
//!
//! Every flag can also be set through a `KEYGATE_*` environment variable.

use std::{net::SocketAddr, sync::Arc};

use clap::{Parser, ValueEnum};
use keygate_authn::{
    ConfigError, FixedAccountVerifier, SessionConfig, SingleIdentityPolicy,
    config::{DEFAULT_MAX_REFRESH, DEFAULT_REALM, DEFAULT_TIMEOUT},
};
use keygate_storage::{
    CredentialStore, Identity, MemoryCredentialStore, SqliteCredentialStore, StorageResult,
};

use crate::state::AppState;

/// Database path selecting the non-persistent in-memory store.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Keygate authentication gateway.
#[derive(Parser, Clone)]
#[command(name = "keygate", version)]
#[command(about = "Session tokens plus per-request Ed25519 signatures")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "KEYGATE_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// SQLite database path, or `:memory:` for a non-persistent store
    #[arg(long, env = "KEYGATE_DATABASE", default_value = "sqlite.storage")]
    pub database: String,

    /// HMAC secret for session tokens
    #[arg(long, env = "KEYGATE_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Realm name
    #[arg(long, env = "KEYGATE_REALM", default_value = DEFAULT_REALM)]
    pub realm: String,

    /// Session token lifetime (e.g. `1h`, `30m`)
    #[arg(
        long,
        env = "KEYGATE_TIMEOUT",
        default_value_t = humantime::Duration::from(DEFAULT_TIMEOUT),
    )]
    pub timeout: humantime::Duration,

    /// How long after login a token may still be refreshed
    #[arg(
        long,
        env = "KEYGATE_MAX_REFRESH",
        default_value_t = humantime::Duration::from(DEFAULT_MAX_REFRESH),
    )]
    pub max_refresh: humantime::Duration,

    /// Username of the fixed account
    #[arg(long, env = "KEYGATE_ADMIN_USERNAME", default_value = "admin")]
    pub admin_username: String,

    /// Password of the fixed account
    #[arg(long, env = "KEYGATE_ADMIN_PASSWORD", default_value = "admin", hide_env_values = true)]
    pub admin_password: String,

    /// Log output format
    #[arg(long, env = "KEYGATE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("listen", &self.listen)
            .field("database", &self.database)
            .field("realm", &self.realm)
            .field("timeout", &self.timeout)
            .field("max_refresh", &self.max_refresh)
            .field("admin_username", &self.admin_username)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl Args {
    /// Builds the session configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an empty secret or a zero timeout.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        SessionConfig::builder()
            .realm(self.realm.clone())
            .secret(self.secret.clone())
            .timeout(*self.timeout)
            .max_refresh(*self.max_refresh)
            .build()
    }

    /// Opens the credential store named by `--database`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the SQLite database cannot be opened.
    pub fn open_store(&self) -> StorageResult<Arc<dyn CredentialStore>> {
        if self.database == IN_MEMORY_DATABASE {
            tracing::warn!("using in-memory credential store; keys are lost on restart");
            return Ok(Arc::new(MemoryCredentialStore::new()));
        }
        Ok(Arc::new(SqliteCredentialStore::open(&self.database)?))
    }

    /// Builds the fixed-account verifier.
    ///
    /// The stock `admin` account keeps its profile.
    #[must_use]
    pub fn verifier(&self) -> FixedAccountVerifier {
        let reference = FixedAccountVerifier::reference();
        let identity = if self.admin_username == reference.identity().username {
            reference.identity().clone()
        } else {
            Identity::new(self.admin_username.clone())
        };
        FixedAccountVerifier::new(identity, self.admin_password.clone())
    }

    /// Builds the policy privileging the fixed account.
    #[must_use]
    pub fn policy(&self) -> SingleIdentityPolicy {
        SingleIdentityPolicy::new(self.admin_username.clone())
    }

    /// Assembles the shared state from these arguments and `store`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the session configuration is invalid.
    pub fn app_state(&self, store: Arc<dyn CredentialStore>) -> Result<AppState, ConfigError> {
        AppState::builder()
            .config(Arc::new(self.session_config()?))
            .store(store)
            .verifier(Arc::new(self.verifier()))
            .policy(Arc::new(self.policy()))
            .build()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::time::Duration;

    use keygate_authn::{Action, AuthorizationPolicy, CredentialVerifier};

    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["keygate", "--secret", "31337"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);

        assert_eq!(args.listen, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(args.database, "sqlite.storage");
        assert_eq!(args.log_format, LogFormat::Text);

        let config = args.session_config().unwrap();
        assert_eq!(config.realm(), "keygate");
        assert_eq!(config.timeout(), Duration::from_secs(3600));
        assert_eq!(config.max_refresh(), Duration::from_secs(3600));
    }

    #[test]
    fn test_humantime_durations() {
        let args = parse(&["--timeout", "15m", "--max-refresh", "2h 30m", "--log-format", "json"]);
        let config = args.session_config().unwrap();

        assert_eq!(config.timeout(), Duration::from_secs(15 * 60));
        assert_eq!(config.max_refresh(), Duration::from_secs(150 * 60));
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let args = parse(&["--timeout", "0s"]);
        assert!(matches!(args.session_config(), Err(ConfigError::BelowMinimum { .. })));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let args = parse(&["--admin-password", "hunter2"]);
        let debug = format!("{args:?}");

        assert!(!debug.contains("31337"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_custom_admin_account() {
        let args = parse(&["--admin-username", "root", "--admin-password", "toor"]);
        let verifier = args.verifier();

        let identity = verifier.verify("root", "toor").await.unwrap();
        assert_eq!(identity.username, "root");
        assert!(verifier.verify("admin", "admin").await.is_err());
    }

    #[test]
    fn test_policy_follows_admin_username() {
        let action = Action::new("GET", "/user");

        let stock = parse(&[]).policy();
        assert!(stock.authorize("admin", &action));

        let custom = parse(&["--admin-username", "root"]).policy();
        assert!(custom.authorize("root", &action));
        assert!(!custom.authorize("admin", &action));
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let args = parse(&["--database", IN_MEMORY_DATABASE]);
        let store = args.open_store().unwrap();

        store.register("admin", "key").await.unwrap();
        assert_eq!(store.lookup("admin").await.unwrap(), "key");
    }
}
