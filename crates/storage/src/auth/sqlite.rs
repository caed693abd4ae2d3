//! SQLite-backed [`CredentialStore`].
//!
//! Records live in a single `users` table keyed by a unique username:
//!
//! ```text
//! users
//! ├── id             INTEGER PRIMARY KEY AUTOINCREMENT
//! ├── username       TEXT NOT NULL UNIQUE
//! ├── public_key     TEXT NOT NULL
//! ├── registered_at  TEXT NOT NULL (RFC 3339)
//! └── updated_at     TEXT NOT NULL (RFC 3339)
//! ```
//!
//! Registration is a single `INSERT ... ON CONFLICT (username) DO UPDATE`
//! statement, so each upsert commits atomically and readers only ever see a
//! complete key.

use std::{path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use crate::{
    auth::{CredentialStore, PublicKeyRecord},
    error::{StorageError, StorageResult},
};

/// How long a writer waits on a locked database before reporting a conflict.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    public_key TEXT NOT NULL,
    registered_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

const UPSERT_PUBLIC_KEY: &str = "INSERT INTO users (username, public_key, registered_at, updated_at)
    VALUES (?1, ?2, ?3, ?3)
    ON CONFLICT (username) DO UPDATE SET
        public_key = excluded.public_key,
        updated_at = excluded.updated_at";

const SELECT_RECORD: &str =
    "SELECT username, public_key, registered_at, updated_at FROM users WHERE username = ?1";

/// Durable [`CredentialStore`] on top of a SQLite database file.
///
/// The connection is shared behind a mutex and every statement runs on the
/// tokio blocking pool, so a slow disk never stalls the async workers.
///
/// # Example
///
/// ```no_run
/// use keygate_storage::{CredentialStore, SqliteCredentialStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SqliteCredentialStore::open("sqlite.storage")?;
/// store.register("admin", "MCowBQYDK2VwAyEA...").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqliteCredentialStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCredentialStore").finish_non_exhaustive()
    }
}

impl SqliteCredentialStore {
    /// Opens (creating if needed) the database at `path` and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the file cannot be opened or
    /// created, or [`StorageError::Internal`] if the schema cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            StorageError::connection_with_source(
                format!("failed to open credential database {}", path.display()),
                e,
            )
        })?;
        tracing::debug!(path = %path.display(), "opened credential database");
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database. Intended for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            StorageError::connection_with_source("failed to open in-memory database", e)
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(|e| map_sqlite_error("set busy timeout", e))?;
        conn.execute(CREATE_USERS_TABLE, []).map_err(|e| map_sqlite_error("create schema", e))?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Runs `op` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            op(&conn)
        })
        .await
        .map_err(|e| StorageError::internal_with_source("credential store task failed", e))?
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    #[tracing::instrument(skip(self, public_key))]
    async fn register(&self, username: &str, public_key: &str) -> StorageResult<()> {
        let username = username.to_owned();
        let public_key = public_key.to_owned();
        let now = Utc::now();

        self.with_conn(move |conn| {
            conn.execute(UPSERT_PUBLIC_KEY, params![username, public_key, now])
                .map_err(|e| map_sqlite_error("register public key", e))?;
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn get_record(&self, username: &str) -> StorageResult<Option<PublicKeyRecord>> {
        let username = username.to_owned();

        self.with_conn(move |conn| {
            conn.query_row(SELECT_RECORD, params![username], |row| {
                Ok(PublicKeyRecord {
                    username: row.get(0)?,
                    public_key: row.get(1)?,
                    registered_at: row.get::<_, DateTime<Utc>>(2)?,
                    updated_at: row.get::<_, DateTime<Utc>>(3)?,
                })
            })
            .optional()
            .map_err(|e| map_sqlite_error("look up public key", e))
        })
        .await
    }
}

/// Maps a [`rusqlite::Error`] onto the storage error taxonomy.
fn map_sqlite_error(context: &str, err: rusqlite::Error) -> StorageError {
    let code = err.sqlite_error_code();
    let is_decode_failure = matches!(
        err,
        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..)
    );

    match code {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => StorageError::conflict(),
        Some(ErrorCode::CannotOpen | ErrorCode::NotADatabase) => {
            StorageError::connection_with_source(context, err)
        },
        _ if is_decode_failure => StorageError::serialization_with_source(context, err),
        _ => StorageError::internal_with_source(context, err),
    }
}
