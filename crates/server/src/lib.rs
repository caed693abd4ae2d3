//! # Keygate Server
//!
//! HTTP surface of the Keygate gateway, built on axum.
//!
//! - `POST /login` checks a username and password, binds the caller's
//!   Ed25519 public key and returns a session token.
//! - `POST /refresh` exchanges a token for a later-expiring one while the
//!   refresh window of its lineage is open.
//! - `POST /logout` is acknowledged unconditionally.
//! - `GET /user` requires the session token, a request signature made with
//!   the registered key and a policy grant.
//!
//! ```no_run
//! use std::sync::Arc;
//! use keygate_authn::SessionConfig;
//! use keygate_server::{AppState, router};
//! use keygate_storage::MemoryCredentialStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::builder()
//!     .config(Arc::new(SessionConfig::builder().secret("31337").build()?))
//!     .store(Arc::new(MemoryCredentialStore::new()))
//!     .build()?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router(state)).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{Args, LogFormat};
pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
