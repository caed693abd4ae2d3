//! Shared test utilities for authentication testing.
//!
//! This module provides helpers for generating Ed25519 key pairs in the
//! encodings clients send at login, signing requests the way a client does,
//! and crafting raw session tokens (for attack testing). It is feature-gated
//! behind `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! keygate-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use keygate_authn::testutil::{generate_keypair, sign_request};
//! ```

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use ed25519_dalek::{Signer, SigningKey, pkcs8::EncodePublicKey};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand_core::OsRng;

use crate::signature::canonical_signing_string;

/// Generates a fresh Ed25519 key pair.
///
/// Returns `(signing_key, public_key_b64)` where `public_key_b64` is the raw
/// 32-byte public key in standard base64, ready to send as `public_key` at
/// login.
pub fn generate_keypair() -> (SigningKey, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let public_key_b64 = STANDARD.encode(signing_key.verifying_key().to_bytes());
    (signing_key, public_key_b64)
}

/// Generates a fresh Ed25519 key pair with the public key as base64 SPKI DER.
///
/// # Panics
///
/// Panics if DER encoding fails (should not happen).
pub fn generate_keypair_spki() -> (SigningKey, String) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let der = signing_key.verifying_key().to_public_key_der().expect("encode SPKI");
    (signing_key, STANDARD.encode(der.as_bytes()))
}

/// Signs a request the way a client does.
///
/// `headers` are the declared header names with their values, in declared
/// order. Returns the base64 value for `X-Signature`.
pub fn sign_request(
    signing_key: &SigningKey,
    method: &str,
    target: &str,
    headers: &[(&str, &str)],
) -> String {
    let owned: Vec<(String, String)> =
        headers.iter().map(|(n, v)| ((*n).to_owned(), (*v).to_owned())).collect();
    let canonical = canonical_signing_string(method, target, &owned);
    STANDARD.encode(signing_key.sign(canonical.as_bytes()).to_bytes())
}

/// Builds the `X-Signed-Headers` value for `headers`.
pub fn declared_headers(headers: &[(&str, &str)]) -> String {
    headers.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(" ")
}

/// Creates a session token with arbitrary claims, signed with `secret`.
///
/// Useful for tokens the issuer would never mint itself, such as ones with
/// missing claims or timestamps far in the past.
///
/// # Panics
///
/// Panics if JWT encoding fails (should not happen with valid inputs).
pub fn craft_session_token(
    secret: &[u8],
    algorithm: Algorithm,
    claims: &serde_json::Value,
) -> String {
    jsonwebtoken::encode(&Header::new(algorithm), claims, &EncodingKey::from_secret(secret))
        .expect("Failed to encode test token")
}

/// Creates a raw JWT string from arbitrary header and payload JSON.
///
/// The resulting JWT has the structure `{header_b64}.{payload_b64}.`
/// with an empty signature. This is useful for testing rejection of
/// malformed or attack tokens (e.g., `alg: "none"`).
///
/// # Panics
///
/// Panics if JSON serialization fails.
pub fn craft_raw_jwt(header_json: &serde_json::Value, payload_json: &serde_json::Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}

/// Asserts that a `Result<T, AuthError>` is an `Err` matching the given variant.
///
/// Works with any `AuthError` variant. On failure, prints the expected variant
/// and the actual result for debugging.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use keygate_authn::assert_auth_error;
/// use keygate_authn::error::AuthError;
///
/// let result: Result<(), AuthError> = Err(AuthError::TokenExpired);
/// assert_auth_error!(result, TokenExpired);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}
