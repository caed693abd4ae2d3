//! Session token algorithm validation.
//!
//! Session tokens are minted and checked by the same process with a shared
//! HMAC secret, so exactly one algorithm is legitimate. Anything else in a
//! token header is an algorithm substitution attempt.
//!
//! # Security
//!
//! - `none` is always rejected
//! - Asymmetric algorithms are rejected: a token claiming `RS256` or `EdDSA` could otherwise trick
//!   a verifier into treating the HMAC secret as a public key
//! - Only [`SESSION_ALGORITHM`] is accepted

use jsonwebtoken::Algorithm;

use crate::error::AuthError;

/// The algorithm every session token is signed with.
pub const SESSION_ALGORITHM: Algorithm = Algorithm::HS256;

/// Algorithms that are never accepted, whatever the configuration.
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none"];

/// Accepted session token algorithms.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["HS256"];

/// Validate a session token's header algorithm.
///
/// # Errors
///
/// Returns [`AuthError::TokenInvalid`] if the algorithm is
/// forbidden or not in [`ACCEPTED_ALGORITHMS`].
///
/// # Examples
///
/// ```
/// use keygate_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("HS256").is_ok());
/// assert!(validate_algorithm("EdDSA").is_err());
/// assert!(validate_algorithm("none").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.iter().any(|f| f.eq_ignore_ascii_case(alg)) {
        return Err(AuthError::token_invalid(format!(
            "Algorithm '{alg}' is not allowed for security reasons"
        )));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::token_invalid(format!(
            "Algorithm '{alg}' is not in accepted list (only HS256 is supported)"
        )));
    }

    Ok(())
}
