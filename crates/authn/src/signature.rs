//! Per-request Ed25519 signature verification.
//!
//! Every request to a protected route carries, next to its session token:
//!
//! - `X-Signed-Headers`: a space-separated, ordered list of header names
//! - `X-Signature`: base64 Ed25519 signature over the canonical signing string
//!
//! # Canonical Signing String
//!
//! ```text
//! (request-target): <lowercase method> <path and query>
//! <name 1>: <value 1>
//! <name 2>: <value 2>
//! ```
//!
//! Lines are joined by `\n` with no trailing newline. Header names are
//! emitted exactly as declared, in declared order, without sorting or
//! de-duplication. The signer and verifier must produce the string
//! bit-for-bit identically.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use ed25519_dalek::{
    PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH, Signature, VerifyingKey, pkcs8::DecodePublicKey,
};
use keygate_storage::{CredentialStore, StorageError};

use crate::error::{AuthError, Result};

/// Header carrying the base64 request signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Header carrying the space-separated list of signed header names.
pub const SIGNED_HEADERS_HEADER: &str = "X-Signed-Headers";

/// Pseudo-header naming the first line of the canonical string.
pub const REQUEST_TARGET: &str = "(request-target)";

/// A request reduced to the parts covered by its signature.
///
/// Not persisted; built per request by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    method: String,
    target: String,
    headers: Vec<(String, String)>,
    signature: String,
}

impl SignedRequest {
    /// Assembles a signed request from raw header values.
    ///
    /// `declared` is the `X-Signed-Headers` value; it is split on single
    /// spaces exactly, so an empty list yields one empty name and doubled
    /// spaces yield empty names. `header_value` resolves each declared name;
    /// it should return the first value when a header repeats and `None`
    /// when the header is absent, which contributes an empty value.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by `header_value`, typically
    /// [`AuthError::MalformedInput`] for a non-UTF-8 value.
    pub fn from_parts<F>(
        method: &str,
        target: &str,
        declared: &str,
        signature: &str,
        mut header_value: F,
    ) -> Result<Self>
    where
        F: FnMut(&str) -> Result<Option<String>>,
    {
        let headers = declared
            .split(' ')
            .map(|name| Ok((name.to_owned(), header_value(name)?.unwrap_or_default())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            method: method.to_owned(),
            target: target.to_owned(),
            headers,
            signature: signature.to_owned(),
        })
    }

    /// Returns the HTTP method as received.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request target (path and query).
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the declared headers and their resolved values, in declared order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the canonical signing string for this request.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        canonical_signing_string(&self.method, &self.target, &self.headers)
    }
}

/// Builds the canonical signing string.
///
/// # Example
///
/// ```
/// use keygate_authn::signature::canonical_signing_string;
///
/// let headers = vec![("host".to_owned(), "example.com".to_owned())];
/// let canonical = canonical_signing_string("GET", "/user", &headers);
///
/// assert_eq!(canonical, "(request-target): get /user\nhost: example.com");
/// ```
#[must_use]
pub fn canonical_signing_string(
    method: &str,
    target: &str,
    headers: &[(String, String)],
) -> String {
    let mut lines = Vec::with_capacity(headers.len() + 1);
    lines.push(format!("{REQUEST_TARGET}: {} {target}", method.to_lowercase()));
    lines.extend(headers.iter().map(|(name, value)| format!("{name}: {value}")));
    lines.join("\n")
}

/// Decodes a registered public key.
///
/// Accepts standard base64 of either the raw 32-byte Ed25519 key or its
/// DER SubjectPublicKeyInfo encoding.
///
/// # Errors
///
/// Returns [`AuthError::MalformedInput`] if the value is not base64 or does
/// not hold a valid Ed25519 public key.
pub fn decode_public_key(encoded: &str) -> Result<VerifyingKey> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| AuthError::malformed(format!("public key is not base64: {e}")))?;

    if let Ok(raw) = <[u8; PUBLIC_KEY_LENGTH]>::try_from(bytes.as_slice()) {
        return VerifyingKey::from_bytes(&raw)
            .map_err(|_| AuthError::malformed("public key is not a valid Ed25519 point"));
    }

    VerifyingKey::from_public_key_der(&bytes)
        .map_err(|_| AuthError::malformed("public key is not an Ed25519 SubjectPublicKeyInfo"))
}

/// Decodes a base64 Ed25519 signature.
///
/// # Errors
///
/// Returns [`AuthError::MalformedInput`] if the value is not base64 or not
/// exactly 64 bytes long.
pub fn decode_signature(encoded: &str) -> Result<Signature> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| AuthError::malformed(format!("{SIGNATURE_HEADER} is not base64: {e}")))?;

    let raw = <[u8; SIGNATURE_LENGTH]>::try_from(bytes.as_slice()).map_err(|_| {
        AuthError::malformed(format!(
            "{SIGNATURE_HEADER} must be {SIGNATURE_LENGTH} bytes, got {}",
            bytes.len()
        ))
    })?;

    Ok(Signature::from_bytes(&raw))
}

/// Verifies request signatures against the keys held by a [`CredentialStore`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use keygate_authn::{RequestSignatureVerifier, SignedRequest};
/// use keygate_storage::MemoryCredentialStore;
///
/// # async fn example(request: SignedRequest) -> Result<(), Box<dyn std::error::Error>> {
/// let verifier = RequestSignatureVerifier::new(Arc::new(MemoryCredentialStore::new()));
/// verifier.verify("admin", &request).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RequestSignatureVerifier {
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for RequestSignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSignatureVerifier").finish_non_exhaustive()
    }
}

impl RequestSignatureVerifier {
    /// Creates a verifier reading keys from `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Verifies that `request` was signed by the key registered for `identity`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UnknownIdentity`] if no key is registered
    /// - [`AuthError::MalformedInput`] if the stored key or the signature cannot be decoded
    /// - [`AuthError::SignatureInvalid`] if the signature does not verify
    /// - [`AuthError::StorageUnavailable`] if the store fails
    #[tracing::instrument(
        skip(self, request),
        fields(method = %request.method, target = %request.target)
    )]
    pub async fn verify(&self, identity: &str, request: &SignedRequest) -> Result<()> {
        let canonical = request.canonical_string();

        let encoded_key = match self.store.lookup(identity).await {
            Ok(key) => key,
            Err(StorageError::NotFound { .. }) => return Err(AuthError::unknown_identity(identity)),
            Err(e) => return Err(e.into()),
        };

        let public_key = decode_public_key(&encoded_key)?;
        let signature = decode_signature(&request.signature)?;

        public_key
            .verify_strict(canonical.as_bytes(), &signature)
            .map_err(|_| AuthError::SignatureInvalid)?;

        tracing::debug!(identity, "request signature verified");
        Ok(())
    }
}
