//! Security-focused authentication tests.
//!
//! These tests verify the pipeline's resistance to common attack vectors:
//! algorithm substitution, tampered and expired session tokens, stale
//! refresh lineages, signature bit flips, reordered signed-header lists,
//! and keys replaced by a later login.
#![allow(clippy::expect_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{TimeZone, Utc};
use jsonwebtoken::Algorithm;
use keygate_authn::{
    AuthError, Clock, FixedAccountVerifier, ManualClock, RequestSignatureVerifier, SessionConfig,
    SessionIssuer, SignedRequest, assert_auth_error,
    testutil::{
        craft_raw_jwt, craft_session_token, declared_headers, generate_keypair,
        generate_keypair_spki, sign_request,
    },
    validation::validate_algorithm,
};
use keygate_storage::{CredentialStore, MemoryCredentialStore};
use proptest::prelude::*;
use serde_json::json;
use tokio::task::JoinSet;

const SECRET: &[u8] = b"31337";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Gateway {
    issuer: SessionIssuer,
    signatures: RequestSignatureVerifier,
    clock: ManualClock,
}

fn gateway() -> Gateway {
    let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
    let config = SessionConfig::builder()
        .secret("31337")
        .timeout(Duration::from_secs(3600))
        .max_refresh(Duration::from_secs(3600))
        .build()
        .expect("config");
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().expect("date");
    let clock = ManualClock::new(start);
    let issuer = SessionIssuer::new(
        Arc::new(config),
        Arc::new(FixedAccountVerifier::reference()),
        Arc::clone(&store),
    )
    .expect("issuer")
    .with_clock(Arc::new(clock.clone()));

    Gateway { issuer, signatures: RequestSignatureVerifier::new(store), clock }
}

fn signed_request(declared: &str, signature: &str, headers: &[(&str, &str)]) -> SignedRequest {
    SignedRequest::from_parts("GET", "/user", declared, signature, |name| {
        Ok(headers.iter().find(|(n, _)| *n == name).map(|(_, v)| (*v).to_owned()))
    })
    .expect("build request")
}

const HEADERS: &[(&str, &str)] =
    &[("host", "localhost:8080"), ("date", "Fri, 01 Mar 2024 09:00:00 GMT")];

// ===========================================================================
// 1. Algorithm substitution: `alg: "none"` must be rejected
// ===========================================================================

#[test]
fn test_algorithm_none_token_rejected() {
    let gw = gateway();
    let now = gw.clock.now().timestamp();
    let token = craft_raw_jwt(
        &json!({"alg": "none", "typ": "JWT"}),
        &json!({"id": "admin", "iat": now, "exp": now + 3600, "orig_iat": now}),
    );

    let result = gw.issuer.verify(&token);

    assert!(result.is_err(), "unsigned token must never verify");
    assert_auth_error!(gw.issuer.refresh(&token), TokenInvalid);
}

#[test]
fn test_algorithm_none_rejected_by_validation() {
    assert_auth_error!(validate_algorithm("none"), TokenInvalid);
}

// ===========================================================================
// 2. Algorithm substitution: other HMAC strengths with the same secret
// ===========================================================================

#[test]
fn test_hs512_with_correct_secret_rejected() {
    let gw = gateway();
    let now = gw.clock.now().timestamp();
    let token = craft_session_token(
        SECRET,
        Algorithm::HS512,
        &json!({"id": "admin", "iat": now, "exp": now + 3600, "orig_iat": now}),
    );

    assert_auth_error!(gw.issuer.verify(&token), TokenInvalid);
    assert_auth_error!(gw.issuer.refresh(&token), TokenInvalid);
}

// ===========================================================================
// 3. Tampering and forgery
// ===========================================================================

#[tokio::test]
async fn test_payload_swap_rejected() {
    let gw = gateway();
    let (_, public_key) = generate_keypair();
    let issued = gw.issuer.authenticate("admin", "admin", &public_key).await.expect("login");

    // Keep header and signature, substitute the claims of a different identity.
    let now = gw.clock.now().timestamp();
    let other = craft_session_token(
        SECRET,
        Algorithm::HS256,
        &json!({"id": "root", "iat": now, "exp": now + 3600, "orig_iat": now}),
    );
    let mut parts: Vec<&str> = issued.token.split('.').collect();
    let other_parts: Vec<&str> = other.split('.').collect();
    parts[1] = other_parts[1];
    let tampered = parts.join(".");

    assert_auth_error!(gw.issuer.verify(&tampered), TokenInvalid);
}

#[test]
fn test_token_signed_with_other_secret_rejected() {
    let gw = gateway();
    let now = gw.clock.now().timestamp();
    let forged = craft_session_token(
        b"guessed-secret",
        Algorithm::HS256,
        &json!({"id": "admin", "iat": now, "exp": now + 3600, "orig_iat": now}),
    );

    assert_auth_error!(gw.issuer.verify(&forged), TokenInvalid);
}

#[test]
fn test_token_without_expiry_rejected() {
    let gw = gateway();
    let now = gw.clock.now().timestamp();
    let token = craft_session_token(
        SECRET,
        Algorithm::HS256,
        &json!({"id": "admin", "iat": now, "orig_iat": now}),
    );

    assert_auth_error!(gw.issuer.verify(&token), TokenInvalid);
}

#[test]
fn test_malformed_tokens_rejected() {
    let gw = gateway();
    let not_json = "eyJhbGciOiJIUzI1NiJ9.bm90IGpzb24.c2ln";
    for token in ["", "a", "a.b", "a.b.c.d", "!!!.???.***", not_json] {
        assert!(gw.issuer.verify(token).is_err(), "{token:?} must be rejected");
    }
}

// ===========================================================================
// 4. Expiry boundary with 1-second granularity
// ===========================================================================

#[tokio::test]
async fn test_token_expiry_boundary() {
    let gw = gateway();
    let (_, public_key) = generate_keypair();
    let issued = gw.issuer.authenticate("admin", "admin", &public_key).await.expect("login");

    gw.clock.set(issued.expires_at - chrono::Duration::seconds(1));
    assert_eq!(gw.issuer.verify(&issued.token).expect("valid"), "admin");

    gw.clock.set(issued.expires_at + chrono::Duration::seconds(1));
    assert_auth_error!(gw.issuer.verify(&issued.token), TokenExpired);
}

#[tokio::test]
async fn test_refresh_window_closes_on_lineage_age() {
    let gw = gateway();
    let (_, public_key) = generate_keypair();
    let first = gw.issuer.authenticate("admin", "admin", &public_key).await.expect("login");

    gw.clock.advance(chrono::Duration::minutes(59));
    let second = gw.issuer.refresh(&first.token).expect("inside window");

    gw.clock.advance(chrono::Duration::minutes(2));
    // The refreshed token is still valid, but its lineage is too old to extend.
    assert_eq!(gw.issuer.verify(&second.token).expect("valid"), "admin");
    assert_auth_error!(gw.issuer.refresh(&second.token), RefreshWindowExpired);
}

// ===========================================================================
// 5. Request signatures
// ===========================================================================

#[tokio::test]
async fn test_signature_round_trip_with_spki_key() {
    let gw = gateway();
    let (signing_key, public_key) = generate_keypair_spki();
    gw.issuer.authenticate("admin", "admin", &public_key).await.expect("login");

    let signature = sign_request(&signing_key, "GET", "/user", HEADERS);
    let request = signed_request(&declared_headers(HEADERS), &signature, HEADERS);

    gw.signatures.verify("admin", &request).await.expect("signature verifies");
}

#[tokio::test]
async fn test_reordered_signed_headers_rejected() {
    let gw = gateway();
    let (signing_key, public_key) = generate_keypair();
    gw.issuer.authenticate("admin", "admin", &public_key).await.expect("login");

    let signature = sign_request(&signing_key, "GET", "/user", HEADERS);
    let request = signed_request("date host", &signature, HEADERS);

    assert_auth_error!(gw.signatures.verify("admin", &request).await, SignatureInvalid);
}

#[tokio::test]
async fn test_method_case_is_normalized() {
    let gw = gateway();
    let (signing_key, public_key) = generate_keypair();
    gw.issuer.authenticate("admin", "admin", &public_key).await.expect("login");

    // Clients sign the lowercase method; the verifier lowercases what it received.
    let signature = sign_request(&signing_key, "get", "/user", HEADERS);
    let request = signed_request(&declared_headers(HEADERS), &signature, HEADERS);

    gw.signatures.verify("admin", &request).await.expect("signature verifies");
}

#[tokio::test]
async fn test_replaced_key_invalidates_old_signatures() {
    let gw = gateway();
    let (old_key, old_public) = generate_keypair();
    let (new_key, new_public) = generate_keypair();
    gw.issuer.authenticate("admin", "admin", &old_public).await.expect("first login");
    gw.issuer.authenticate("admin", "admin", &new_public).await.expect("second login");

    let declared = declared_headers(HEADERS);
    let stale_signature = sign_request(&old_key, "GET", "/user", HEADERS);
    let fresh_signature = sign_request(&new_key, "GET", "/user", HEADERS);
    let stale = signed_request(&declared, &stale_signature, HEADERS);
    let fresh = signed_request(&declared, &fresh_signature, HEADERS);

    assert_auth_error!(gw.signatures.verify("admin", &stale).await, SignatureInvalid);
    gw.signatures.verify("admin", &fresh).await.expect("current key verifies");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_logins_leave_one_verifying_key() {
    const LOGINS: usize = 16;

    let gw = gateway();
    let issuer = Arc::new(gw.issuer);
    let keys: Vec<_> = (0..LOGINS).map(|_| generate_keypair()).collect();

    let mut set = JoinSet::new();
    for (_, public_key) in &keys {
        let issuer = Arc::clone(&issuer);
        let public_key = public_key.clone();
        set.spawn(async move { issuer.authenticate("admin", "admin", &public_key).await });
    }
    while let Some(joined) = set.join_next().await {
        joined.expect("task panicked").expect("login");
    }

    let declared = declared_headers(HEADERS);
    let mut accepted = 0;
    for (signing_key, _) in &keys {
        let signature = sign_request(signing_key, "GET", "/user", HEADERS);
        let request = signed_request(&declared, &signature, HEADERS);
        match gw.signatures.verify("admin", &request).await {
            Ok(()) => accepted += 1,
            Err(AuthError::SignatureInvalid) => {},
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(accepted, 1, "exactly the last registered key must verify");
}

#[tokio::test]
async fn test_unknown_identity_rejected() {
    let gw = gateway();
    let (signing_key, _) = generate_keypair();
    let signature = sign_request(&signing_key, "GET", "/user", HEADERS);
    let request = signed_request(&declared_headers(HEADERS), &signature, HEADERS);

    assert_auth_error!(gw.signatures.verify("nobody", &request).await, UnknownIdentity);
}

#[tokio::test]
async fn test_malformed_signatures_rejected() {
    let gw = gateway();
    let (_, public_key) = generate_keypair();
    gw.issuer.authenticate("admin", "admin", &public_key).await.expect("login");
    let declared = declared_headers(HEADERS);

    let short = STANDARD.encode([1u8; 63]);
    let long = STANDARD.encode([1u8; 65]);

    for signature in ["not base64!", "", short.as_str(), long.as_str()] {
        let request = signed_request(&declared, signature, HEADERS);
        let result = gw.signatures.verify("admin", &request).await;
        assert!(
            matches!(result, Err(AuthError::MalformedInput { .. })),
            "{signature:?}: {result:?}"
        );
    }
}

// ===========================================================================
// 6. Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Flipping any single bit of a valid signature makes verification fail.
    #[test]
    fn prop_single_bit_flip_rejected(bit in 0usize..512) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().expect("runtime");
        runtime.block_on(async {
            let gw = gateway();
            let (signing_key, public_key) = generate_keypair();
            gw.issuer.authenticate("admin", "admin", &public_key).await.expect("login");

            let signature = sign_request(&signing_key, "GET", "/user", HEADERS);
            let mut bytes = STANDARD.decode(&signature).expect("base64");
            bytes[bit / 8] ^= 1 << (bit % 8);
            let flipped = STANDARD.encode(&bytes);

            let request = signed_request(&declared_headers(HEADERS), &flipped, HEADERS);
            let result = gw.signatures.verify("admin", &request).await;
            prop_assert!(
                matches!(result, Err(AuthError::SignatureInvalid)),
                "bit {} flip accepted or misclassified: {:?}", bit, result
            );
            Ok(())
        })?;
    }

    /// Any header value change after signing is detected.
    #[test]
    fn prop_altered_header_value_rejected(value in "[ -~]{0,40}") {
        prop_assume!(value != HEADERS[0].1);
        let runtime = tokio::runtime::Builder::new_current_thread().build().expect("runtime");
        runtime.block_on(async {
            let gw = gateway();
            let (signing_key, public_key) = generate_keypair();
            gw.issuer.authenticate("admin", "admin", &public_key).await.expect("login");

            let signature = sign_request(&signing_key, "GET", "/user", HEADERS);
            let altered = [("host", value.as_str()), HEADERS[1]];
            let request = signed_request(&declared_headers(HEADERS), &signature, &altered);

            let result = gw.signatures.verify("admin", &request).await;
            prop_assert!(matches!(result, Err(AuthError::SignatureInvalid)));
            Ok(())
        })?;
    }
}
