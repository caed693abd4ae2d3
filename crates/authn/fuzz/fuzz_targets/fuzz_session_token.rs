//! Fuzz target for session token verification and refresh.
//!
//! Feeds arbitrary strings as bearer tokens. Every result must be either
//! `Ok(...)` or `Err(AuthError)`; a forged token must never verify.

#![no_main]

use std::sync::{Arc, LazyLock};

use keygate_authn::{FixedAccountVerifier, SessionConfig, SessionIssuer};
use keygate_storage::MemoryCredentialStore;
use libfuzzer_sys::fuzz_target;

static ISSUER: LazyLock<Option<SessionIssuer>> = LazyLock::new(|| {
    let config = SessionConfig::builder().secret("fuzz-secret").build().ok()?;
    SessionIssuer::new(
        Arc::new(config),
        Arc::new(FixedAccountVerifier::reference()),
        Arc::new(MemoryCredentialStore::new()),
    )
    .ok()
});

fuzz_target!(|data: &[u8]| {
    let Some(issuer) = ISSUER.as_ref() else {
        return;
    };
    // Bearer tokens arrive as header strings
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    let verified = issuer.verify(token);
    let refreshed = issuer.refresh(token);

    // Random input cannot carry a valid HS256 MAC under the fuzz secret
    assert!(verified.is_err(), "forged token verified: {token:?}");
    assert!(refreshed.is_err(), "forged token refreshed: {token:?}");

    issuer.logout(Some(token));
});
