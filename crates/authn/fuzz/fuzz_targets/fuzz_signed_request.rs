//! Fuzz target for request signature parsing.
//!
//! Splits the input into a method, target, declared header list, signature
//! and public key, then drives the parsing helpers. None of them may panic.

#![no_main]

use keygate_authn::{
    AuthError, SignedRequest,
    signature::{decode_public_key, decode_signature},
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut parts = input.splitn(5, '\n');
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();
    let declared = parts.next().unwrap_or_default();
    let signature = parts.next().unwrap_or_default();
    let public_key = parts.next().unwrap_or_default();

    let request = SignedRequest::from_parts(method, target, declared, signature, |name| {
        // Echo odd-length names, treat the rest as absent
        Ok::<_, AuthError>((name.len() % 2 == 1).then(|| name.to_owned()))
    });
    if let Ok(request) = request {
        let canonical = request.canonical_string();
        assert!(canonical.starts_with("(request-target): "));
    }

    if let Ok(sig) = decode_signature(signature) {
        assert_eq!(sig.to_bytes().len(), 64);
    }
    let _ = decode_public_key(public_key);
});
