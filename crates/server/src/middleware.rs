//! Authentication middleware.
//!
//! Protected routes run two layers, outermost first:
//!
//! 1. [`require_session`] checks the bearer token and stores the identity
//!    claim as an [`Authenticated`] request extension.
//! 2. [`require_signature`] verifies the request signature against the key
//!    registered for that identity, then applies the authorization policy.
//!
//! A failing layer returns its error response without calling `next`, so the
//! protected handler never runs after a rejection.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use keygate_authn::{
    Action, AuthError, SignedRequest,
    signature::{SIGNATURE_HEADER, SIGNED_HEADERS_HEADER},
};

use crate::{error::ApiError, state::AppState};

const BEARER_PREFIX: &str = "Bearer ";

/// Identity claim of a request whose session token verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated(pub String);

/// Extracts the token from an `Authorization: Bearer <token>` header.
///
/// # Errors
///
/// Returns [`AuthError::TokenInvalid`] if the header is missing, not UTF-8
/// or not a bearer credential.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthError::token_invalid("auth header is empty"))?;
    let value = value.to_str().map_err(|_| AuthError::token_invalid("auth header is invalid"))?;

    match value.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::token_invalid("auth header is invalid")),
    }
}

/// Rejects requests without a valid session token.
///
/// # Errors
///
/// Returns a 401 [`ApiError`] for a missing, expired or tampered token.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = bearer_token(request.headers())
        .and_then(|token| state.issuer().verify(token))
        .inspect_err(|e| tracing::debug!(error = %e, path = request.uri().path(), "no session"))?;

    request.extensions_mut().insert(Authenticated(identity));
    Ok(next.run(request).await)
}

/// Rejects requests whose signature or authorization does not check out.
///
/// Must run inside [`require_session`].
///
/// # Errors
///
/// Returns a 403 [`ApiError`] for a missing, malformed or invalid signature
/// and for a policy denial, or a 500 if the credential store fails.
pub async fn require_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(Authenticated(identity)) = request.extensions().get::<Authenticated>().cloned()
    else {
        return Err(AuthError::token_invalid("session was not checked").into());
    };

    // Everything borrowed from the request is extracted before awaiting.
    let action = Action::new(request.method().as_str(), request.uri().path());
    let signed = signed_request(&request);
    let outcome = match signed {
        Ok(signed) => verify_and_authorize(&state, &identity, &signed, &action).await,
        Err(e) => Err(e),
    };
    if let Err(e) = outcome {
        tracing::warn!(identity = %identity, error = %e, "request rejected");
        return Err(e.into());
    }

    Ok(next.run(request).await)
}

async fn verify_and_authorize(
    state: &AppState,
    identity: &str,
    signed: &SignedRequest,
    action: &Action,
) -> Result<(), AuthError> {
    state.signatures().verify(identity, signed).await?;
    state.policy().enforce(identity, action)
}

/// Reduces `request` to the parts covered by its signature.
///
/// The target is the path and query exactly as received. Declared headers
/// resolve to their first value; absent ones resolve to an empty value.
fn signed_request(request: &Request) -> Result<SignedRequest, AuthError> {
    let headers = request.headers();
    let signature = required_header(headers, SIGNATURE_HEADER)?;
    let declared = required_header(headers, SIGNED_HEADERS_HEADER)?;
    let target = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path(), |pq| pq.as_str());

    SignedRequest::from_parts(request.method().as_str(), target, declared, signature, |name| {
        headers
            .get(name)
            .map(|value| {
                value
                    .to_str()
                    .map(str::to_owned)
                    .map_err(|_| AuthError::malformed(format!("header {name} is not UTF-8")))
            })
            .transpose()
    })
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AuthError> {
    headers
        .get(name)
        .ok_or_else(|| AuthError::malformed(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| AuthError::malformed(format!("{name} is not UTF-8")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use axum::{body::Body, http::HeaderValue};

    use super::*;

    fn request(uri: &str, headers: &[(&str, &str)]) -> Request {
        let mut builder = Request::builder().method("GET").uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AuthError::TokenInvalid { .. })));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic YWRtaW46YWRtaW4="));
        assert!(matches!(bearer_token(&headers), Err(AuthError::TokenInvalid { .. })));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(bearer_token(&headers), Err(AuthError::TokenInvalid { .. })));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_signed_request_uses_path_and_query() {
        let req = request(
            "/user?verbose=1",
            &[("X-Signature", "c2ln"), ("X-Signed-Headers", "host"), ("host", "example.com")],
        );

        let signed = signed_request(&req).unwrap();

        assert_eq!(signed.target(), "/user?verbose=1");
        assert_eq!(
            signed.canonical_string(),
            "(request-target): get /user?verbose=1\nhost: example.com"
        );
    }

    #[test]
    fn test_signed_request_first_value_and_absent_header() {
        let req = request(
            "/user",
            &[
                ("X-Signature", "c2ln"),
                ("X-Signed-Headers", "x-a date"),
                ("x-a", "first"),
                ("x-a", "second"),
            ],
        );

        let signed = signed_request(&req).unwrap();

        assert_eq!(
            signed.headers(),
            &[("x-a".to_owned(), "first".to_owned()), ("date".to_owned(), String::new())]
        );
    }

    #[test]
    fn test_signed_request_requires_signature_headers() {
        let no_signature = request("/user", &[("X-Signed-Headers", "host")]);
        let no_declared = request("/user", &[("X-Signature", "c2ln")]);

        assert!(matches!(signed_request(&no_signature), Err(AuthError::MalformedInput { .. })));
        assert!(matches!(signed_request(&no_declared), Err(AuthError::MalformedInput { .. })));
    }

    #[test]
    fn test_signed_request_rejects_non_utf8_value() {
        let mut req = request("/user", &[("X-Signature", "c2ln"), ("X-Signed-Headers", "x-bin")]);
        req.headers_mut().insert("x-bin", HeaderValue::from_bytes(b"\xfe\xff").unwrap());

        assert!(matches!(signed_request(&req), Err(AuthError::MalformedInput { .. })));
    }
}
