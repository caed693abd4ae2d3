//! HTTP handlers and router assembly.

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use chrono::SecondsFormat;
use keygate_authn::{AuthError, IssuedToken};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    middleware::{Authenticated, bearer_token, require_session, require_signature},
    state::AppState,
};

/// Message returned when the login body is missing or incomplete.
pub const MISSING_LOGIN_VALUES: &str = "missing Username, Password or Public Key";

/// Builds the gateway router.
///
/// | Route           | Guard                         |
/// |-----------------|-------------------------------|
/// | `POST /login`   | none                          |
/// | `POST /refresh` | bearer token (may be expired) |
/// | `POST /logout`  | none                          |
/// | `GET /user`     | session, signature, policy    |
/// | anything else   | session, then 404             |
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/user", get(user_info))
        .route_layer(from_fn_with_state(state.clone(), require_signature))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .merge(protected)
        .with_state(state)
}

/// `POST /login` body.
///
/// Missing fields deserialize as empty and are rejected by the issuer.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Base64 Ed25519 public key to bind to the account.
    pub public_key: String,
}

/// Successful login or refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Always 200.
    pub code: u16,
    /// Session token for the `Authorization: Bearer` header.
    pub token: String,
    /// Expiry as RFC 3339.
    pub expire: String,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            expire: issued.expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            token: issued.token,
        }
    }
}

/// Payload of `GET /user`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    /// Identity claim of the caller.
    #[serde(rename = "userName")]
    pub user_name: String,
}

/// Body of `POST /logout`.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    /// Always 200.
    pub code: u16,
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection, "unreadable login body");
        AuthError::validation(MISSING_LOGIN_VALUES)
    })?;

    let issued = state
        .issuer()
        .authenticate(&body.username, &body.password, &body.public_key)
        .await
        .inspect_err(|e| tracing::warn!(username = %body.username, error = %e, "login rejected"))?;

    Ok(Json(issued.into()))
}

async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let issued = bearer_token(&headers)
        .and_then(|token| state.issuer().refresh(token))
        .inspect_err(|e| tracing::debug!(error = %e, "refresh rejected"))?;

    Ok(Json(issued.into()))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<LogoutResponse> {
    state.issuer().logout(bearer_token(&headers).ok());
    Json(LogoutResponse { code: StatusCode::OK.as_u16() })
}

async fn user_info(Extension(Authenticated(identity)): Extension<Authenticated>) -> Json<UserInfo> {
    Json(UserInfo { user_name: identity })
}

async fn not_found(Extension(Authenticated(identity)): Extension<Authenticated>) -> ApiError {
    tracing::debug!(%identity, "no route");
    ApiError::NotFound
}
