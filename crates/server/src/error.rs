//! HTTP error responses.
//!
//! Every failure leaves the gateway as a `{code, message}` JSON body. The
//! status is chosen from the [`AuthError`] classification:
//!
//! | Failure                                   | Status |
//! |-------------------------------------------|--------|
//! | login, session token or refresh window    | 401    |
//! | request signature or authorization policy | 403    |
//! | unknown route (after a valid session)     | 404    |
//! | credential store                          | 500    |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use keygate_authn::AuthError;
use serde_json::json;
use thiserror::Error;

/// Errors returned by handlers and middleware.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Authentication, signature or authorization failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// No route matched the request.
    #[error("Page not found")]
    NotFound,
}

impl ApiError {
    /// Returns the HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Auth(e) if e.is_credential_failure() => StatusCode::UNAUTHORIZED,
            Self::Auth(e) if e.is_request_rejection() => StatusCode::FORBIDDEN,
            Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::NotFound => json!({ "code": "PAGE_NOT_FOUND", "message": self.to_string() }),
            Self::Auth(_) => json!({ "code": status.as_u16(), "message": self.to_string() }),
        };

        if status.is_server_error() {
            // The body stays generic; the source chain goes to the log only.
            let source = std::error::Error::source(&self).map(ToString::to_string);
            tracing::error!(error = %self, source = source.as_deref(), "request failed");
        }

        (status, Json(body)).into_response()
    }
}
