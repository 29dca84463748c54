//! Error response handling for authentication middleware.
//!
//! Responses use the RFC 6750 error body shape:
//! `{"error": "<code>", "error_description": "<message>"}`.
//! Credential failures never reveal whether the account exists, and
//! server-side failures never echo internal details.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const REALM: &str = "warden";

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = error_details(&self);
        let code = self.code();

        let body = json!({
            "error": code,
            "error_description": message,
        });

        let mut headers = HeaderMap::new();

        if status == StatusCode::UNAUTHORIZED {
            let challenge = if self.is_token_error() {
                build_www_authenticate_header(Some((code, message)))
            } else {
                build_www_authenticate_header(None)
            };
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        if let AuthError::AccountLocked { remaining } = &self {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(*remaining)));
        }

        if self.is_server_error() {
            tracing::error!(error = %self, "Authentication failed with server error");
        }

        (status, headers, Json(body)).into_response()
    }
}

/// Returns (HTTP status, client-facing message).
fn error_details(error: &AuthError) -> (StatusCode, &'static str) {
    match error {
        AuthError::MalformedToken { .. } => (StatusCode::UNAUTHORIZED, "Token is malformed"),
        AuthError::InvalidSignature => (StatusCode::UNAUTHORIZED, "Token signature is invalid"),
        AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token has expired"),
        AuthError::TokenRevoked => (StatusCode::UNAUTHORIZED, "Token has been revoked"),
        AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Authentication required"),
        AuthError::InvalidCredentials | AuthError::UserNotFound => {
            (StatusCode::UNAUTHORIZED, "Invalid username or password")
        }
        AuthError::AccountLocked { .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many failed login attempts, try again later",
        ),
        AuthError::Storage { .. } | AuthError::Internal { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="warden", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(error: Option<(&str, &str)>) -> String {
    match error {
        Some((code, description)) => {
            let escaped_desc = description.replace('\"', "\\\"");
            format!(
                "Bearer realm=\"{}\", error=\"{}\", error_description=\"{}\"",
                REALM, code, escaped_desc
            )
        }
        None => format!("Bearer realm=\"{}\"", REALM),
    }
}

/// Whole seconds until the lock lifts, rounded up.
fn retry_after_secs(remaining: std::time::Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}
