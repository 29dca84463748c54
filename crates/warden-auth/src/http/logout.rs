//! Logout endpoint handler.
//!
//! `POST /auth/logout` revokes the bearer token presented in the
//! `Authorization` header. The response is always `204 No Content`: a
//! missing, malformed, forged or already-expired token simply has nothing
//! to revoke.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};

use crate::middleware::AuthState;
use crate::pipeline::extract_bearer;

/// Handles `POST /auth/logout`.
pub async fn logout_handler(State(state): State<AuthState>, headers: HeaderMap) -> StatusCode {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| extract_bearer(value).ok().flatten());

    match token {
        Some(token) => {
            state.login.logout(token);
        }
        None => tracing::debug!("Logout without bearer token"),
    }

    StatusCode::NO_CONTENT
}
