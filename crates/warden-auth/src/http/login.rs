//! Login endpoint handler.
//!
//! `POST /auth/login` with a JSON body of `{"username", "password"}`.
//! On success returns a bearer token; otherwise the error response from
//! [`AuthError`](crate::AuthError), including `429` with `Retry-After`
//! while the account is locked.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::middleware::AuthState;

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// Never print the password.
impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Login response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    pub subject: String,
}

/// Handles `POST /auth/login`.
pub async fn login_handler(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> AuthResult<Json<LoginResponse>> {
    let result = state
        .login
        .authenticate(&request.username, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        access_token: result.token.into_string(),
        token_type: "Bearer".to_owned(),
        expires_in: result.expires_in.as_secs(),
        subject: result.subject,
    }))
}
