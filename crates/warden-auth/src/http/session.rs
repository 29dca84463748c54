//! Current-session endpoint handler.

use axum::Json;

use crate::middleware::CurrentIdentity;
use crate::pipeline::Identity;

/// Handles `GET /auth/session`: returns the caller's identity.
pub async fn session_handler(CurrentIdentity(identity): CurrentIdentity) -> Json<Identity> {
    Json(identity)
}
