use axum::{
    BoxError, Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use warden_auth::OptionalIdentity;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

/// Service banner. Names the caller when a valid token was presented.
pub async fn root(OptionalIdentity(identity): OptionalIdentity) -> impl IntoResponse {
    let body = json!({
        "service": "Warden",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("GIT_COMMIT"),
        "subject": identity.map(|identity| identity.subject),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Maps errors from the tower timeout/load-shed layers to responses.
pub async fn handle_middleware_error(err: BoxError) -> Response {
    let (status, code, message) = if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            "timeout",
            "request timed out".to_string(),
        )
    } else if err.is::<tower::load_shed::error::Overloaded>() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "overloaded",
            "server is overloaded, retry later".to_string(),
        )
    } else {
        tracing::error!(error = %err, "unhandled middleware error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "internal server error".to_string(),
        )
    };

    (
        status,
        Json(json!({ "error": code, "error_description": message })),
    )
        .into_response()
}
