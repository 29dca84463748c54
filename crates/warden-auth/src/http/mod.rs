//! HTTP handlers for the authentication endpoints.
//!
//! # Available Handlers
//!
//! - [`login`] - `POST /auth/login`
//! - [`logout`] - `POST /auth/logout`
//! - [`session`] - `GET /auth/session`

pub mod login;
pub mod logout;
pub mod session;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

pub use login::{LoginRequest, LoginResponse, login_handler};
pub use logout::logout_handler;
pub use session::session_handler;

use crate::middleware::{AuthState, authenticate};

/// Builds the `/auth` routes.
///
/// Only the session route runs behind [`authenticate`]. Login takes no
/// token, and logout must accept tokens the pipeline would reject.
pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/auth/session", get(session_handler))
        .route_layer(from_fn_with_state(state.clone(), authenticate))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .with_state(state)
}
