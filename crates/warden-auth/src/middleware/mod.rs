//! HTTP middleware for authentication.
//!
//! This module provides Axum glue for:
//!
//! - Running the [`AuthenticationPipeline`](crate::pipeline::AuthenticationPipeline) per request
//! - Identity extraction in handlers
//! - Error responses for [`AuthError`](crate::AuthError)
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware::from_fn_with_state, routing::get};
//! use warden_auth::middleware::{AuthState, CurrentIdentity, authenticate};
//!
//! async fn protected_handler(CurrentIdentity(identity): CurrentIdentity) -> String {
//!     format!("Hello, {}!", identity.subject)
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .layer(from_fn_with_state(auth_state.clone(), authenticate))
//!     .with_state(auth_state);
//! ```

pub mod auth;
pub mod error;

pub use auth::{AuthState, CurrentIdentity, OptionalIdentity, authenticate};
pub use error::REALM;
