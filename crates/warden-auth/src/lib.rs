//! # warden-auth
//!
//! Request-time authentication and account protection.
//!
//! This crate provides:
//! - Signed, self-contained session tokens with expiry
//! - Revocation of tokens on logout, effective until their natural expiry
//! - Per-account lockout after repeated failed logins
//! - A framework-agnostic per-request authentication pipeline
//! - Axum middleware, extractors and handlers built on top of it
//!
//! ## Modules
//!
//! - [`config`] - Token, lockout and revocation configuration
//! - [`token`] - Token codec and revocation registry
//! - [`lockout`] - Failed-login tracking
//! - [`pipeline`] - Per-request authentication steps
//! - [`login`] - Login and logout orchestration
//! - [`storage`] - Credential store trait and in-memory implementation
//! - [`password`] - Argon2 password hashing
//! - [`components`] - Wiring of the whole subsystem
//! - [`middleware`] - Axum middleware and extractors
//! - [`http`] - Axum handlers for the `/auth` endpoints

pub mod clock;
pub mod components;
pub mod config;
pub mod error;
pub mod http;
pub mod lockout;
pub mod login;
pub mod middleware;
pub mod password;
pub mod pipeline;
pub mod storage;
pub mod sweeper;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use components::AuthComponents;
pub use config::{AuthConfig, ConfigError, LockoutConfig, LockoutEscalation, TokenConfig};
pub use error::{AuthError, ErrorCategory};
pub use lockout::{FailureOutcome, LockoutInfo, LoginAttemptTracker};
pub use login::{AuthenticationResult, LoginUseCase};
pub use middleware::{AuthState, CurrentIdentity, OptionalIdentity, authenticate};
pub use pipeline::{
    AuthenticationPipeline, Identity, PipelineOutcome, RequestContext, RevocationChecker,
    TokenValidator,
};
pub use storage::{CredentialStore, InMemoryCredentialStore};
pub use sweeper::spawn_sweeper;
pub use token::{Token, TokenClaims, TokenCodec, TokenError, TokenRevocationRegistry};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use warden_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::components::AuthComponents;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::middleware::{AuthState, CurrentIdentity, OptionalIdentity, authenticate};
    pub use crate::pipeline::{Identity, PipelineOutcome};
    pub use crate::storage::{CredentialStore, InMemoryCredentialStore};
}
