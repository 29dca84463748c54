//! Bearer authentication middleware and identity extractors.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AuthError;
use crate::login::LoginUseCase;
use crate::pipeline::{AuthenticationPipeline, Identity, PipelineOutcome, RequestContext};

// =============================================================================
// Auth State
// =============================================================================

/// Shared state for the authentication middleware and handlers.
#[derive(Clone, Debug)]
pub struct AuthState {
    /// Per-request token pipeline.
    pub pipeline: Arc<AuthenticationPipeline>,
    /// Login/logout orchestration.
    pub login: Arc<LoginUseCase>,
}

impl AuthState {
    #[must_use]
    pub fn new(pipeline: Arc<AuthenticationPipeline>, login: Arc<LoginUseCase>) -> Self {
        Self { pipeline, login }
    }
}

// =============================================================================
// Request Context
// =============================================================================

impl RequestContext for Request {
    fn authorization(&self) -> Option<&str> {
        self.headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }

    fn attach_identity(&mut self, identity: Identity) {
        self.extensions_mut().insert(identity);
    }

    fn clear_identity(&mut self) {
        self.extensions_mut().remove::<Identity>();
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Runs the authentication pipeline for every request.
///
/// Requests without bearer credentials pass through anonymously. A
/// presented token that fails any check ends the request with the
/// corresponding error response.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .route("/me", get(me))
///     .layer(axum::middleware::from_fn_with_state(state.clone(), authenticate))
///     .with_state(state);
/// ```
pub async fn authenticate(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.pipeline.process(&mut request) {
        PipelineOutcome::Rejected(err) => err.into_response(),
        PipelineOutcome::Anonymous | PipelineOutcome::Authenticated(_) => next.run(request).await,
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Extractor requiring an authenticated identity.
///
/// Rejects with `401 Unauthorized` when the request is anonymous. Must run
/// behind [`authenticate`].
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentIdentity)
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Extractor for an identity that may be absent.
#[derive(Debug, Clone)]
pub struct OptionalIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalIdentity(parts.extensions.get::<Identity>().cloned()))
    }
}
