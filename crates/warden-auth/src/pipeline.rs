//! Per-request authentication pipeline.
//!
//! Every request passes through the same ordered steps:
//!
//! 1. Read the bearer token from the `Authorization` header. No header, or a
//!    non-bearer scheme, means the request continues anonymously.
//! 2. Reject the token if it has been revoked.
//! 3. Validate signature and expiry.
//! 4. Attach the resulting [`Identity`] to the request.
//!
//! Any failure clears whatever identity the request already carried before
//! the rejection is returned. The pipeline never touches a web framework
//! directly; hosts implement [`RequestContext`] for their request type.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::clock::Clock;
use crate::error::AuthError;
use crate::token::{TokenClaims, TokenCodec, TokenError, TokenRevocationRegistry};

/// Checks signature and expiry of a raw token.
pub trait TokenValidator: Send + Sync {
    /// Validates `raw_token` at `now` and returns its claims.
    ///
    /// # Errors
    /// Returns a [`TokenError`] describing why the token was rejected.
    fn validate(&self, raw_token: &str, now: OffsetDateTime) -> Result<TokenClaims, TokenError>;
}

impl TokenValidator for TokenCodec {
    fn validate(&self, raw_token: &str, now: OffsetDateTime) -> Result<TokenClaims, TokenError> {
        TokenCodec::validate(self, raw_token, now)
    }
}

/// Answers whether a raw token has been revoked.
pub trait RevocationChecker: Send + Sync {
    /// Returns `true` while `raw_token` is on the revocation list.
    fn is_revoked(&self, raw_token: &str) -> bool;
}

impl RevocationChecker for TokenRevocationRegistry {
    fn is_revoked(&self, raw_token: &str) -> bool {
        TokenRevocationRegistry::is_revoked(self, raw_token)
    }
}

/// Authenticated principal attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Username the token was issued to.
    pub subject: String,
    /// Unique id of the presenting token.
    pub jti: String,
    /// When the presenting token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            expires_at: claims.expires_at(),
            subject: claims.sub,
            jti: claims.jti,
        }
    }
}

/// Host request abstraction seen by the pipeline.
pub trait RequestContext {
    /// Raw value of the `Authorization` header, if present and readable.
    fn authorization(&self) -> Option<&str>;

    /// Makes `identity` available to downstream handlers.
    fn attach_identity(&mut self, identity: Identity);

    /// Removes any identity previously attached to the request.
    fn clear_identity(&mut self);
}

/// Result of running the pipeline for one request.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// No bearer credentials were presented.
    Anonymous,
    /// The token was accepted.
    Authenticated(Identity),
    /// The token was presented and rejected.
    Rejected(AuthError),
}

impl PipelineOutcome {
    /// Returns the identity for an authenticated outcome.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Returns `true` if the request must not proceed.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Extracts the token from a bearer `Authorization` header value.
///
/// The scheme is matched case-insensitively. Returns `Ok(None)` for other
/// schemes.
///
/// # Errors
/// Returns `AuthError::MalformedToken` if the bearer scheme carries no token.
pub fn extract_bearer(header: &str) -> Result<Option<&str>, AuthError> {
    let header = header.trim();
    let (scheme, rest) = match header.split_once(char::is_whitespace) {
        Some((scheme, rest)) => (scheme, rest.trim()),
        None => (header, ""),
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }
    if rest.is_empty() {
        return Err(AuthError::malformed_token("empty bearer token"));
    }
    Ok(Some(rest))
}

/// Ordered authentication steps applied to every request.
#[derive(Clone)]
pub struct AuthenticationPipeline {
    validator: Arc<dyn TokenValidator>,
    revocations: Arc<dyn RevocationChecker>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AuthenticationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationPipeline")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl AuthenticationPipeline {
    /// Creates a pipeline that checks `revocations` before `validator`.
    #[must_use]
    pub fn new(
        validator: Arc<dyn TokenValidator>,
        revocations: Arc<dyn RevocationChecker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            validator,
            revocations,
            clock,
        }
    }

    /// Decides the outcome for an `Authorization` header value.
    #[must_use]
    pub fn evaluate(&self, authorization: Option<&str>) -> PipelineOutcome {
        let Some(header) = authorization else {
            return PipelineOutcome::Anonymous;
        };

        let raw_token = match extract_bearer(header) {
            Ok(Some(token)) => token,
            Ok(None) => return PipelineOutcome::Anonymous,
            Err(err) => return PipelineOutcome::Rejected(err),
        };

        if self.revocations.is_revoked(raw_token) {
            return PipelineOutcome::Rejected(AuthError::TokenRevoked);
        }

        match self.validator.validate(raw_token, self.clock.now()) {
            Ok(claims) => PipelineOutcome::Authenticated(Identity::from(claims)),
            Err(err) => PipelineOutcome::Rejected(err.into()),
        }
    }

    /// Runs the pipeline against `request` and updates its identity.
    ///
    /// The caller must stop processing the request when the outcome is
    /// [`PipelineOutcome::Rejected`].
    pub fn process<R>(&self, request: &mut R) -> PipelineOutcome
    where
        R: RequestContext + ?Sized,
    {
        let outcome = self.evaluate(request.authorization());

        match &outcome {
            PipelineOutcome::Authenticated(identity) => {
                tracing::debug!(
                    subject = %identity.subject,
                    jti = %identity.jti,
                    "Request authenticated"
                );
                request.attach_identity(identity.clone());
            }
            PipelineOutcome::Anonymous => {
                request.clear_identity();
            }
            PipelineOutcome::Rejected(err) => {
                request.clear_identity();
                tracing::warn!(reason = err.reason(), "Bearer token rejected");
            }
        }

        outcome
    }
}
