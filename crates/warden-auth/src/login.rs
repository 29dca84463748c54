//! Login and logout orchestration.
//!
//! Login checks the account lock first, then asks the credential store,
//! then either issues a token or records the failure. Logout revokes the
//! presented token until its natural expiry.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::clock::Clock;
use crate::error::AuthError;
use crate::lockout::LoginAttemptTracker;
use crate::storage::CredentialStore;
use crate::token::{Token, TokenCodec, TokenRevocationRegistry};

/// Successful login.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    /// Username the token was issued to.
    pub subject: String,
    /// Freshly issued bearer token.
    pub token: Token,
    /// Token lifetime from issuance.
    pub expires_in: Duration,
    /// Absolute expiry of `token`.
    pub expires_at: OffsetDateTime,
}

/// Orchestrates credential checks, lockout, token issuance and revocation.
#[derive(Clone)]
pub struct LoginUseCase {
    codec: Arc<TokenCodec>,
    revocations: Arc<TokenRevocationRegistry>,
    attempts: Arc<LoginAttemptTracker>,
    credentials: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LoginUseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginUseCase")
            .field("codec", &self.codec)
            .field("attempts", &self.attempts.len())
            .field("revocations", &self.revocations.len())
            .finish_non_exhaustive()
    }
}

impl LoginUseCase {
    /// Creates a use case over shared token, revocation and lockout state.
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        revocations: Arc<TokenRevocationRegistry>,
        attempts: Arc<LoginAttemptTracker>,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            codec,
            revocations,
            attempts,
            credentials,
            clock,
        }
    }

    /// Verifies `username`/`password` and issues a token.
    ///
    /// A locked account is rejected before the credential store is
    /// consulted. Wrong passwords and unknown usernames both count as a
    /// failed attempt and both surface as `InvalidCredentials`.
    ///
    /// # Errors
    ///
    /// - `AuthError::AccountLocked` while the account is inside a lock window
    /// - `AuthError::InvalidCredentials` if the credentials do not verify
    /// - `AuthError::Storage` if the credential store could not answer
    /// - `AuthError::Internal` if token signing fails
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> AuthResult<AuthenticationResult> {
        if self.attempts.is_account_locked(username) {
            let remaining = self.attempts.remaining_lock_time(username);
            tracing::warn!(
                username = %username,
                remaining_secs = remaining.as_secs(),
                "Login rejected: account locked"
            );
            return Err(AuthError::account_locked(remaining));
        }

        match self.credentials.verify(username, password).await {
            Ok(true) => {}
            Ok(false) | Err(AuthError::UserNotFound) => {
                let outcome = self.attempts.record_failed_attempt(username);
                tracing::warn!(
                    username = %username,
                    attempts = outcome.attempts,
                    "Login failed: invalid credentials"
                );
                return Err(AuthError::InvalidCredentials);
            }
            Err(err) => {
                tracing::error!(username = %username, error = %err, "Credential store failed");
                return Err(err);
            }
        }

        self.attempts.clear_attempts(username);

        let (token, claims) = self
            .codec
            .issue_with_claims(username, self.clock.now())
            .map_err(AuthError::from)?;

        tracing::info!(subject = %username, jti = %claims.jti, "Login succeeded");

        Ok(AuthenticationResult {
            subject: claims.sub.clone(),
            expires_in: self.codec.ttl(),
            expires_at: claims.expires_at(),
            token,
        })
    }

    /// Revokes `raw_token` until its natural expiry.
    ///
    /// Tokens that fail to parse or carry a bad signature are ignored.
    /// Returns `true` if the token was recorded as revoked.
    pub fn logout(&self, raw_token: &str) -> bool {
        let claims = match self.codec.verify_allow_expired(raw_token) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!(error = %err, "Logout ignored: token not verifiable");
                return false;
            }
        };

        if claims.is_expired_at(self.clock.now()) {
            tracing::debug!(jti = %claims.jti, "Logout ignored: token already expired");
            return false;
        }

        self.revocations.revoke(raw_token, claims.expires_at());
        tracing::info!(subject = %claims.sub, jti = %claims.jti, "Logged out");
        true
    }

    /// Returns the login attempt tracker.
    #[must_use]
    pub fn attempts(&self) -> &Arc<LoginAttemptTracker> {
        &self.attempts
    }
}
