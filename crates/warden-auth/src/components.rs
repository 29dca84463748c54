//! Construction of the authentication subsystem.
//!
//! A host builds one [`AuthComponents`] at startup and shares it for the
//! process lifetime. All runtime state (revocations, lockout records)
//! lives inside it.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::config::{AuthConfig, ConfigError};
use crate::lockout::LoginAttemptTracker;
use crate::login::LoginUseCase;
use crate::middleware::AuthState;
use crate::pipeline::AuthenticationPipeline;
use crate::storage::CredentialStore;
use crate::sweeper::spawn_sweeper;
use crate::token::{TokenCodec, TokenRevocationRegistry};

/// Fully wired authentication subsystem.
#[derive(Debug, Clone)]
pub struct AuthComponents {
    /// Issues and validates tokens.
    pub codec: Arc<TokenCodec>,
    /// Tokens revoked by logout.
    pub revocations: Arc<TokenRevocationRegistry>,
    /// Failed-login counters and locks.
    pub attempts: Arc<LoginAttemptTracker>,
    /// Request-time token checks.
    pub pipeline: Arc<AuthenticationPipeline>,
    /// Login and logout flows.
    pub login: Arc<LoginUseCase>,
    config: AuthConfig,
}

impl AuthComponents {
    /// Validates `config` and wires every component.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the configuration is invalid.
    pub fn build(
        config: AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let codec = Arc::new(TokenCodec::from_config(&config.token));
        let revocations = Arc::new(TokenRevocationRegistry::new(clock.clone()));
        let attempts = Arc::new(LoginAttemptTracker::new(
            config.lockout.clone(),
            clock.clone(),
        ));
        let pipeline = Arc::new(AuthenticationPipeline::new(
            codec.clone(),
            revocations.clone(),
            clock.clone(),
        ));
        let login = Arc::new(LoginUseCase::new(
            codec.clone(),
            revocations.clone(),
            attempts.clone(),
            credentials,
            clock,
        ));

        tracing::info!(
            token_ttl_secs = config.token.ttl.as_secs(),
            max_failed_attempts = config.lockout.max_failed_attempts,
            escalation = ?config.lockout.escalation,
            "Authentication subsystem initialized"
        );

        Ok(Self {
            codec,
            revocations,
            attempts,
            pipeline,
            login,
            config,
        })
    }

    /// State for the Axum middleware and handlers.
    #[must_use]
    pub fn state(&self) -> AuthState {
        AuthState::new(self.pipeline.clone(), self.login.clone())
    }

    /// Starts the background sweeper using the configured intervals.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        spawn_sweeper(
            self.revocations.clone(),
            self.attempts.clone(),
            self.config.revocation.sweep_interval,
            self.config.lockout.idle_record_ttl,
        )
    }

    /// The validated configuration the components were built from.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::SystemClock;
    use crate::config::TokenConfig;
    use crate::storage::InMemoryCredentialStore;

    fn credentials() -> Arc<dyn CredentialStore> {
        Arc::new(InMemoryCredentialStore::with_users([("alice", "pw")]).unwrap())
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let result = AuthComponents::build(
            AuthConfig::default(),
            credentials(),
            Arc::new(SystemClock),
        );
        assert!(matches!(result, Err(ConfigError::Missing(_))));
    }

    #[tokio::test]
    async fn test_build_wires_shared_state() {
        let config = AuthConfig {
            token: TokenConfig {
                secret: "components-test-secret-0123456789abcdef".to_owned(),
                ttl: Duration::from_secs(120),
            },
            ..AuthConfig::default()
        };
        let components =
            AuthComponents::build(config, credentials(), Arc::new(SystemClock)).unwrap();

        let result = components.login.authenticate("alice", "pw").await.unwrap();
        assert_eq!(result.expires_in, Duration::from_secs(120));

        components.login.logout(result.token.as_str());
        assert!(components.revocations.is_revoked(result.token.as_str()));
        assert!(
            components
                .pipeline
                .evaluate(Some(&format!("Bearer {}", result.token.as_str())))
                .is_rejected()
        );
    }
}
