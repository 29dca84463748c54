//! End-to-end scenarios across codec, registry, tracker, pipeline and login.

use std::sync::Arc;
use std::time::Duration;

use tokio_test::{assert_err, assert_ok};
use warden_auth::{
    AuthComponents, AuthConfig, AuthError, Clock, InMemoryCredentialStore, LockoutConfig,
    ManualClock, PipelineOutcome, TokenCodec, TokenConfig, TokenError,
};

const SECRET: &str = "integration-test-secret-0123456789abcdef";

fn config(ttl: Duration) -> AuthConfig {
    AuthConfig {
        token: TokenConfig {
            secret: SECRET.to_owned(),
            ttl,
        },
        lockout: LockoutConfig {
            max_failed_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60),
            ..LockoutConfig::default()
        },
        ..AuthConfig::default()
    }
}

fn components(clock: Arc<ManualClock>) -> AuthComponents {
    let credentials = Arc::new(
        InMemoryCredentialStore::with_users([
            ("alice", "alice-pass"),
            ("bob", "bob-pass"),
            ("carol", "carol-pass"),
        ])
        .unwrap(),
    );
    AuthComponents::build(config(Duration::from_secs(3600)), credentials, clock).unwrap()
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[test]
fn token_valid_within_ttl_and_expired_after() {
    let clock = ManualClock::at_unix(1_700_000_000);
    let codec = TokenCodec::new(SECRET.as_bytes(), Duration::from_secs(60));
    let token = assert_ok!(codec.issue("alice", clock.now()));

    clock.advance(Duration::from_secs(30));
    let claims = assert_ok!(codec.validate(token.as_str(), clock.now()));
    assert_eq!(claims.subject(), "alice");

    clock.advance(Duration::from_secs(31));
    let err = assert_err!(codec.validate(token.as_str(), clock.now()));
    assert!(matches!(err, TokenError::Expired));
}

#[tokio::test]
async fn repeated_failures_lock_until_window_elapses() {
    let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
    let auth = components(clock.clone());

    for _ in 0..5 {
        let err = assert_err!(auth.login.authenticate("bob", "wrong").await);
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    let err = assert_err!(auth.login.authenticate("bob", "bob-pass").await);
    match err {
        AuthError::AccountLocked { remaining } => {
            assert_eq!(remaining, Duration::from_secs(15 * 60));
        }
        other => panic!("expected AccountLocked, got {other:?}"),
    }

    clock.advance(Duration::from_secs(15 * 60));
    let result = assert_ok!(auth.login.authenticate("bob", "bob-pass").await);
    assert_eq!(result.subject, "bob");
    assert_eq!(auth.attempts.get_lockout_info("bob").attempts, 0);
    assert!(!auth.attempts.is_account_locked("bob"));
}

#[tokio::test]
async fn logout_revokes_token_before_expiry() {
    let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
    let auth = components(clock.clone());

    let result = assert_ok!(auth.login.authenticate("carol", "carol-pass").await);
    let header = bearer(result.token.as_str());

    let outcome = auth.pipeline.evaluate(Some(&header));
    assert_eq!(outcome.identity().map(|i| i.subject.as_str()), Some("carol"));

    assert!(auth.login.logout(result.token.as_str()));

    assert!(matches!(
        auth.pipeline.evaluate(Some(&header)),
        PipelineOutcome::Rejected(AuthError::TokenRevoked)
    ));
    assert!(clock.now() < result.expires_at);
}

#[tokio::test]
async fn revocation_lapses_once_token_would_expire_anyway() {
    let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
    let auth = components(clock.clone());

    let result = assert_ok!(auth.login.authenticate("alice", "alice-pass").await);
    auth.login.logout(result.token.as_str());
    assert_eq!(auth.revocations.len(), 1);

    clock.advance(Duration::from_secs(3600));
    assert_eq!(auth.revocations.purge_expired(), 1);
    assert!(matches!(
        auth.pipeline.evaluate(Some(&bearer(result.token.as_str()))),
        PipelineOutcome::Rejected(AuthError::TokenExpired)
    ));
}

#[tokio::test]
async fn lockout_of_one_account_does_not_affect_others() {
    let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
    let auth = components(clock);

    for _ in 0..5 {
        let _ = auth.login.authenticate("bob", "wrong").await;
    }

    assert!(auth.attempts.is_account_locked("bob"));
    assert_ok!(auth.login.authenticate("alice", "alice-pass").await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failed_logins_are_all_counted() {
    let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
    let auth = Arc::new(components(clock));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let auth = auth.clone();
            tokio::spawn(async move { auth.login.authenticate("bob", "wrong").await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    let info = auth.attempts.get_lockout_info("bob");
    assert_eq!(info.attempts, 4);
    assert!(!auth.attempts.is_account_locked("bob"));
}
