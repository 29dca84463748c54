//! Authentication configuration.
//!
//! This module provides the configuration types for the auth subsystem:
//! token signing and lifetime, login lockout policy, and revocation
//! registry maintenance. Values are resolved once at process start and
//! treated as read-only afterwards.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum accepted length of the token signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth.token]
/// secret = "change-me-to-a-long-random-value-0123456789"
/// ttl = "1h"
///
/// [auth.lockout]
/// max_failed_attempts = 5
/// lockout_duration = "15m"
/// escalation = "exponential"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token signing configuration.
    pub token: TokenConfig,

    /// Failed-login lockout configuration.
    pub lockout: LockoutConfig,

    /// Revocation registry configuration.
    pub revocation: RevocationConfig,
}

/// Token signing and lifetime configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC secret used to sign tokens.
    /// Must be at least [`MIN_SECRET_LEN`] bytes.
    pub secret: String,

    /// Lifetime of an issued token.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"[redacted]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// How the lockout window grows once an account keeps failing past the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockoutEscalation {
    /// Every failure at or past the threshold locks for `lockout_duration`.
    #[default]
    Fixed,
    /// Each additional failure past the threshold doubles the window,
    /// capped at `max_lockout_duration`.
    Exponential,
}

/// Failed-login lockout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LockoutConfig {
    /// Maximum failed authentication attempts before lockout.
    pub max_failed_attempts: u32,

    /// Account lockout duration after max failed attempts.
    #[serde(with = "humantime_serde")]
    pub lockout_duration: Duration,

    /// Escalation curve for repeated lockouts.
    pub escalation: LockoutEscalation,

    /// Upper bound for an escalated lockout window.
    #[serde(with = "humantime_serde")]
    pub max_lockout_duration: Duration,

    /// Unlocked records idle for longer than this are dropped by the sweeper.
    #[serde(with = "humantime_serde")]
    pub idle_record_ttl: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60), // 15 minutes
            escalation: LockoutEscalation::Fixed,
            max_lockout_duration: Duration::from_secs(24 * 3600), // 1 day
            idle_record_ttl: Duration::from_secs(24 * 3600),
        }
    }
}

impl LockoutConfig {
    /// Returns the lockout window for an account that has just reached
    /// `failures` consecutive failures.
    ///
    /// Returns `None` while the count is still below the threshold.
    #[must_use]
    pub fn window_for(&self, failures: u32) -> Option<Duration> {
        if failures < self.max_failed_attempts {
            return None;
        }

        let window = match self.escalation {
            LockoutEscalation::Fixed => self.lockout_duration,
            LockoutEscalation::Exponential => {
                let excess = failures - self.max_failed_attempts;
                let factor = 1u32.checked_shl(excess).unwrap_or(u32::MAX);
                self.lockout_duration
                    .checked_mul(factor)
                    .unwrap_or(self.max_lockout_duration)
                    .min(self.max_lockout_duration)
            }
        };

        Some(window)
    }
}

/// Revocation registry maintenance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RevocationConfig {
    /// How often the background sweeper reclaims expired entries.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the signing secret is empty, and
    /// `ConfigError::InvalidValue` if:
    /// - The signing secret is shorter than [`MIN_SECRET_LEN`] bytes
    /// - The token TTL is zero
    /// - `max_failed_attempts` or `lockout_duration` is zero
    /// - `max_lockout_duration` is shorter than `lockout_duration`
    /// - The sweep interval is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.secret.is_empty() {
            return Err(ConfigError::Missing("token.secret".to_string()));
        }

        if self.token.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "token.secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        if self.token.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token.ttl must be > 0".to_string(),
            ));
        }

        if self.lockout.max_failed_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "max_failed_attempts must be > 0".to_string(),
            ));
        }

        if self.lockout.lockout_duration.is_zero() {
            return Err(ConfigError::InvalidValue(
                "lockout_duration must be > 0".to_string(),
            ));
        }

        if self.lockout.max_lockout_duration < self.lockout.lockout_duration {
            return Err(ConfigError::InvalidValue(
                "max_lockout_duration must be >= lockout_duration".to_string(),
            ));
        }

        if self.revocation.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "revocation.sweep_interval must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AuthConfig {
        let mut config = AuthConfig::default();
        config.token.secret = "0123456789abcdef0123456789abcdef".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.token.ttl, Duration::from_secs(3600));
        assert_eq!(config.lockout.max_failed_attempts, 5);
        assert_eq!(config.lockout.lockout_duration, Duration::from_secs(900));
        assert_eq!(config.lockout.escalation, LockoutEscalation::Fixed);
    }

    #[test]
    fn test_valid_config_validates() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_secret_fails_validation() {
        let err = AuthConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(err.to_string().contains("token.secret"));
    }

    #[test]
    fn test_short_secret_fails_validation() {
        let mut config = valid_config();
        config.token.secret = "too-short".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn test_zero_ttl_fails_validation() {
        let mut config = valid_config();
        config.token.ttl = Duration::ZERO;
        assert!(config.validate().unwrap_err().to_string().contains("ttl"));
    }

    #[test]
    fn test_zero_attempts_fails_validation() {
        let mut config = valid_config();
        config.lockout.max_failed_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_failed_attempts"));
    }

    #[test]
    fn test_max_lockout_below_base_fails_validation() {
        let mut config = valid_config();
        config.lockout.max_lockout_duration = Duration::from_secs(60);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_lockout_duration"));
    }

    #[test]
    fn test_fixed_window() {
        let lockout = LockoutConfig::default();
        assert_eq!(lockout.window_for(4), None);
        assert_eq!(lockout.window_for(5), Some(Duration::from_secs(900)));
        assert_eq!(lockout.window_for(9), Some(Duration::from_secs(900)));
    }

    #[test]
    fn test_exponential_window_doubles_and_caps() {
        let lockout = LockoutConfig {
            escalation: LockoutEscalation::Exponential,
            lockout_duration: Duration::from_secs(60),
            max_lockout_duration: Duration::from_secs(600),
            ..LockoutConfig::default()
        };

        assert_eq!(lockout.window_for(5), Some(Duration::from_secs(60)));
        assert_eq!(lockout.window_for(6), Some(Duration::from_secs(120)));
        assert_eq!(lockout.window_for(7), Some(Duration::from_secs(240)));
        assert_eq!(lockout.window_for(8), Some(Duration::from_secs(480)));
        assert_eq!(lockout.window_for(9), Some(Duration::from_secs(600)));
        assert_eq!(lockout.window_for(200), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_windows_never_shrink() {
        let lockout = LockoutConfig {
            escalation: LockoutEscalation::Exponential,
            ..LockoutConfig::default()
        };

        let mut previous = Duration::ZERO;
        for failures in 5..80 {
            let window = lockout.window_for(failures).unwrap();
            assert!(window >= previous);
            previous = window;
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = valid_config();
        let debug = format!("{:?}", config.token);
        assert!(!debug.contains("0123456789abcdef"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_deserialize_humantime() {
        let json = r#"{
            "token": {"secret": "s", "ttl": "30m"},
            "lockout": {"lockout_duration": "2m", "escalation": "exponential"}
        }"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.token.ttl, Duration::from_secs(1800));
        assert_eq!(config.lockout.lockout_duration, Duration::from_secs(120));
        assert_eq!(config.lockout.escalation, LockoutEscalation::Exponential);
        assert_eq!(config.lockout.max_failed_attempts, 5);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue("test error".to_string());
        assert_eq!(err.to_string(), "Invalid configuration value: test error");

        let err = ConfigError::Missing("required_field".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required configuration: required_field"
        );
    }
}
