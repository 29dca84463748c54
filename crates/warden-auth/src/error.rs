//! Authentication error types.
//!
//! This module defines the errors surfaced by the token pipeline and the
//! login use case. Token-level failures from the codec are converted into
//! [`AuthError`] at the subsystem boundary.

use std::fmt;
use std::time::Duration;

use crate::token::TokenError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// The bearer token is structurally invalid and cannot be decoded.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Description of why the token could not be decoded.
        message: String,
    },

    /// The token signature does not match its contents.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The token is past its expiry time.
    #[error("Token expired")]
    TokenExpired,

    /// The token was revoked by a logout before its natural expiry.
    #[error("Token revoked")]
    TokenRevoked,

    /// The account is temporarily locked after repeated failed logins.
    #[error("Account locked, retry in {}s", remaining.as_secs())]
    AccountLocked {
        /// Time left until the lock is lifted.
        remaining: Duration,
    },

    /// The request carries no authenticated identity but one is required.
    #[error("Authentication required")]
    Unauthenticated,

    /// The username/password pair did not verify.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The credential store does not know the username.
    #[error("User not found")]
    UserNotFound,

    /// The credential store failed to answer.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates a new `AccountLocked` error.
    #[must_use]
    pub fn account_locked(remaining: Duration) -> Self {
        Self::AccountLocked { remaining }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Internal { .. })
    }

    /// Returns `true` if this is a token-related error.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken { .. }
                | Self::InvalidSignature
                | Self::TokenExpired
                | Self::TokenRevoked
        )
    }

    /// Returns `true` if this error rejects a credential check.
    ///
    /// `UserNotFound` is deliberately grouped with `InvalidCredentials`.
    #[must_use]
    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::UserNotFound)
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedToken { .. }
            | Self::InvalidSignature
            | Self::TokenExpired
            | Self::TokenRevoked => ErrorCategory::Token,
            Self::AccountLocked { .. } => ErrorCategory::Lockout,
            Self::Unauthenticated | Self::InvalidCredentials | Self::UserNotFound => {
                ErrorCategory::Authentication
            }
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the stable machine-readable code for this error.
    ///
    /// Credential failures share one code so responses never reveal
    /// whether the account exists.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedToken { .. }
            | Self::InvalidSignature
            | Self::TokenExpired
            | Self::TokenRevoked => "invalid_token",
            Self::Unauthenticated => "unauthorized",
            Self::AccountLocked { .. } => "account_locked",
            Self::InvalidCredentials | Self::UserNotFound => "invalid_credentials",
            Self::Storage { .. } | Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the internal failure reason, finer grained than [`AuthError::code`].
    ///
    /// Intended for logs, never for responses.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MalformedToken { .. } => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::TokenExpired => "expired",
            Self::TokenRevoked => "revoked",
            Self::Unauthenticated => "unauthenticated",
            Self::AccountLocked { .. } => "locked",
            Self::InvalidCredentials => "invalid_credentials",
            Self::UserNotFound => "user_not_found",
            Self::Storage { .. } => "storage",
            Self::Internal { .. } => "internal",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed { message } => Self::MalformedToken { message },
            TokenError::InvalidSignature => Self::InvalidSignature,
            TokenError::Expired => Self::TokenExpired,
            TokenError::Encoding { message } => Self::Internal { message },
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credential verification failures.
    Authentication,
    /// Token validation failures.
    Token,
    /// Lockout rejections.
    Lockout,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Lockout => write!(f, "lockout"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
