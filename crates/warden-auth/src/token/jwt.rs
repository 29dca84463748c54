//! Signed session tokens.
//!
//! Tokens are compact JWTs signed with HMAC-SHA256 over a process-wide
//! secret. They are self-contained: validation needs only the raw string,
//! the secret and the current time.
//!
//! ## Example
//!
//! ```ignore
//! use warden_auth::token::TokenCodec;
//!
//! let codec = TokenCodec::new(secret.as_bytes(), Duration::from_secs(3600));
//! let token = codec.issue("alice", OffsetDateTime::now_utc())?;
//! let claims = codec.validate(token.as_str(), OffsetDateTime::now_utc())?;
//! assert_eq!(claims.subject(), "alice");
//! ```

use std::fmt;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::TokenConfig;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while issuing or reading a token.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenError {
    /// The token is not a well-formed JWT carrying our claims.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of the structural problem.
        message: String,
    },

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },
}

impl TokenError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            // A token carrying a different algorithm was not signed by us.
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::MissingAlgorithm => Self::InvalidSignature,
            _ => Self::malformed(err.to_string()),
        }
    }
}

// ============================================================================
// Token & Claims
// ============================================================================

/// An encoded, signed token.
///
/// Opaque to its holder. Two tokens are equal iff their encoded strings are.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Wraps a raw encoded token.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the encoded token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning the encoded string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Raw tokens are bearer credentials; keep them out of debug output.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token([redacted])")
    }
}

/// Claims carried inside a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (username).
    pub sub: String,

    /// Issued at (Unix timestamp, whole seconds).
    pub iat: i64,

    /// Expiration time (Unix timestamp, whole seconds).
    pub exp: i64,

    /// Sub-second part of `iat`, in nanoseconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub iat_nanos: u32,

    /// Sub-second part of `exp`, in nanoseconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub exp_nanos: u32,

    /// Token ID, unique per issued token.
    pub jti: String,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

const NANOS_PER_SECOND: u32 = 1_000_000_000;

fn instant(seconds: i64, nanos: u32) -> Option<OffsetDateTime> {
    if nanos >= NANOS_PER_SECOND {
        return None;
    }
    OffsetDateTime::from_unix_timestamp(seconds)
        .ok()?
        .checked_add(time::Duration::nanoseconds(i64::from(nanos)))
}

impl TokenClaims {
    /// Returns the subject the token was issued to.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.sub
    }

    /// Returns the unique token ID.
    #[must_use]
    pub fn jti(&self) -> &str {
        &self.jti
    }

    /// Returns the exact instant the token was issued.
    #[must_use]
    pub fn issued_at(&self) -> OffsetDateTime {
        instant(self.iat, self.iat_nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Returns the exact instant the token stops being valid.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        instant(self.exp, self.exp_nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// Returns `true` if the token is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at()
    }

    fn check_timestamps(&self) -> Result<(), TokenError> {
        for (name, seconds, nanos) in [
            ("iat", self.iat, self.iat_nanos),
            ("exp", self.exp, self.exp_nanos),
        ] {
            if instant(seconds, nanos).is_none() {
                return Err(TokenError::malformed(format!(
                    "{} is out of range: {}.{:09}",
                    name, seconds, nanos
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Token Codec
// ============================================================================

/// Issues and validates signed tokens.
///
/// Pure function of (token, now, secret); thread-safe and cheap to share.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenCodec {
    /// Creates a codec signing with `secret` and issuing tokens valid for `ttl`.
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Creates a codec from token configuration.
    #[must_use]
    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(config.secret.as_bytes(), config.ttl)
    }

    /// Returns the lifetime of issued tokens.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `subject` valid from `now` until exactly `now + ttl`.
    ///
    /// # Errors
    /// Returns `TokenError::Encoding` if signing fails or the expiry is out of range.
    pub fn issue(&self, subject: &str, now: OffsetDateTime) -> Result<Token, TokenError> {
        self.issue_with_claims(subject, now).map(|(token, _)| token)
    }

    /// Issues a token and also returns the claims it carries.
    ///
    /// # Errors
    /// Returns `TokenError::Encoding` if signing fails or the expiry is out of range.
    pub fn issue_with_claims(
        &self,
        subject: &str,
        now: OffsetDateTime,
    ) -> Result<(Token, TokenClaims), TokenError> {
        let expires_at = time::Duration::try_from(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| TokenError::encoding("expiry is out of range"))?;

        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
            iat_nanos: now.nanosecond(),
            exp_nanos: expires_at.nanosecond(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let raw = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::encoding(e.to_string()))?;

        tracing::debug!(subject = %subject, jti = %claims.jti, exp = claims.exp, "Token issued");
        Ok((Token(raw), claims))
    }

    /// Decodes the claims without checking the signature or expiry.
    ///
    /// # Errors
    /// Returns `TokenError::Malformed` if the token is not a three-segment
    /// JWT whose payload deserializes into [`TokenClaims`].
    pub fn parse(&self, raw: &str) -> Result<TokenClaims, TokenError> {
        let mut segments = raw.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::malformed("expected three segments"));
        };

        if header.is_empty() || signature.is_empty() {
            return Err(TokenError::malformed("empty header or signature segment"));
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenError::malformed(format!("payload is not base64url: {e}")))?;
        let claims: TokenClaims = serde_json::from_slice(&bytes)
            .map_err(|e| TokenError::malformed(format!("invalid claims: {e}")))?;

        claims.check_timestamps()?;
        Ok(claims)
    }

    /// Verifies signature integrity and that `now` is before expiry.
    ///
    /// # Errors
    /// - `TokenError::Malformed` if the token cannot be decoded
    /// - `TokenError::InvalidSignature` if the signature does not match
    /// - `TokenError::Expired` if `now >= exp`
    pub fn validate(&self, raw: &str, now: OffsetDateTime) -> Result<TokenClaims, TokenError> {
        let claims = self.verify_allow_expired(raw)?;

        if claims.is_expired_at(now) {
            tracing::debug!(jti = %claims.jti, exp = claims.exp, "Token expired");
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Verifies signature integrity but ignores expiry.
    ///
    /// Used on logout, where an expired token is still a legitimate input.
    ///
    /// # Errors
    /// Returns `TokenError::Malformed` or `TokenError::InvalidSignature`.
    pub fn verify_allow_expired(&self, raw: &str) -> Result<TokenClaims, TokenError> {
        // Structural check first so malformed input never reports a signature error.
        self.parse(raw)?;

        // Expiry is judged against the caller's clock, not the library's.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        let data = decode::<TokenClaims>(raw, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &"HS256")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-that-is-long-enough-0123456789";

    fn at(seconds: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(seconds).unwrap()
    }

    fn codec(ttl_secs: u64) -> TokenCodec {
        TokenCodec::new(SECRET, Duration::from_secs(ttl_secs))
    }

    #[test]
    fn test_issue_and_validate() {
        let codec = codec(3600);
        let token = codec.issue("alice", at(1_000)).unwrap();

        let claims = codec.validate(token.as_str(), at(1_000)).unwrap();
        assert_eq!(claims.subject(), "alice");
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 4_600);
        assert_eq!(claims.issued_at(), at(1_000));
        assert_eq!(claims.expires_at(), at(4_600));
        assert!(!claims.jti().is_empty());
    }

    #[test]
    fn test_validity_window_boundaries() {
        let codec = codec(60);
        let token = codec.issue("alice", at(0)).unwrap();

        assert!(codec.validate(token.as_str(), at(0)).is_ok());
        assert!(codec.validate(token.as_str(), at(59)).is_ok());
        assert!(matches!(
            codec.validate(token.as_str(), at(60)),
            Err(TokenError::Expired)
        ));
        assert!(matches!(
            codec.validate(token.as_str(), at(61)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_tokens_are_unique_per_issue() {
        let codec = codec(60);
        let a = codec.issue("alice", at(0)).unwrap();
        let b = codec.issue("alice", at(0)).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = codec(60);
        let other = TokenCodec::new(
            b"another-secret-also-long-enough-9876543210",
            Duration::from_secs(60),
        );

        let token = issuer.issue("alice", at(0)).unwrap();
        assert!(matches!(
            other.validate(token.as_str(), at(1)),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let codec = codec(60);
        let token = codec.issue("alice", at(0)).unwrap();

        let segments: Vec<&str> = token.as_str().split('.').collect();
        let forged_claims = TokenClaims {
            sub: "mallory".to_string(),
            iat: 0,
            exp: 60,
            iat_nanos: 0,
            exp_nanos: 0,
            jti: "forged".to_string(),
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", segments[0], forged_payload, segments[2]);

        // Structurally fine, so parse succeeds...
        assert_eq!(codec.parse(&forged).unwrap().subject(), "mallory");
        // ...but the signature no longer matches.
        assert!(matches!(
            codec.validate(&forged, at(1)),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        let issuer = codec(60);
        let other = TokenCodec::new(
            b"another-secret-also-long-enough-9876543210",
            Duration::from_secs(60),
        );

        let token = issuer.issue("alice", at(0)).unwrap();
        assert!(matches!(
            other.validate(token.as_str(), at(500)),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_inputs() {
        let codec = codec(60);
        for raw in [
            "",
            "not-a-token",
            "a.b",
            "a.b.c.d",
            ".payload.sig",
            "header.!!!.sig",
            "eyJhbGciOiJIUzI1NiJ9.e30.sig",
        ] {
            assert!(
                matches!(codec.parse(raw), Err(TokenError::Malformed { .. })),
                "parse should reject {raw:?}"
            );
            assert!(
                matches!(codec.validate(raw, at(0)), Err(TokenError::Malformed { .. })),
                "validate should reject {raw:?}"
            );
        }
    }

    #[test]
    fn test_out_of_range_timestamp_is_malformed() {
        let codec = codec(60);
        let claims = serde_json::json!({
            "sub": "alice",
            "iat": 0,
            "exp": i64::MAX,
            "jti": "x",
        });
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let raw = format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2ln");
        assert!(matches!(
            codec.parse(&raw),
            Err(TokenError::Malformed { .. })
        ));
    }

    #[test]
    fn test_parse_ignores_expiry() {
        let codec = codec(60);
        let token = codec.issue("alice", at(0)).unwrap();
        let claims = codec.parse(token.as_str()).unwrap();
        assert_eq!(claims.exp, 60);
        assert!(claims.is_expired_at(at(1_000)));
    }

    #[test]
    fn test_verify_allow_expired() {
        let codec = codec(60);
        let token = codec.issue("alice", at(0)).unwrap();

        assert!(codec.validate(token.as_str(), at(1_000)).is_err());
        let claims = codec.verify_allow_expired(token.as_str()).unwrap();
        assert_eq!(claims.subject(), "alice");
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let codec = codec(60);
        let token = codec.issue("alice", at(0)).unwrap();
        let debug = format!("{:?}", token);
        assert!(!debug.contains(token.as_str()));
    }

    #[test]
    fn test_sub_second_ttl_is_exact() {
        let codec = TokenCodec::new(SECRET, Duration::from_millis(10));
        let token = codec.issue("alice", at(0)).unwrap();
        assert!(codec.validate(token.as_str(), at(0)).is_ok());
        assert!(
            codec
                .validate(token.as_str(), at(0) + time::Duration::milliseconds(9))
                .is_ok()
        );
        assert!(matches!(
            codec.validate(token.as_str(), at(0) + time::Duration::milliseconds(10)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_fractional_issue_time_keeps_full_ttl() {
        let codec = codec(60);
        let issued = at(1_000) + time::Duration::milliseconds(900);
        let token = codec.issue("alice", issued).unwrap();

        let claims = codec.parse(token.as_str()).unwrap();
        assert_eq!(claims.issued_at(), issued);
        assert_eq!(claims.expires_at(), issued + time::Duration::seconds(60));

        let inside = issued + time::Duration::milliseconds(59_600);
        assert!(codec.validate(token.as_str(), inside).is_ok());

        let last = issued + time::Duration::seconds(60) - time::Duration::nanoseconds(1);
        assert!(codec.validate(token.as_str(), last).is_ok());

        assert!(matches!(
            codec.validate(token.as_str(), issued + time::Duration::seconds(60)),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_out_of_range_nanos_is_malformed() {
        let codec = codec(60);
        let claims = serde_json::json!({
            "sub": "alice",
            "iat": 0,
            "exp": 60,
            "exp_nanos": 1_000_000_000u32,
            "jti": "x",
        });
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let raw = format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2ln");
        assert!(matches!(
            codec.parse(&raw),
            Err(TokenError::Malformed { .. })
        ));
    }
}
