//! Token issuance, validation, and revocation.
//!
//! This module provides:
//!
//! - Signed, self-contained session tokens ([`TokenCodec`])
//! - The registry of tokens revoked before expiry ([`TokenRevocationRegistry`])

pub mod jwt;
pub mod revocation;

pub use jwt::{Token, TokenClaims, TokenCodec, TokenError};
pub use revocation::{TokenRevocationRegistry, revocation_key};
