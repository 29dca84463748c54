//! Token revocation registry.
//!
//! Tracks tokens that were revoked (logged out) before their natural
//! expiry. An entry only has to live until the token it names would have
//! expired anyway; after that the token fails validation on its own, so
//! the entry is dropped either lazily on lookup or by [`TokenRevocationRegistry::purge_expired`].
//!
//! # Security Considerations
//!
//! - Entries are keyed by a SHA-256 digest of the raw token; the token
//!   itself is never retained
//! - Lookups are O(1) and take only a shard-level lock
//! - Revoking the same token twice is idempotent

use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::clock::Clock;

/// Computes the registry key for a raw token.
#[must_use]
pub fn revocation_key(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}

/// In-process registry of revoked, not-yet-expired tokens.
#[derive(Debug)]
pub struct TokenRevocationRegistry {
    /// Token digest -> the token's own expiry.
    entries: DashMap<String, OffsetDateTime>,
    clock: Arc<dyn Clock>,
}

impl TokenRevocationRegistry {
    /// Creates an empty registry reading time from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Marks `raw_token` as revoked until `expires_at`.
    ///
    /// Idempotent: revoking an already-revoked token keeps it revoked and
    /// never shortens its retention. A token that is already past
    /// `expires_at` is not recorded, since it can no longer validate.
    pub fn revoke(&self, raw_token: &str, expires_at: OffsetDateTime) {
        let now = self.clock.now();
        let key = revocation_key(raw_token);

        if expires_at <= now {
            tracing::debug!(key = %&key[..12], "Skipping revocation of expired token");
            return;
        }

        self.entries
            .entry(key)
            .and_modify(|existing| {
                if expires_at > *existing {
                    *existing = expires_at;
                }
            })
            .or_insert(expires_at);
    }

    /// Returns `true` if `raw_token` is revoked and not yet expired.
    ///
    /// An entry found past its expiry is removed and reported as absent.
    #[must_use]
    pub fn is_revoked(&self, raw_token: &str) -> bool {
        let now = self.clock.now();
        let key = revocation_key(raw_token);

        let Some(expires_at) = self.entries.get(&key).map(|entry| *entry.value()) else {
            return false;
        };

        if expires_at > now {
            return true;
        }

        // Re-check under the shard lock; a concurrent revoke may have extended it.
        self.entries
            .remove_if(&key, |_, expires_at| *expires_at <= now);
        false
    }

    /// Removes every entry whose token has expired.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.entries.retain(|_, expires_at| {
            if *expires_at <= now {
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "Purged expired revocations");
        }

        removed
    }

    /// Returns the number of entries currently held, including any that
    /// expired but have not been reclaimed yet.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the registry holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;

    fn setup() -> (Arc<ManualClock>, TokenRevocationRegistry) {
        let clock = Arc::new(ManualClock::at_unix(1_000));
        let registry = TokenRevocationRegistry::new(clock.clone());
        (clock, registry)
    }

    fn at(seconds: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(seconds).unwrap()
    }

    #[test]
    fn test_revoke_then_is_revoked() {
        let (_, registry) = setup();
        assert!(!registry.is_revoked("token-a"));

        registry.revoke("token-a", at(2_000));
        assert!(registry.is_revoked("token-a"));
        assert!(!registry.is_revoked("token-b"));
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let (_, registry) = setup();
        registry.revoke("token-a", at(2_000));
        registry.revoke("token-a", at(2_000));

        assert!(registry.is_revoked("token-a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_second_revoke_never_shortens_retention() {
        let (clock, registry) = setup();
        registry.revoke("token-a", at(3_000));
        registry.revoke("token-a", at(1_500));

        clock.set(at(2_000));
        assert!(registry.is_revoked("token-a"));
    }

    #[test]
    fn test_entry_lapses_at_expiry() {
        let (clock, registry) = setup();
        registry.revoke("token-a", at(1_060));

        clock.advance(Duration::from_secs(59));
        assert!(registry.is_revoked("token-a"));

        clock.advance(Duration::from_secs(1));
        assert!(!registry.is_revoked("token-a"));
        // Lazily reclaimed by the lookup.
        assert!(registry.is_empty());
    }

    #[test]
    fn test_already_expired_token_not_recorded() {
        let (_, registry) = setup();
        registry.revoke("token-a", at(1_000));
        registry.revoke("token-b", at(10));

        assert!(registry.is_empty());
        assert!(!registry.is_revoked("token-a"));
    }

    #[test]
    fn test_purge_expired() {
        let (clock, registry) = setup();
        registry.revoke("short-1", at(1_010));
        registry.revoke("short-2", at(1_020));
        registry.revoke("long", at(5_000));
        assert_eq!(registry.len(), 3);

        clock.set(at(1_020));
        assert_eq!(registry.purge_expired(), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_revoked("long"));

        assert_eq!(registry.purge_expired(), 0);
    }

    #[test]
    fn test_key_is_stable_digest() {
        let key = revocation_key("token-a");
        assert_eq!(key.len(), 64);
        assert_eq!(key, revocation_key("token-a"));
        assert_ne!(key, revocation_key("token-b"));
        assert!(!key.contains("token-a"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_revocations() {
        let (_, registry) = setup();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry.revoke(&format!("token-{}", i % 8), at(2_000));
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.len(), 8);
        for i in 0..8 {
            assert!(registry.is_revoked(&format!("token-{i}")));
        }
    }
}
