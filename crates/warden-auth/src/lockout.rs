//! Failed-login tracking and temporary account lockout.
//!
//! Each username owns one [`LockoutRecord`]. Every update to a record runs
//! under the map's shard lock for that key, so concurrent failures for the
//! same account never lose a count and only one of them observes the
//! unlocked-to-locked transition.
//!
//! An absent record reads as "no failures, not locked".

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use time::OffsetDateTime;
use time::macros::datetime;

use crate::clock::Clock;
use crate::config::LockoutConfig;

/// Deadline used when a lock window cannot be represented.
const FAR_FUTURE: OffsetDateTime = datetime!(9999-12-31 0:00 UTC);

/// Per-username failure state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LockoutRecord {
    failure_count: u32,
    locked_until: Option<OffsetDateTime>,
    last_failure_at: Option<OffsetDateTime>,
}

impl LockoutRecord {
    fn is_locked_at(&self, now: OffsetDateTime) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}

/// Result of recording one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    /// Failure count after this attempt.
    pub attempts: u32,
    /// Lock deadline after this attempt, if any.
    pub locked_until: Option<OffsetDateTime>,
    /// `true` only for the attempt that moved the account from unlocked to locked.
    pub newly_locked: bool,
}

/// Read-only snapshot of a username's lockout state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutInfo {
    /// Account the snapshot describes.
    pub username: String,
    /// Consecutive failures since the last successful login.
    pub attempts: u32,
    /// End of the current or most recent lock, if one was ever set.
    pub lock_until: Option<OffsetDateTime>,
}

impl LockoutInfo {
    /// Returns `true` if the lock is still in force at `now`.
    #[must_use]
    pub fn is_locked_at(&self, now: OffsetDateTime) -> bool {
        self.lock_until.is_some_and(|until| now < until)
    }

    /// Time left on the lock at `now`, or zero when not locked.
    #[must_use]
    pub fn remaining_lock_time(&self, now: OffsetDateTime) -> Duration {
        self.lock_until
            .map_or(Duration::ZERO, |until| remaining_until(until, now))
    }
}

/// Tracks failed logins per username and decides lockouts.
#[derive(Debug)]
pub struct LoginAttemptTracker {
    records: DashMap<String, LockoutRecord>,
    policy: LockoutConfig,
    clock: Arc<dyn Clock>,
}

impl LoginAttemptTracker {
    /// Creates an empty tracker applying `policy`.
    #[must_use]
    pub fn new(policy: LockoutConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            policy,
            clock,
        }
    }

    /// Returns the lockout policy in force.
    #[must_use]
    pub fn policy(&self) -> &LockoutConfig {
        &self.policy
    }

    /// Records one failed login for `username`.
    ///
    /// The increment and any resulting lock are applied atomically. Once the
    /// failure count reaches the configured threshold the account is locked
    /// for the policy window; a new deadline never moves an existing one
    /// earlier.
    pub fn record_failed_attempt(&self, username: &str) -> FailureOutcome {
        let now = self.clock.now();

        let outcome = {
            let mut record = self.records.entry(username.to_owned()).or_default();
            let was_locked = record.is_locked_at(now);

            record.failure_count = record.failure_count.saturating_add(1);
            record.last_failure_at = Some(now);

            if let Some(window) = self.policy.window_for(record.failure_count) {
                let deadline = deadline_after(now, window);
                record.locked_until = Some(match record.locked_until {
                    Some(existing) if existing > deadline => existing,
                    _ => deadline,
                });
            }

            FailureOutcome {
                attempts: record.failure_count,
                locked_until: record.locked_until,
                newly_locked: !was_locked && record.is_locked_at(now),
            }
        };

        if outcome.newly_locked {
            tracing::warn!(
                username = %username,
                attempts = outcome.attempts,
                locked_until = ?outcome.locked_until,
                "Account locked after repeated failed logins"
            );
        } else {
            tracing::debug!(
                username = %username,
                attempts = outcome.attempts,
                "Failed login recorded"
            );
        }

        outcome
    }

    /// Resets the failure count and lifts any lock for `username`.
    pub fn clear_attempts(&self, username: &str) {
        if let Some((_, record)) = self.records.remove(username) {
            if record.is_locked_at(self.clock.now()) {
                tracing::info!(username = %username, "Account lock cleared");
            }
        }
    }

    /// Returns `true` while `username` is inside a lock window.
    #[must_use]
    pub fn is_account_locked(&self, username: &str) -> bool {
        let now = self.clock.now();
        self.records
            .get(username)
            .is_some_and(|record| record.is_locked_at(now))
    }

    /// Returns a snapshot of the lockout state for `username`.
    #[must_use]
    pub fn get_lockout_info(&self, username: &str) -> LockoutInfo {
        let record = self
            .records
            .get(username)
            .map(|record| *record.value())
            .unwrap_or_default();

        LockoutInfo {
            username: username.to_owned(),
            attempts: record.failure_count,
            lock_until: record.locked_until,
        }
    }

    /// Time left on the lock for `username`, or zero when not locked.
    #[must_use]
    pub fn remaining_lock_time(&self, username: &str) -> Duration {
        self.get_lockout_info(username)
            .remaining_lock_time(self.clock.now())
    }

    /// Drops records that are not locked and have seen no failure for `idle`.
    ///
    /// Returns the number of records removed.
    pub fn purge_stale(&self, idle: Duration) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.records.retain(|_, record| {
            let idle_expired = record
                .last_failure_at
                .is_none_or(|last| remaining_until(deadline_after(last, idle), now).is_zero());
            if !record.is_locked_at(now) && idle_expired {
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            tracing::debug!(removed, remaining = self.records.len(), "Purged stale lockout records");
        }

        removed
    }

    /// Number of usernames with a live record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn deadline_after(start: OffsetDateTime, window: Duration) -> OffsetDateTime {
    time::Duration::try_from(window)
        .ok()
        .and_then(|window| start.checked_add(window))
        .unwrap_or(FAR_FUTURE)
}

fn remaining_until(deadline: OffsetDateTime, now: OffsetDateTime) -> Duration {
    Duration::try_from(deadline - now).unwrap_or(Duration::ZERO)
}

// =============================================================================
// Tests
// =============================================================================
