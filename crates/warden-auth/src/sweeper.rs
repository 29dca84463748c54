//! Background reclamation of expired revocations and idle lockout records.
//!
//! Both stores already ignore stale entries on lookup; the sweeper only
//! bounds their memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::lockout::LoginAttemptTracker;
use crate::token::TokenRevocationRegistry;

/// Spawns a task that periodically purges both stores.
///
/// Lockout records that are unlocked and have seen no failure for
/// `idle_record_ttl` are dropped. The task runs until aborted.
pub fn spawn_sweeper(
    revocations: Arc<TokenRevocationRegistry>,
    attempts: Arc<LoginAttemptTracker>,
    interval: Duration,
    idle_record_ttl: Duration,
) -> JoinHandle<()> {
    // tokio::time::interval panics on a zero period.
    let period = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);

        loop {
            ticker.tick().await;

            let revoked = revocations.purge_expired();
            let stale = attempts.purge_stale(idle_record_ttl);
            if revoked > 0 || stale > 0 {
                tracing::debug!(
                    revocations = revoked,
                    lockout_records = stale,
                    "Auth state sweep completed"
                );
            }
        }
    })
}
