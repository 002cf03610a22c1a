use tokio::sync::OwnedRwLockWriteGuard;
use tokio::time::Instant;

use crate::error::BookingError;
use crate::model::{DayKey, InventoryDay};

use super::Ledger;

enum LockFailure {
    Failed(BookingError),
    TimedOut,
}

impl Ledger {
    /// Acquire write guards for `keys` in ascending key order.
    ///
    /// Each attempt waits at most `lock_timeout` per night (less if the
    /// deadline is closer). A timed-out attempt drops every guard it took,
    /// backs off and retries; once the attempt budget is spent the caller gets
    /// `Contention`. A deadline already past fails before any lock is taken.
    pub(super) async fn lock_days(
        &self,
        keys: &[DayKey],
        deadline: Option<Instant>,
    ) -> Result<Vec<OwnedRwLockWriteGuard<InventoryDay>>, BookingError> {
        let mut sorted = keys.to_vec();
        sorted.sort();
        sorted.dedup();

        let mut backoff = self.config.lock_backoff;
        let attempts = self.config.lock_attempts.max(1);
        for attempt in 1..=attempts {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(BookingError::DeadlineExceeded);
            }
            match self.try_lock_all(&sorted, deadline).await {
                Ok(guards) => return Ok(guards),
                Err(LockFailure::Failed(e)) => return Err(e),
                Err(LockFailure::TimedOut) => {
                    metrics::counter!(crate::observability::LOCK_TIMEOUTS_TOTAL).increment(1);
                    tracing::warn!(
                        "lock attempt {attempt}/{attempts} timed out on {} nights",
                        sorted.len()
                    );
                    if attempt < attempts {
                        tokio::time::sleep(backoff).await;
                        backoff = backoff.saturating_mul(2);
                    }
                }
            }
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(BookingError::DeadlineExceeded);
        }
        Err(BookingError::Contention)
    }

    async fn try_lock_all(
        &self,
        sorted: &[DayKey],
        deadline: Option<Instant>,
    ) -> Result<Vec<OwnedRwLockWriteGuard<InventoryDay>>, LockFailure> {
        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            let shared = match self.day_slot(key).await {
                Ok(Some(shared)) => shared,
                Ok(None) => {
                    return Err(LockFailure::Failed(BookingError::DayNotFound {
                        room_type: key.room_type,
                        date: key.date,
                    }));
                }
                Err(e) => return Err(LockFailure::Failed(e)),
            };
            let wait = match deadline {
                Some(d) => self
                    .config
                    .lock_timeout
                    .min(d.saturating_duration_since(Instant::now())),
                None => self.config.lock_timeout,
            };
            match tokio::time::timeout(wait, shared.write_owned()).await {
                Ok(guard) => guards.push(guard),
                // Dropping `guards` releases everything taken so far.
                Err(_) => return Err(LockFailure::TimedOut),
            }
        }
        Ok(guards)
    }
}
