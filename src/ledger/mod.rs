mod locking;
mod mutations;
mod queries;

pub use mutations::DayTemplate;
pub(crate) use mutations::{validate_quantity, validate_stay};

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::config::LedgerConfig;
use crate::error::BookingError;
use crate::model::*;
use crate::notify::{ChangeCause, InventoryChange, NotifyHub};
use crate::store::{InMemoryStore, InventoryStore, ReservationWrite, StoreCommit};

pub type SharedDay = Arc<RwLock<InventoryDay>>;

/// Date-indexed room inventory over an [`InventoryStore`].
///
/// Each night a request touches is loaded once into its own `RwLock`, which
/// is both the lock table entry and the working copy. Writers lock the nights
/// they touch in date order, commit the new state to the store, and only then
/// replace the locked copies. The ledger must be the store's only writer.
pub struct Ledger {
    pub(super) days: DashMap<DayKey, SharedDay>,
    pub(super) store: Arc<dyn InventoryStore>,
    pub(super) horizon_lock: tokio::sync::Mutex<()>,
    pub(super) config: LedgerConfig,
    pub notify: Arc<NotifyHub>,
}

impl Ledger {
    pub fn new(store: Arc<dyn InventoryStore>, config: LedgerConfig) -> Self {
        Self {
            days: DashMap::new(),
            store,
            horizon_lock: tokio::sync::Mutex::new(()),
            config,
            notify: Arc::new(NotifyHub::new()),
        }
    }

    /// Ledger over a fresh [`InMemoryStore`].
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), config)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn InventoryStore> {
        &self.store
    }

    /// The lock slot for `key`, loading the day from the store on first use.
    /// `None` if the store has no such day.
    pub(super) async fn day_slot(&self, key: &DayKey) -> Result<Option<SharedDay>, BookingError> {
        if let Some(slot) = self.days.get(key) {
            return Ok(Some(slot.value().clone()));
        }
        let Some(day) = self.store.load_day(*key).await? else {
            return Ok(None);
        };
        // A racing loader may have won; its copy is the one writers lock.
        let slot = self
            .days
            .entry(*key)
            .or_insert_with(|| Arc::new(RwLock::new(day)))
            .value()
            .clone();
        metrics::gauge!(crate::observability::DAYS_LOADED).set(self.days.len() as f64);
        Ok(Some(slot))
    }

    /// Store + apply + notify in one call.
    ///
    /// `next` holds the new state of each guarded night, in guard order. The
    /// store commit happens first; if it fails the guarded copies are left as
    /// they were and the error is returned.
    pub(super) async fn commit_nights(
        &self,
        room_type: RoomTypeKey,
        guards: &mut [OwnedRwLockWriteGuard<InventoryDay>],
        next: Vec<InventoryDay>,
        reservation: Option<ReservationWrite>,
        cause: ChangeCause,
    ) -> Result<(), BookingError> {
        debug_assert_eq!(guards.len(), next.len());
        let commit = StoreCommit { days: next, room_type, reservation };

        let started = std::time::Instant::now();
        let stored = self.store.commit(&commit).await;
        metrics::histogram!(crate::observability::STORE_COMMIT_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        if let Err(e) = stored {
            metrics::counter!(crate::observability::STORE_COMMIT_FAILURES_TOTAL).increment(1);
            tracing::warn!("store commit for {room_type} failed: {e}");
            return Err(e);
        }

        for (guard, day) in guards.iter_mut().zip(&commit.days) {
            **guard = day.clone();
        }
        if self.notify.is_watched(&room_type) {
            self.notify.publish(InventoryChange { room_type, cause, days: commit.days });
        }
        Ok(())
    }
}
