//! Backing storage for inventory days and the reservation registry.
//!
//! The ledger owns locking and validation; a store only has to load what it
//! was given and make each [`StoreCommit`] durable as one unit. A store is
//! written by exactly one ledger.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use ulid::Ulid;

use crate::error::BookingError;
use crate::model::{DayKey, InventoryDay, ReservationRecord, RoomTypeKey};

/// Registry change committed alongside the nights it affects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationWrite {
    Insert(ReservationRecord),
    Remove(Ulid),
}

/// Post-mutation state of every touched night plus at most one registry change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCommit {
    pub days: Vec<InventoryDay>,
    pub room_type: RoomTypeKey,
    pub reservation: Option<ReservationWrite>,
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn load_day(&self, key: DayKey) -> Result<Option<InventoryDay>, BookingError>;

    /// Insert new days. Fails with `AlreadyExists` on the first date already
    /// present, in which case nothing is inserted.
    async fn create_days(
        &self,
        room_type: RoomTypeKey,
        days: &[InventoryDay],
    ) -> Result<(), BookingError>;

    /// Persist every day and the registry change together, or none of it.
    async fn commit(&self, commit: &StoreCommit) -> Result<(), BookingError>;

    async fn load_reservation(&self, token: Ulid) -> Result<Option<ReservationRecord>, BookingError>;

    /// Opened dates for a room type, ascending.
    async fn dates(&self, room_type: RoomTypeKey) -> Result<Vec<NaiveDate>, BookingError>;

    async fn day_count(&self) -> Result<usize, BookingError>;

    async fn reservation_count(&self) -> Result<usize, BookingError>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryStore {
    days: DashMap<DayKey, InventoryDay>,
    reservations: DashMap<Ulid, ReservationRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn load_day(&self, key: DayKey) -> Result<Option<InventoryDay>, BookingError> {
        Ok(self.days.get(&key).map(|e| e.value().clone()))
    }

    async fn create_days(
        &self,
        room_type: RoomTypeKey,
        days: &[InventoryDay],
    ) -> Result<(), BookingError> {
        if let Some(existing) = days
            .iter()
            .find(|day| self.days.contains_key(&room_type.day(day.date)))
        {
            return Err(BookingError::AlreadyExists { date: existing.date });
        }
        for day in days {
            self.days.insert(room_type.day(day.date), day.clone());
        }
        Ok(())
    }

    async fn commit(&self, commit: &StoreCommit) -> Result<(), BookingError> {
        for day in &commit.days {
            self.days.insert(commit.room_type.day(day.date), day.clone());
        }
        match &commit.reservation {
            Some(ReservationWrite::Insert(record)) => {
                self.reservations.insert(record.token, record.clone());
            }
            Some(ReservationWrite::Remove(token)) => {
                self.reservations.remove(token);
            }
            None => {}
        }
        Ok(())
    }

    async fn load_reservation(&self, token: Ulid) -> Result<Option<ReservationRecord>, BookingError> {
        Ok(self.reservations.get(&token).map(|e| e.value().clone()))
    }

    async fn dates(&self, room_type: RoomTypeKey) -> Result<Vec<NaiveDate>, BookingError> {
        let mut dates: Vec<NaiveDate> = self
            .days
            .iter()
            .filter(|e| e.key().room_type == room_type)
            .map(|e| e.key().date)
            .collect();
        dates.sort();
        Ok(dates)
    }

    async fn day_count(&self) -> Result<usize, BookingError> {
        Ok(self.days.len())
    }

    async fn reservation_count(&self) -> Result<usize, BookingError> {
        Ok(self.reservations.len())
    }
}
