use chrono::NaiveDate;

use crate::channel;
use crate::error::BookingError;
use crate::model::*;

use super::mutations::validate_stay;
use super::Ledger;

impl Ledger {
    /// Snapshot of one day. `DayNotFound` outside the opened horizon.
    pub async fn get_availability(
        &self,
        room_type: RoomTypeKey,
        date: NaiveDate,
    ) -> Result<InventoryDay, BookingError> {
        let shared = self
            .day_slot(&room_type.day(date))
            .await?
            .ok_or(BookingError::DayNotFound { room_type, date })?;
        let guard = shared.read().await;
        Ok(guard.clone())
    }

    /// Snapshot of every night of `stay`, in stay order. Nights are read one at
    /// a time, so the set is not a single consistent cut; writers re-validate
    /// under their own locks.
    pub async fn get_range(
        &self,
        room_type: RoomTypeKey,
        stay: StayRange,
    ) -> Result<Vec<InventoryDay>, BookingError> {
        validate_stay(&stay)?;
        let mut nights = Vec::with_capacity(stay.nights() as usize);
        for date in stay.dates() {
            nights.push(self.get_availability(room_type, date).await?);
        }
        Ok(nights)
    }

    /// Rooms `channel` may sell on `date`.
    pub async fn channel_availability(
        &self,
        room_type: RoomTypeKey,
        date: NaiveDate,
        channel: Channel,
    ) -> Result<i32, BookingError> {
        let day = self.get_availability(room_type, date).await?;
        Ok(channel::allocate(&day, channel))
    }

    pub async fn occupancy_rate(
        &self,
        room_type: RoomTypeKey,
        date: NaiveDate,
    ) -> Result<f64, BookingError> {
        Ok(self.get_availability(room_type, date).await?.occupancy_rate())
    }

    /// The active reservation behind `token`, if it has not been released.
    pub async fn reservation(
        &self,
        token: ReservationToken,
    ) -> Result<Option<ReservationRecord>, BookingError> {
        self.store.load_reservation(token.0).await
    }

    /// Every opened date for a room type, ascending.
    pub async fn horizon(&self, room_type: RoomTypeKey) -> Result<Vec<NaiveDate>, BookingError> {
        self.store.dates(room_type).await
    }

    pub async fn day_count(&self) -> Result<usize, BookingError> {
        self.store.day_count().await
    }

    pub async fn active_reservations(&self) -> Result<usize, BookingError> {
        self.store.reservation_count().await
    }
}
