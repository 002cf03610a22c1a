//! Channel sub-pool arithmetic.
//!
//! Holds no state of its own: every function reads or mutates an
//! `InventoryDay` that the ledger already has locked.

use crate::error::BookingError;
use crate::model::{Channel, InventoryDay};

/// Rooms the channel may sell on this day.
///
/// Without a sub-pool the channel draws from the shared pool. With one it is
/// capped by both pools, and a stop-sold sub-pool yields zero.
pub fn allocate(day: &InventoryDay, channel: Channel) -> i32 {
    match day.channel_restrictions.get(&channel) {
        None => day.available_rooms(),
        Some(pool) if pool.stop_sell => 0,
        Some(pool) => pool.available_rooms.min(day.available_rooms()).max(0),
    }
}

/// Phase-one check for a reservation of `quantity` rooms on one night.
///
/// The shared pool is checked first (counting overbooking), so `SoldOut` wins
/// over `ChannelAllocationExhausted` when both apply.
pub(crate) fn check_capacity(
    day: &InventoryDay,
    channel: Channel,
    quantity: i32,
) -> Result<(), BookingError> {
    if quantity > day.sellable_rooms() {
        return Err(BookingError::SoldOut { date: day.date });
    }
    if let Some(pool) = day.channel_restrictions.get(&channel)
        && (pool.stop_sell || quantity > pool.available_rooms)
    {
        return Err(BookingError::ChannelAllocationExhausted { channel, date: day.date });
    }
    Ok(())
}

/// Phase-two commit. Caller has already run `check_capacity` under the same lock.
pub(crate) fn consume(day: &mut InventoryDay, channel: Channel, quantity: i32) {
    day.sold_rooms += quantity;
    if let Some(pool) = day.channel_restrictions.get_mut(&channel) {
        pool.available_rooms -= quantity;
    }
}

/// Reverse of `consume`. A sub-pool cleared since the reservation is left alone.
pub(crate) fn restore(day: &mut InventoryDay, channel: Channel, quantity: i32) {
    day.sold_rooms = (day.sold_rooms - quantity).max(0);
    if let Some(pool) = day.channel_restrictions.get_mut(&channel) {
        pool.available_rooms += quantity;
    }
}
