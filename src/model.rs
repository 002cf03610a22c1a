use std::collections::BTreeMap;
use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::BookingError;

/// A room type at a hotel: the unit that owns an inventory horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoomTypeKey {
    pub hotel_id: Ulid,
    pub room_type_id: Ulid,
}

impl RoomTypeKey {
    pub fn new(hotel_id: Ulid, room_type_id: Ulid) -> Self {
        Self { hotel_id, room_type_id }
    }

    pub fn day(&self, date: NaiveDate) -> DayKey {
        DayKey { room_type: *self, date }
    }
}

impl fmt::Display for RoomTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.hotel_id, self.room_type_id)
    }
}

/// Ledger key. Ordering is (room type, date), so sorting a stay's keys yields
/// ascending dates, which is the lock acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayKey {
    pub room_type: RoomTypeKey,
    pub date: NaiveDate,
}

/// Half-open night range `[check_in, check_out)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    /// Checked constructor for caller-supplied dates.
    pub fn try_new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, BookingError> {
        if check_out <= check_in {
            return Err(BookingError::Validation("check_out must be after check_in"));
        }
        Ok(Self { check_in, check_out })
    }

    /// For dates already known to be ordered. Use `try_new` on request input.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        debug_assert!(check_in < check_out, "check_in must be before check_out");
        Self { check_in, check_out }
    }

    /// A range is valid once it holds at least one night.
    pub fn is_valid(&self) -> bool {
        self.check_in < self.check_out
    }

    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days().max(0) as u32
    }

    /// Every night of the stay in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.check_in
            .iter_days()
            .take_while(move |d| *d < self.check_out)
    }

    /// The last night slept, i.e. the day before departure.
    pub fn last_night(&self) -> NaiveDate {
        self.check_out
            .checked_sub_days(Days::new(1))
            .unwrap_or(self.check_in)
    }
}

/// Closed set of distribution channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Direct,
    Ota,
    Gds,
    Corporate,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Channel::Direct => "direct",
            Channel::Ota => "ota",
            Channel::Gds => "gds",
            Channel::Corporate => "corporate",
        };
        f.write_str(s)
    }
}

/// Per-channel sub-pool on a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAllocation {
    pub stop_sell: bool,
    pub available_rooms: i32,
}

/// Sellability controls attached to a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Restrictions {
    pub overbooking_limit: i32,
    pub minimum_stay: u32,
    pub maximum_stay: Option<u32>,
    pub stop_sell: bool,
    pub closed_to_arrival: bool,
    pub closed_to_departure: bool,
}

impl Default for Restrictions {
    fn default() -> Self {
        Self {
            overbooking_limit: 0,
            minimum_stay: 1,
            maximum_stay: None,
            stop_sell: false,
            closed_to_arrival: false,
            closed_to_departure: false,
        }
    }
}

/// Signed change to the non-reservation buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketDelta {
    pub blocked: i32,
    pub out_of_order: i32,
    pub complimentary: i32,
    pub house_use: i32,
}

impl BucketDelta {
    /// Largest absolute change across the four buckets.
    pub fn magnitude(&self) -> u32 {
        [self.blocked, self.out_of_order, self.complimentary, self.house_use]
            .iter()
            .map(|v| v.unsigned_abs())
            .max()
            .unwrap_or(0)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// The unit of ledger state for one room type on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDay {
    pub date: NaiveDate,
    pub total_inventory: i32,
    pub sold_rooms: i32,
    pub blocked_rooms: i32,
    pub out_of_order_rooms: i32,
    pub complimentary_rooms: i32,
    pub house_use_rooms: i32,
    pub restrictions: Restrictions,
    pub channel_restrictions: BTreeMap<Channel, ChannelAllocation>,
}

impl InventoryDay {
    pub fn new(date: NaiveDate, total_inventory: i32) -> Self {
        Self {
            date,
            total_inventory,
            sold_rooms: 0,
            blocked_rooms: 0,
            out_of_order_rooms: 0,
            complimentary_rooms: 0,
            house_use_rooms: 0,
            restrictions: Restrictions::default(),
            channel_restrictions: BTreeMap::new(),
        }
    }

    /// Sum of every allocation bucket.
    pub fn allocated(&self) -> i32 {
        self.sold_rooms
            .saturating_add(self.blocked_rooms)
            .saturating_add(self.out_of_order_rooms)
            .saturating_add(self.complimentary_rooms)
            .saturating_add(self.house_use_rooms)
    }

    /// Signed headroom against nominal capacity. Negative once overbooked.
    pub fn net_available(&self) -> i32 {
        self.total_inventory - self.allocated()
    }

    /// Display value, floored at zero.
    pub fn available_rooms(&self) -> i32 {
        self.net_available().max(0)
    }

    /// Rooms that may still be sold, counting the overbooking allowance.
    pub fn sellable_rooms(&self) -> i32 {
        (self.net_available() + self.restrictions.overbooking_limit).max(0)
    }

    /// `allocated ≤ total_inventory + overbooking_limit`, with no negative bucket.
    pub fn invariant_holds(&self) -> bool {
        let buckets = [
            self.sold_rooms,
            self.blocked_rooms,
            self.out_of_order_rooms,
            self.complimentary_rooms,
            self.house_use_rooms,
        ];
        // Summed in i64 so no combination of i32 buckets can wrap.
        let allocated: i64 = buckets.iter().map(|b| i64::from(*b)).sum();
        let ceiling = i64::from(self.total_inventory) + i64::from(self.restrictions.overbooking_limit);
        buckets.iter().all(|b| *b >= 0) && allocated <= ceiling
    }

    /// Saturates instead of wrapping; a saturated bucket fails `invariant_holds`.
    pub fn apply_delta(&mut self, delta: &BucketDelta) {
        self.blocked_rooms = self.blocked_rooms.saturating_add(delta.blocked);
        self.out_of_order_rooms = self.out_of_order_rooms.saturating_add(delta.out_of_order);
        self.complimentary_rooms = self.complimentary_rooms.saturating_add(delta.complimentary);
        self.house_use_rooms = self.house_use_rooms.saturating_add(delta.house_use);
    }

    /// Sold plus comp plus house use over sellable physical rooms, in `[0, 1]`.
    pub fn occupancy_rate(&self) -> f64 {
        let usable = self.total_inventory - self.out_of_order_rooms;
        if usable <= 0 {
            return 1.0;
        }
        let occupied = self.sold_rooms + self.complimentary_rooms + self.house_use_rooms;
        (occupied as f64 / usable as f64).clamp(0.0, 1.0)
    }
}

/// Active reservation held by the ledger, addressed by its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub token: Ulid,
    pub room_type: RoomTypeKey,
    pub stay: StayRange,
    pub channel: Channel,
    pub quantity: i32,
}

/// Opaque handle returned by a successful reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationToken(pub Ulid);

impl fmt::Display for ReservationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn stay_range_nights_and_dates() {
        let stay = StayRange::new(d(2027, 3, 30), d(2027, 4, 2));
        assert_eq!(stay.nights(), 3);
        let dates: Vec<_> = stay.dates().collect();
        assert_eq!(dates, vec![d(2027, 3, 30), d(2027, 3, 31), d(2027, 4, 1)]);
        assert_eq!(stay.last_night(), d(2027, 4, 1));
    }

    #[test]
    fn day_keys_sort_by_date_within_room_type() {
        let rt = RoomTypeKey::new(Ulid::new(), Ulid::new());
        let mut keys = vec![rt.day(d(2027, 1, 3)), rt.day(d(2027, 1, 1)), rt.day(d(2027, 1, 2))];
        keys.sort();
        let dates: Vec<_> = keys.iter().map(|k| k.date).collect();
        assert_eq!(dates, vec![d(2027, 1, 1), d(2027, 1, 2), d(2027, 1, 3)]);
    }

    #[test]
    fn available_rooms_is_derived_and_floored() {
        let mut day = InventoryDay::new(d(2027, 5, 1), 10);
        day.sold_rooms = 7;
        assert_eq!(day.available_rooms(), 3);

        day.restrictions.overbooking_limit = 2;
        day.sold_rooms = 11;
        assert_eq!(day.net_available(), -1);
        assert_eq!(day.available_rooms(), 0);
        assert_eq!(day.sellable_rooms(), 1);
        assert!(day.invariant_holds());

        day.sold_rooms = 13;
        assert!(!day.invariant_holds());
    }

    #[test]
    fn negative_bucket_breaks_invariant() {
        let mut day = InventoryDay::new(d(2027, 5, 1), 10);
        day.apply_delta(&BucketDelta { blocked: -1, ..Default::default() });
        assert!(!day.invariant_holds());
    }

    #[test]
    fn occupancy_excludes_out_of_order_from_denominator() {
        let mut day = InventoryDay::new(d(2027, 5, 1), 10);
        day.sold_rooms = 4;
        day.complimentary_rooms = 1;
        day.out_of_order_rooms = 5;
        assert_eq!(day.occupancy_rate(), 1.0);

        day.out_of_order_rooms = 0;
        assert_eq!(day.occupancy_rate(), 0.5);
    }

    #[test]
    fn try_new_rejects_empty_and_inverted_ranges() {
        assert!(StayRange::try_new(d(2027, 3, 1), d(2027, 3, 2)).is_ok());
        for (check_in, check_out) in [(d(2027, 3, 2), d(2027, 3, 2)), (d(2027, 3, 3), d(2027, 3, 1))] {
            assert!(matches!(
                StayRange::try_new(check_in, check_out),
                Err(BookingError::Validation(_))
            ));
        }
        let inverted = StayRange { check_in: d(2027, 3, 3), check_out: d(2027, 3, 1) };
        assert!(!inverted.is_valid());
        assert_eq!(inverted.nights(), 0);
    }

    #[test]
    fn huge_delta_saturates_and_breaks_invariant() {
        let mut day = InventoryDay::new(d(2027, 5, 1), 10);
        day.sold_rooms = 1;
        day.apply_delta(&BucketDelta { blocked: i32::MAX, ..Default::default() });
        assert_eq!(day.blocked_rooms, i32::MAX);
        assert_eq!(day.allocated(), i32::MAX);
        assert!(!day.invariant_holds());

        let mut day = InventoryDay::new(d(2027, 5, 1), 10);
        day.blocked_rooms = i32::MAX;
        day.house_use_rooms = i32::MAX;
        assert!(!day.invariant_holds());
    }

    #[test]
    fn delta_magnitude() {
        let delta = BucketDelta { blocked: 3, out_of_order: -7, ..Default::default() };
        assert_eq!(delta.magnitude(), 7);
        assert_eq!(BucketDelta { house_use: i32::MIN, ..Default::default() }.magnitude(), 1 << 31);
        assert_eq!(BucketDelta::default().magnitude(), 0);
    }
}
