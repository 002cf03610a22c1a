use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};
use ulid::Ulid;

use crate::channel;
use crate::error::BookingError;
use crate::limits::*;
use crate::model::*;
use crate::notify::{ChangeCause, InventoryChange};
use crate::restrictions;
use crate::store::ReservationWrite;

use super::Ledger;

/// Initial state for days created by `open_range`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTemplate {
    pub total_inventory: i32,
    #[serde(default)]
    pub restrictions: Restrictions,
    #[serde(default)]
    pub channel_restrictions: BTreeMap<Channel, ChannelAllocation>,
}

impl DayTemplate {
    pub fn new(total_inventory: i32) -> Self {
        Self {
            total_inventory,
            restrictions: Restrictions::default(),
            channel_restrictions: BTreeMap::new(),
        }
    }

    fn instantiate(&self, date: NaiveDate) -> InventoryDay {
        let mut day = InventoryDay::new(date, self.total_inventory);
        day.restrictions = self.restrictions;
        day.channel_restrictions = self.channel_restrictions.clone();
        day
    }
}

fn validate_restrictions(r: &Restrictions) -> Result<(), BookingError> {
    if r.overbooking_limit < 0 {
        return Err(BookingError::Validation("overbooking limit must be non-negative"));
    }
    if r.overbooking_limit > MAX_TOTAL_INVENTORY {
        return Err(BookingError::LimitExceeded("overbooking limit too large"));
    }
    if r.minimum_stay < 1 {
        return Err(BookingError::Validation("minimum stay must be at least one night"));
    }
    if r.maximum_stay.is_some_and(|max| max < r.minimum_stay) {
        return Err(BookingError::Validation("maximum stay is below minimum stay"));
    }
    Ok(())
}

fn validate_allocation(a: &ChannelAllocation) -> Result<(), BookingError> {
    if a.available_rooms < 0 {
        return Err(BookingError::Validation("channel allocation must be non-negative"));
    }
    if a.available_rooms > MAX_TOTAL_INVENTORY {
        return Err(BookingError::LimitExceeded("channel allocation too large"));
    }
    Ok(())
}

pub(crate) fn validate_stay(stay: &StayRange) -> Result<(), BookingError> {
    if !stay.is_valid() {
        return Err(BookingError::Validation("check_out must be after check_in"));
    }
    if stay.nights() > MAX_STAY_NIGHTS {
        return Err(BookingError::LimitExceeded("stay too long"));
    }
    Ok(())
}

pub(crate) fn validate_quantity(quantity: i32) -> Result<(), BookingError> {
    if quantity <= 0 {
        return Err(BookingError::Validation("quantity must be positive"));
    }
    if quantity > MAX_QUANTITY {
        return Err(BookingError::LimitExceeded("quantity too large"));
    }
    Ok(())
}

fn validate_delta(delta: &BucketDelta) -> Result<(), BookingError> {
    if delta.magnitude() > MAX_TOTAL_INVENTORY.unsigned_abs() {
        return Err(BookingError::LimitExceeded("bucket adjustment too large"));
    }
    Ok(())
}

impl Ledger {
    /// Create `nights` consecutive days starting at `from`.
    ///
    /// All-or-nothing: if any date is already open nothing is created. Existing
    /// days are never replaced.
    pub async fn open_range(
        &self,
        room_type: RoomTypeKey,
        from: NaiveDate,
        nights: u32,
        template: &DayTemplate,
    ) -> Result<usize, BookingError> {
        if nights == 0 {
            return Err(BookingError::Validation("nights must be positive"));
        }
        if nights > MAX_OPEN_NIGHTS {
            return Err(BookingError::LimitExceeded("horizon too long"));
        }
        if !(0..=MAX_TOTAL_INVENTORY).contains(&template.total_inventory) {
            return Err(BookingError::LimitExceeded("total inventory out of range"));
        }
        validate_restrictions(&template.restrictions)?;
        for allocation in template.channel_restrictions.values() {
            validate_allocation(allocation)?;
        }

        let mut days = Vec::with_capacity(nights as usize);
        for offset in 0..nights {
            let date = from
                .checked_add_days(Days::new(offset as u64))
                .ok_or(BookingError::Validation("date out of range"))?;
            days.push(template.instantiate(date));
        }

        let _horizon = self.horizon_lock.lock().await;
        self.store.create_days(room_type, &days).await?;
        for day in &days {
            self.days
                .entry(room_type.day(day.date))
                .or_insert_with(|| Arc::new(RwLock::new(day.clone())));
        }
        metrics::gauge!(crate::observability::DAYS_LOADED).set(self.days.len() as f64);
        info!("opened {nights} days for {room_type} from {from}");

        let opened = days.len();
        if self.notify.is_watched(&room_type) {
            self.notify.publish(InventoryChange { room_type, cause: ChangeCause::Opened, days });
        }
        Ok(opened)
    }

    /// Reserve `quantity` rooms for every night of `stay`, all or nothing.
    ///
    /// With every night locked, phase one re-runs the restriction rules,
    /// checks shared capacity (overbooking included), the channel sub-pool and
    /// the bucket invariant against each night's post-reservation state.
    /// Phase two commits all nights and the reservation record as one unit.
    pub async fn reserve_range(
        &self,
        room_type: RoomTypeKey,
        stay: StayRange,
        channel: Channel,
        quantity: i32,
        deadline: Option<Instant>,
    ) -> Result<ReservationToken, BookingError> {
        let started = std::time::Instant::now();
        let result = self
            .reserve_range_inner(room_type, stay, channel, quantity, deadline)
            .await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.label(),
        };
        metrics::counter!(crate::observability::RESERVATIONS_TOTAL, "outcome" => outcome)
            .increment(1);
        metrics::histogram!(crate::observability::RESERVE_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn reserve_range_inner(
        &self,
        room_type: RoomTypeKey,
        stay: StayRange,
        channel: Channel,
        quantity: i32,
        deadline: Option<Instant>,
    ) -> Result<ReservationToken, BookingError> {
        validate_stay(&stay)?;
        validate_quantity(quantity)?;
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(BookingError::DeadlineExceeded);
        }

        let keys: Vec<DayKey> = stay.dates().map(|date| room_type.day(date)).collect();
        let mut guards = self.lock_days(&keys, deadline).await?;

        // Phase 1: every check runs against the locked nights.
        let nights: Vec<InventoryDay> = guards.iter().map(|g| (**g).clone()).collect();
        restrictions::evaluate(&nights, &stay, channel)?;
        let mut next = Vec::with_capacity(nights.len());
        for mut night in nights {
            channel::check_capacity(&night, channel, quantity)?;
            channel::consume(&mut night, channel, quantity);
            if !night.invariant_holds() {
                return Err(BookingError::SoldOut { date: night.date });
            }
            next.push(night);
        }

        // Phase 2: all nights pass, commit as one unit.
        let record = ReservationRecord {
            token: Ulid::new(),
            room_type,
            stay,
            channel,
            quantity,
        };
        let token = ReservationToken(record.token);
        self.commit_nights(
            room_type,
            &mut guards,
            next,
            Some(ReservationWrite::Insert(record)),
            ChangeCause::Reserved { token, channel, quantity },
        )
        .await?;
        debug!(
            "reserved {quantity} x {room_type} [{}, {}) via {channel}: {token}",
            stay.check_in, stay.check_out
        );
        Ok(token)
    }

    /// Undo a reservation. Returns `false` when the token is unknown or was
    /// already released, which is not an error.
    ///
    /// The token is only removed once every night is locked. Releases of the
    /// same token lock the same nights, so they run one after another and
    /// exactly one of them restores inventory.
    pub async fn release_range(&self, token: ReservationToken) -> Result<bool, BookingError> {
        let Some(record) = self.store.load_reservation(token.0).await? else {
            return Ok(false);
        };

        let keys: Vec<DayKey> = record
            .stay
            .dates()
            .map(|date| record.room_type.day(date))
            .collect();
        let mut guards = self.lock_days(&keys, None).await?;
        if self.store.load_reservation(token.0).await?.is_none() {
            return Ok(false);
        }

        let next: Vec<InventoryDay> = guards
            .iter()
            .map(|g| {
                let mut night = (**g).clone();
                channel::restore(&mut night, record.channel, record.quantity);
                night
            })
            .collect();
        self.commit_nights(
            record.room_type,
            &mut guards,
            next,
            Some(ReservationWrite::Remove(token.0)),
            ChangeCause::Released {
                token,
                channel: record.channel,
                quantity: record.quantity,
            },
        )
        .await?;
        metrics::counter!(crate::observability::RELEASES_TOTAL).increment(1);
        debug!("released {token}");
        Ok(true)
    }

    /// Move rooms in or out of the blocked/out-of-order/comp/house-use buckets.
    /// Rejected without mutation if any bucket would go negative or the
    /// invariant would break.
    pub async fn adjust_buckets(
        &self,
        room_type: RoomTypeKey,
        date: NaiveDate,
        delta: BucketDelta,
    ) -> Result<InventoryDay, BookingError> {
        validate_delta(&delta)?;
        let mut guards = self.lock_days(&[room_type.day(date)], None).await?;
        let mut next = (*guards[0]).clone();
        if delta.is_zero() {
            return Ok(next);
        }

        next.apply_delta(&delta);
        if !next.invariant_holds() {
            return Err(BookingError::InvariantViolated { date });
        }

        self.commit_nights(
            room_type,
            &mut guards,
            vec![next],
            None,
            ChangeCause::BucketsAdjusted,
        )
        .await?;
        debug!("adjusted buckets for {room_type} on {date}: {delta:?}");
        Ok((*guards[0]).clone())
    }

    /// Replace a day's restrictions. Lowering the overbooking limit below what
    /// is already allocated is refused.
    pub async fn set_restrictions(
        &self,
        room_type: RoomTypeKey,
        date: NaiveDate,
        restrictions: Restrictions,
    ) -> Result<(), BookingError> {
        validate_restrictions(&restrictions)?;
        let mut guards = self.lock_days(&[room_type.day(date)], None).await?;

        let mut next = (*guards[0]).clone();
        next.restrictions = restrictions;
        if !next.invariant_holds() {
            return Err(BookingError::InvariantViolated { date });
        }

        self.commit_nights(
            room_type,
            &mut guards,
            vec![next],
            None,
            ChangeCause::RestrictionsUpdated,
        )
        .await
    }

    /// Set or clear (`None`) a channel's sub-pool for one day.
    pub async fn set_channel_allocation(
        &self,
        room_type: RoomTypeKey,
        date: NaiveDate,
        channel: Channel,
        allocation: Option<ChannelAllocation>,
    ) -> Result<(), BookingError> {
        if let Some(a) = &allocation {
            validate_allocation(a)?;
        }
        let mut guards = self.lock_days(&[room_type.day(date)], None).await?;

        let mut next = (*guards[0]).clone();
        match allocation {
            Some(a) => {
                next.channel_restrictions.insert(channel, a);
            }
            None => {
                next.channel_restrictions.remove(&channel);
            }
        }
        self.commit_nights(
            room_type,
            &mut guards,
            vec![next],
            None,
            ChangeCause::ChannelAllocationSet { channel },
        )
        .await
    }
}
