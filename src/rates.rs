use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{BookingError, Rule};
use crate::model::{Channel, RoomTypeKey};
use crate::pricing::{round_money, RoomCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatePlanKind {
    BestAvailable,
    AdvancePurchase,
    NonRefundable,
    Corporate,
    Package,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationPolicy {
    /// Free cancellation until this many hours before arrival.
    Flexible { free_until_hours: u32 },
    /// First night charged on cancellation.
    FirstNight,
    NonRefundable,
}

/// Who may book a plan and how far ahead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    /// Empty means every channel.
    pub channels: Vec<Channel>,
    pub min_advance_days: Option<i64>,
    pub max_advance_days: Option<i64>,
}

/// Named pricing policy for one room type. Read-only configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePlan {
    pub id: Ulid,
    pub name: String,
    pub kind: RatePlanKind,
    pub cancellation: CancellationPolicy,
    pub room_category: RoomCategory,
    pub base_price: Decimal,
    /// Fraction of gross revenue paid to the channel, e.g. `0.15`.
    pub commission: Decimal,
    pub eligibility: Eligibility,
}

impl RatePlan {
    /// Channel and advance-booking filters. Failures are reported against the
    /// check-in date.
    pub fn check_eligibility(
        &self,
        channel: Channel,
        lead_time_days: i64,
        check_in: NaiveDate,
    ) -> Result<(), BookingError> {
        let rules = &self.eligibility;
        if !rules.channels.is_empty() && !rules.channels.contains(&channel) {
            return Err(BookingError::RestrictionViolation {
                rule: Rule::RatePlanChannel,
                date: check_in,
            });
        }
        let too_late = rules.min_advance_days.is_some_and(|min| lead_time_days < min);
        let too_early = rules.max_advance_days.is_some_and(|max| lead_time_days > max);
        if too_late || too_early {
            return Err(BookingError::RestrictionViolation {
                rule: Rule::AdvanceBookingWindow,
                date: check_in,
            });
        }
        Ok(())
    }

    /// Gross revenue less channel commission.
    pub fn net_revenue(&self, gross: Decimal) -> Decimal {
        round_money(gross * (Decimal::ONE - self.commission), 2)
    }
}

/// Where rate plans come from. Implemented by the host over its own storage.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn rate_plan(&self, room_type: RoomTypeKey, rate_plan_id: Ulid) -> Option<RatePlan>;
}

#[derive(Default)]
pub struct InMemoryRates {
    plans: DashMap<(RoomTypeKey, Ulid), RatePlan>,
}

impl InMemoryRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, room_type: RoomTypeKey, plan: RatePlan) {
        self.plans.insert((room_type, plan.id), plan);
    }

    pub fn remove(&self, room_type: RoomTypeKey, rate_plan_id: Ulid) -> Option<RatePlan> {
        self.plans.remove(&(room_type, rate_plan_id)).map(|(_, plan)| plan)
    }
}

#[async_trait]
impl RateSource for InMemoryRates {
    async fn rate_plan(&self, room_type: RoomTypeKey, rate_plan_id: Ulid) -> Option<RatePlan> {
        self.plans
            .get(&(room_type, rate_plan_id))
            .map(|e| e.value().clone())
    }
}
