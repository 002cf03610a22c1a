//! Quote and reserve.
//!
//! Composes the restriction evaluator, pricing engine and ledger for one stay
//! request: validate, check eligibility and restrictions, price every night,
//! then reserve. The first error wins and is returned unchanged, wrapped with
//! the request it belongs to.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::channel;
use crate::error::BookingError;
use crate::ledger::Ledger;
use crate::model::{Channel, ReservationToken, RoomTypeKey, StayRange};
use crate::pricing::{round_money, PricingEngine, PricingFactors};
use crate::rates::RateSource;
use crate::restrictions;

/// Occupancy feed consumed by pricing.
#[async_trait]
pub trait OccupancySource: Send + Sync {
    async fn occupancy_rate(
        &self,
        room_type: RoomTypeKey,
        date: NaiveDate,
    ) -> Result<f64, BookingError>;
}

#[async_trait]
impl OccupancySource for Ledger {
    async fn occupancy_rate(
        &self,
        room_type: RoomTypeKey,
        date: NaiveDate,
    ) -> Result<f64, BookingError> {
        Ledger::occupancy_rate(self, room_type, date).await
    }
}

/// Source of "today" for lead-time computation.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}

/// Always returns the same date.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub hotel_id: Ulid,
    pub room_type_id: Ulid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub channel: Channel,
    pub quantity: i32,
    pub rate_plan_id: Ulid,
    /// Abort before taking any lock once this passes.
    pub deadline: Option<Instant>,
}

impl QuoteRequest {
    pub fn room_type(&self) -> RoomTypeKey {
        RoomTypeKey::new(self.hotel_id, self.room_type_id)
    }

    fn context(&self) -> RequestContext {
        RequestContext {
            room_type: self.room_type(),
            check_in: self.check_in,
            check_out: self.check_out,
            channel: self.channel,
            quantity: self.quantity,
            rate_plan_id: self.rate_plan_id,
        }
    }
}

/// The request an error belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub room_type: RoomTypeKey,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub channel: Channel,
    pub quantity: i32,
    pub rate_plan_id: Ulid,
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {} [{}, {}) via {} on plan {}",
            self.quantity, self.room_type, self.check_in, self.check_out, self.channel, self.rate_plan_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteError {
    pub context: RequestContext,
    pub kind: BookingError,
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.kind)
    }
}

impl std::error::Error for QuoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// One rate per night, in stay order, for a single room.
    pub nightly_rates: Vec<Decimal>,
    /// Sum of nightly rates times quantity.
    pub total_price: Decimal,
    /// `total_price` less the rate plan's channel commission.
    pub net_revenue: Decimal,
    pub lead_time_days: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub quote: Quote,
    pub reservation_token: ReservationToken,
}

pub struct QuoteEngine {
    ledger: Arc<Ledger>,
    pricing: PricingEngine,
    rates: Arc<dyn RateSource>,
    occupancy: Arc<dyn OccupancySource>,
    clock: Arc<dyn Clock>,
}

impl QuoteEngine {
    /// Occupancy defaults to the ledger itself, "today" to the system clock.
    pub fn new(ledger: Arc<Ledger>, pricing: PricingEngine, rates: Arc<dyn RateSource>) -> Self {
        Self {
            occupancy: ledger.clone(),
            ledger,
            pricing,
            rates,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_occupancy(mut self, occupancy: Arc<dyn OccupancySource>) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Price a stay without reserving anything.
    pub async fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        let result = self.build_quote(request).await;
        record_outcome("quote", &result);
        result.map_err(|kind| QuoteError { context: request.context(), kind })
    }

    /// Price a stay and reserve it atomically across every night.
    pub async fn quote_and_reserve(&self, request: &QuoteRequest) -> Result<Confirmation, QuoteError> {
        let result = self.reserve(request).await;
        record_outcome("reserve", &result);
        result.map_err(|kind| {
            if kind == BookingError::Contention {
                warn!("reservation contention: {}", request.context());
            }
            QuoteError { context: request.context(), kind }
        })
    }

    /// Cancel a reservation. Idempotent.
    pub async fn cancel(&self, token: ReservationToken) -> Result<bool, BookingError> {
        self.ledger.release_range(token).await
    }

    async fn reserve(&self, request: &QuoteRequest) -> Result<Confirmation, BookingError> {
        let quote = self.build_quote(request).await?;
        let stay = StayRange::try_new(request.check_in, request.check_out)?;
        let token = self
            .ledger
            .reserve_range(
                request.room_type(),
                stay,
                request.channel,
                request.quantity,
                request.deadline,
            )
            .await?;
        debug!("confirmed {token} at {} for {}", quote.total_price, request.context());
        Ok(Confirmation { quote, reservation_token: token })
    }

    async fn build_quote(&self, request: &QuoteRequest) -> Result<Quote, BookingError> {
        let stay = StayRange::try_new(request.check_in, request.check_out)?;
        crate::ledger::validate_stay(&stay)?;
        crate::ledger::validate_quantity(request.quantity)?;
        let room_type = request.room_type();

        let plan = self
            .rates
            .rate_plan(room_type, request.rate_plan_id)
            .await
            .ok_or(BookingError::RatePlanNotFound(request.rate_plan_id))?;
        let lead_time_days = (request.check_in - self.clock.today()).num_days();
        plan.check_eligibility(request.channel, lead_time_days, request.check_in)?;

        let nights = self.ledger.get_range(room_type, stay).await?;
        restrictions::evaluate(&nights, &stay, request.channel)?;
        for night in &nights {
            channel::check_capacity(night, request.channel, request.quantity)?;
        }

        let mut nightly_rates = Vec::with_capacity(nights.len());
        for night in &nights {
            let occupancy_rate = self.occupancy.occupancy_rate(room_type, night.date).await?;
            let factors = PricingFactors {
                base_price: plan.base_price,
                check_in: stay.check_in,
                check_out: stay.check_out,
                occupancy_rate,
                room_category: plan.room_category,
                lead_time_days,
                stay_length_nights: stay.nights(),
            };
            nightly_rates.push(self.pricing.price(&factors));
        }

        let per_room: Decimal = nightly_rates.iter().sum();
        let total_price = round_money(per_room * Decimal::from(request.quantity), 2);
        Ok(Quote {
            net_revenue: plan.net_revenue(total_price),
            nightly_rates,
            total_price,
            lead_time_days,
        })
    }
}

fn record_outcome<T>(mode: &'static str, result: &Result<T, BookingError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.label(),
    };
    metrics::counter!(crate::observability::QUOTES_TOTAL, "mode" => mode, "outcome" => outcome)
        .increment(1);
}
