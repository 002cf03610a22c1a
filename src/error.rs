use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::{Channel, RoomTypeKey};

/// Which sellability rule rejected a stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    StopSell,
    ChannelStopSell,
    ClosedToArrival,
    ClosedToDeparture,
    MinimumStay,
    MaximumStay,
    RatePlanChannel,
    AdvanceBookingWindow,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::StopSell => "stop_sell",
            Rule::ChannelStopSell => "channel_stop_sell",
            Rule::ClosedToArrival => "closed_to_arrival",
            Rule::ClosedToDeparture => "closed_to_departure",
            Rule::MinimumStay => "minimum_stay",
            Rule::MaximumStay => "maximum_stay",
            Rule::RatePlanChannel => "rate_plan_channel",
            Rule::AdvanceBookingWindow => "advance_booking_window",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    Validation(&'static str),
    DayNotFound {
        room_type: RoomTypeKey,
        date: NaiveDate,
    },
    RatePlanNotFound(Ulid),
    AlreadyExists {
        date: NaiveDate,
    },
    RestrictionViolation {
        rule: Rule,
        date: NaiveDate,
    },
    SoldOut {
        date: NaiveDate,
    },
    ChannelAllocationExhausted {
        channel: Channel,
        date: NaiveDate,
    },
    InvariantViolated {
        date: NaiveDate,
    },
    Contention,
    DeadlineExceeded,
    LimitExceeded(&'static str),
    /// The backing inventory store failed; nothing was applied.
    Store(String),
}

impl BookingError {
    /// Transient failures a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Contention | BookingError::Store(_))
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation",
            BookingError::DayNotFound { .. } => "day_not_found",
            BookingError::RatePlanNotFound(_) => "rate_plan_not_found",
            BookingError::AlreadyExists { .. } => "already_exists",
            BookingError::RestrictionViolation { .. } => "restriction",
            BookingError::SoldOut { .. } => "sold_out",
            BookingError::ChannelAllocationExhausted { .. } => "channel_exhausted",
            BookingError::InvariantViolated { .. } => "invariant",
            BookingError::Contention => "contention",
            BookingError::DeadlineExceeded => "deadline",
            BookingError::LimitExceeded(_) => "limit",
            BookingError::Store(_) => "store",
        }
    }
}

impl std::fmt::Display for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingError::Validation(msg) => write!(f, "invalid request: {msg}"),
            BookingError::DayNotFound { room_type, date } => {
                write!(f, "no inventory for {room_type} on {date}")
            }
            BookingError::RatePlanNotFound(id) => write!(f, "rate plan not found: {id}"),
            BookingError::AlreadyExists { date } => {
                write!(f, "inventory already opened for {date}")
            }
            BookingError::RestrictionViolation { rule, date } => {
                write!(f, "restriction {} violated on {date}", rule.as_str())
            }
            BookingError::SoldOut { date } => write!(f, "sold out on {date}"),
            BookingError::ChannelAllocationExhausted { channel, date } => {
                write!(f, "{channel} allocation exhausted on {date}")
            }
            BookingError::InvariantViolated { date } => {
                write!(f, "allocation would exceed capacity on {date}")
            }
            BookingError::Contention => write!(f, "lock budget exhausted, retry later"),
            BookingError::DeadlineExceeded => write!(f, "deadline exceeded"),
            BookingError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            BookingError::Store(e) => write!(f, "inventory store error: {e}"),
        }
    }
}

impl std::error::Error for BookingError {}
