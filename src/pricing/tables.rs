use std::io;
use std::path::Path;

use chrono::Weekday;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Multiplier applied once `occupancy_rate >= min_rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyStep {
    pub min_rate: f64,
    pub multiplier: Decimal,
}

/// Multiplier applied when `lead_time_days <= max_days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTimeStep {
    pub max_days: i64,
    pub multiplier: Decimal,
}

/// Fractional discount once the stay reaches `min_nights`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StayDiscount {
    pub min_nights: u32,
    pub discount: Decimal,
}

/// Every multiplier table the pricing pipeline reads.
///
/// Loaded once and shared read-only; a tenant with its own tables gets its own
/// `PricingEngine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTables {
    /// Indexed by calendar month, January first.
    pub seasonal: [Decimal; 12],
    /// Indexed by weekday, Monday first.
    pub weekday: [Decimal; 7],
    pub occupancy: Vec<OccupancyStep>,
    /// Used when no occupancy step matches.
    pub occupancy_floor: Decimal,
    pub lead_time: Vec<LeadTimeStep>,
    /// Used when the lead time exceeds every step.
    pub lead_time_beyond: Decimal,
    pub length_of_stay: Vec<StayDiscount>,
}

impl Default for RateTables {
    fn default() -> Self {
        let peak = Decimal::new(15, 1);
        let high = Decimal::new(13, 1);
        let low = Decimal::new(8, 1);
        let base = Decimal::ONE;
        Self {
            seasonal: [
                low, low, base, high, high, peak, peak, peak, high, high, base, peak,
            ],
            weekday: [
                Decimal::new(90, 2),
                Decimal::new(90, 2),
                Decimal::new(95, 2),
                Decimal::new(100, 2),
                Decimal::new(120, 2),
                Decimal::new(130, 2),
                Decimal::new(110, 2),
            ],
            occupancy: vec![
                OccupancyStep { min_rate: 0.95, multiplier: Decimal::new(150, 2) },
                OccupancyStep { min_rate: 0.85, multiplier: Decimal::new(130, 2) },
                OccupancyStep { min_rate: 0.70, multiplier: Decimal::new(110, 2) },
                OccupancyStep { min_rate: 0.50, multiplier: Decimal::new(95, 2) },
                OccupancyStep { min_rate: 0.30, multiplier: Decimal::new(85, 2) },
            ],
            occupancy_floor: Decimal::ONE,
            lead_time: vec![
                LeadTimeStep { max_days: 0, multiplier: Decimal::new(130, 2) },
                LeadTimeStep { max_days: 1, multiplier: Decimal::new(120, 2) },
                LeadTimeStep { max_days: 3, multiplier: Decimal::new(110, 2) },
                LeadTimeStep { max_days: 7, multiplier: Decimal::new(100, 2) },
                LeadTimeStep { max_days: 30, multiplier: Decimal::new(95, 2) },
                LeadTimeStep { max_days: 60, multiplier: Decimal::new(90, 2) },
            ],
            lead_time_beyond: Decimal::new(85, 2),
            length_of_stay: vec![
                StayDiscount { min_nights: 30, discount: Decimal::new(25, 2) },
                StayDiscount { min_nights: 14, discount: Decimal::new(15, 2) },
                StayDiscount { min_nights: 7, discount: Decimal::new(10, 2) },
            ],
        }
    }
}

impl RateTables {
    /// Parse tables from JSON and validate them.
    pub fn from_json(json: &str) -> io::Result<Self> {
        let tables: RateTables = serde_json::from_str(json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        tables
            .validate()
            .map_err(|msg| io::Error::new(io::ErrorKind::InvalidData, msg))?;
        Ok(tables)
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject tables that could produce a negative or free price.
    pub fn validate(&self) -> Result<(), &'static str> {
        let positive = |m: &Decimal| *m > Decimal::ZERO;
        if !self.seasonal.iter().all(positive) {
            return Err("seasonal multipliers must be positive");
        }
        if !self.weekday.iter().all(positive) {
            return Err("weekday multipliers must be positive");
        }
        if !self.occupancy.iter().all(|s| positive(&s.multiplier)) || !positive(&self.occupancy_floor) {
            return Err("occupancy multipliers must be positive");
        }
        if self.occupancy.iter().any(|s| !(0.0..=1.0).contains(&s.min_rate)) {
            return Err("occupancy thresholds must lie in [0, 1]");
        }
        if !self.lead_time.iter().all(|s| positive(&s.multiplier)) || !positive(&self.lead_time_beyond) {
            return Err("lead time multipliers must be positive");
        }
        if self
            .length_of_stay
            .iter()
            .any(|s| s.discount < Decimal::ZERO || s.discount >= Decimal::ONE)
        {
            return Err("length of stay discounts must lie in [0, 1)");
        }
        Ok(())
    }

    pub fn seasonal(&self, month: u32) -> Decimal {
        let idx = (month.clamp(1, 12) - 1) as usize;
        self.seasonal[idx]
    }

    pub fn weekday(&self, day: Weekday) -> Decimal {
        self.weekday[day.num_days_from_monday() as usize]
    }

    /// Highest matching threshold wins, regardless of table order.
    pub fn occupancy(&self, rate: f64) -> Decimal {
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        self.occupancy
            .iter()
            .filter(|s| rate >= s.min_rate)
            .max_by(|a, b| a.min_rate.total_cmp(&b.min_rate))
            .map(|s| s.multiplier)
            .unwrap_or(self.occupancy_floor)
    }

    /// Smallest `max_days` covering the lead time wins.
    pub fn lead_time(&self, days: i64) -> Decimal {
        self.lead_time
            .iter()
            .filter(|s| days <= s.max_days)
            .min_by_key(|s| s.max_days)
            .map(|s| s.multiplier)
            .unwrap_or(self.lead_time_beyond)
    }

    /// Largest threshold met wins; zero below every threshold.
    pub fn length_of_stay_discount(&self, nights: u32) -> Decimal {
        self.length_of_stay
            .iter()
            .filter(|s| nights >= s.min_nights)
            .max_by_key(|s| s.min_nights)
            .map(|s| s.discount)
            .unwrap_or(Decimal::ZERO)
    }
}
