//! Core pricing calculation.
//!
//! Pure functions for pricing math: no I/O, no clock, no randomness.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use super::tables::RateTables;

/// Round to `places` with half-away-from-zero rounding.
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Carried through to the quote; the multiplier tables do not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomCategory {
    Standard,
    Superior,
    Deluxe,
    Suite,
    Family,
}

/// Everything one price computation depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingFactors {
    pub base_price: Decimal,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub occupancy_rate: f64,
    pub room_category: RoomCategory,
    pub lead_time_days: i64,
    pub stay_length_nights: u32,
}

/// One step of the pricing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Seasonal,
    DayOfWeek,
    Occupancy,
    LeadTime,
    LengthOfStay,
}

impl Stage {
    /// The production order. Each stage scales the running, cent-rounded price.
    pub const ORDER: [Stage; 5] = [
        Stage::Seasonal,
        Stage::DayOfWeek,
        Stage::Occupancy,
        Stage::LeadTime,
        Stage::LengthOfStay,
    ];
}

#[derive(Debug, Clone)]
pub struct PricingEngine {
    tables: Arc<RateTables>,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(RateTables::default())
    }
}

impl PricingEngine {
    pub fn new(tables: RateTables) -> Self {
        Self { tables: Arc::new(tables) }
    }

    pub fn tables(&self) -> &RateTables {
        &self.tables
    }

    /// Final nightly rate for `factors`, rounded to cents.
    pub fn price(&self, factors: &PricingFactors) -> Decimal {
        self.price_in_order(factors, &Stage::ORDER)
    }

    /// Run the pipeline with an explicit stage order.
    pub fn price_in_order(&self, factors: &PricingFactors, stages: &[Stage]) -> Decimal {
        let mut running = factors.base_price;
        for stage in stages {
            running = round_money(running * self.multiplier(*stage, factors), 2);
        }
        round_money(running, 2)
    }

    /// The factor a single stage contributes.
    pub fn multiplier(&self, stage: Stage, factors: &PricingFactors) -> Decimal {
        match stage {
            Stage::Seasonal => self.tables.seasonal(factors.check_in.month()),
            Stage::DayOfWeek => self.day_of_week(factors.check_in, factors.check_out),
            Stage::Occupancy => self.tables.occupancy(factors.occupancy_rate),
            Stage::LeadTime => self.tables.lead_time(factors.lead_time_days),
            Stage::LengthOfStay => {
                Decimal::ONE - self.tables.length_of_stay_discount(factors.stay_length_nights)
            }
        }
    }

    /// Arithmetic mean of the nightly weekday weights over `[check_in, check_out)`.
    /// An empty range falls back to the check-in weekday.
    fn day_of_week(&self, check_in: NaiveDate, check_out: NaiveDate) -> Decimal {
        let mut sum = Decimal::ZERO;
        let mut nights = 0u32;
        for date in check_in.iter_days().take_while(|d| *d < check_out) {
            sum += self.tables.weekday(date.weekday());
            nights += 1;
        }
        if nights == 0 {
            return self.tables.weekday(check_in.weekday());
        }
        sum / Decimal::from(nights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::tables::StayDiscount;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Every multiplier 1.0 except the length-of-stay table.
    fn neutral_tables() -> RateTables {
        let mut t = RateTables::default();
        t.seasonal = [Decimal::ONE; 12];
        t.weekday = [Decimal::ONE; 7];
        t.occupancy.clear();
        t.lead_time.clear();
        t.lead_time_beyond = Decimal::ONE;
        t
    }

    fn factors(base: Decimal, check_in: NaiveDate, nights: u32) -> PricingFactors {
        PricingFactors {
            base_price: base,
            check_in,
            check_out: check_in + chrono::Days::new(nights as u64),
            occupancy_rate: 0.0,
            room_category: RoomCategory::Standard,
            lead_time_days: 5,
            stay_length_nights: nights,
        }
    }

    // ==================== round_money ====================

    #[test]
    fn round_money_half_away_from_zero() {
        assert_eq!(round_money(dec!(2.345), 2), dec!(2.35));
        assert_eq!(round_money(dec!(2.355), 2), dec!(2.36));
        assert_eq!(round_money(dec!(-2.345), 2), dec!(-2.35));
        assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
    }

    // ==================== reference scenarios ====================

    #[test]
    fn peak_thursday_high_occupancy() {
        // 2027-07-15 is a Thursday.
        let engine = PricingEngine::default();
        let f = PricingFactors {
            base_price: dec!(100),
            check_in: date(2027, 7, 15),
            check_out: date(2027, 7, 16),
            occupancy_rate: 0.9,
            room_category: RoomCategory::Deluxe,
            lead_time_days: 10,
            stay_length_nights: 1,
        };
        assert_eq!(engine.price(&f), dec!(185.25));
    }

    #[test]
    fn ten_night_stay_takes_ten_percent_off() {
        let engine = PricingEngine::new(neutral_tables());
        let f = factors(dec!(150), date(2027, 3, 1), 10);
        assert_eq!(engine.price(&f), dec!(135.00));

        // Same thing against the full default tables: discount is the last stage.
        let engine = PricingEngine::default();
        let undiscounted = engine.price_in_order(&f, &Stage::ORDER[..4]);
        assert_eq!(engine.price(&f), round_money(undiscounted * dec!(0.90), 2));
    }

    #[test]
    fn day_of_week_is_the_mean_over_the_stay() {
        let engine = PricingEngine::default();
        // Fri 2027-07-16, Sat 07-17, Sun 07-18: (1.2 + 1.3 + 1.1) / 3 = 1.2
        let f = factors(dec!(100), date(2027, 7, 16), 3);
        assert_eq!(engine.multiplier(Stage::DayOfWeek, &f), dec!(1.2));
        // Thu + Fri: (1.0 + 1.2) / 2 = 1.1
        let f = factors(dec!(100), date(2027, 7, 15), 2);
        assert_eq!(engine.multiplier(Stage::DayOfWeek, &f), dec!(1.1));
    }

    #[test]
    fn empty_range_uses_check_in_weekday() {
        let engine = PricingEngine::default();
        let mut f = factors(dec!(100), date(2027, 7, 17), 1);
        f.check_out = f.check_in;
        assert_eq!(engine.multiplier(Stage::DayOfWeek, &f), dec!(1.3));
    }

    // ==================== properties ====================

    #[test]
    fn identical_input_identical_output() {
        let engine = PricingEngine::default();
        let mut f = factors(dec!(237.19), date(2027, 12, 20), 9);
        f.occupancy_rate = 0.73;
        f.lead_time_days = 2;
        let a = engine.price(&f);
        let b = engine.price(&f);
        assert_eq!(a, b);
        assert_eq!(a.serialize(), b.serialize());
    }

    #[test]
    fn stage_order_changes_the_result() {
        // Peak July Thursday, 1 night, lead 5: only seasonal (1.5) and occupancy (0.85) bite.
        let engine = PricingEngine::default();
        let mut f = factors(dec!(10.03), date(2027, 7, 15), 1);
        f.occupancy_rate = 0.30;

        let fixed = engine.price(&f);
        let swapped = engine.price_in_order(
            &f,
            &[
                Stage::Occupancy,
                Stage::DayOfWeek,
                Stage::Seasonal,
                Stage::LeadTime,
                Stage::LengthOfStay,
            ],
        );
        // 10.03 * 1.5 = 15.045 -> 15.05, * 0.85 = 12.7925 -> 12.79
        assert_eq!(fixed, dec!(12.79));
        // 10.03 * 0.85 = 8.5255 -> 8.53, * 1.5 = 12.795 -> 12.80
        assert_eq!(swapped, dec!(12.80));
        assert_ne!(fixed, swapped);
    }

    #[test]
    fn price_non_decreasing_across_occupancy_steps() {
        let engine = PricingEngine::default();
        let mut f = factors(dec!(180), date(2027, 10, 6), 2);
        let rates = [0.30, 0.49, 0.50, 0.69, 0.70, 0.84, 0.85, 0.94, 0.95, 1.0];
        let mut last = Decimal::ZERO;
        for rate in rates {
            f.occupancy_rate = rate;
            let p = engine.price(&f);
            assert!(p >= last, "price dropped at occupancy {rate}: {p} < {last}");
            last = p;
        }
    }

    #[test]
    fn category_does_not_change_price() {
        let engine = PricingEngine::default();
        let mut f = factors(dec!(120), date(2027, 5, 3), 4);
        let standard = engine.price(&f);
        f.room_category = RoomCategory::Suite;
        assert_eq!(engine.price(&f), standard);
    }

    #[test]
    fn custom_tables_are_honoured() {
        let mut tables = neutral_tables();
        tables.length_of_stay = vec![StayDiscount { min_nights: 2, discount: dec!(0.5) }];
        let engine = PricingEngine::new(tables);
        let f = factors(dec!(99.99), date(2027, 2, 1), 2);
        assert_eq!(engine.price(&f), dec!(50.00));
    }
}
