//! Dynamic pricing.
//!
//! A deterministic multiplier pipeline over a base rate. Tables are plain
//! configuration handed to the engine at construction; occupancy and lead time
//! are inputs, never computed here.

pub mod calculators;
pub mod tables;

pub use calculators::{round_money, PricingEngine, PricingFactors, RoomCategory, Stage};
pub use tables::{LeadTimeStep, OccupancyStep, RateTables, StayDiscount};
