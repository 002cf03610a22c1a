//! Revenue and inventory core for hotel room types.
//!
//! [`ledger::Ledger`] holds date-scoped inventory over a [`store::InventoryStore`]
//! and performs atomic multi-night reservations. [`restrictions`], [`channel`] and [`pricing`]
//! are pure layers over ledger snapshots, and [`quote::QuoteEngine`] composes
//! them into a single quote-and-reserve call.

pub mod channel;
pub mod config;
pub mod error;
pub mod ledger;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod pricing;
pub mod quote;
pub mod rates;
pub mod restrictions;
pub mod store;

pub use error::{BookingError, Rule};
pub use ledger::Ledger;
pub use quote::{QuoteEngine, QuoteRequest};
pub use store::{InMemoryStore, InventoryStore};
