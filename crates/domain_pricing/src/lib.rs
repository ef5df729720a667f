//! Pricing Domain - Time-Versioned Price History
//!
//! This crate holds the append-only price history for metered utilities
//! (per property) and fixed services. The single temporal-lookup rule lives
//! here: the applicable price for a date is the record with the greatest
//! effective date that is not after that date.
//!
//! Prices are immutable once created. A record may only be removed while
//! nothing billed references the window it was applicable for.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut history = PriceHistory::new(PriceSubject::utility(property_id, UtilityType::Electricity));
//! history.add(Money::vnd(dec!(4000)), date(2025, 1, 1), landlord)?;
//! let price = history.applicable_at(date(2025, 1, 15))?;
//! assert_eq!(price.unit_price.amount(), dec!(4000));
//! ```

pub mod error;
pub mod price;
pub mod history;

pub use error::PricingError;
pub use price::{PriceRecord, PriceSubject, UtilityType};
pub use history::PriceHistory;
