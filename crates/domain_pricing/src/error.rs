//! Pricing domain errors

use chrono::NaiveDate;
use thiserror::Error;

use crate::price::PriceSubject;

/// Errors that can occur in the pricing domain
#[derive(Debug, Error)]
pub enum PricingError {
    /// No price record is effective on or before the queried date.
    /// Callers must treat this as a hard precondition failure; there is
    /// no default or fallback price.
    #[error("No price found for {subject} as of {as_of}")]
    NoPriceFound {
        subject: PriceSubject,
        as_of: NaiveDate,
    },

    /// A record already exists for this subject and effective date
    #[error("A price for {subject} effective {effective_date} already exists")]
    DuplicateEffectiveDate {
        subject: PriceSubject,
        effective_date: NaiveDate,
    },

    /// The record is referenced by an invoiced period and cannot be removed
    #[error("Price effective {effective_date} is in use: {invoiced_periods} invoiced period(s) overlap its window")]
    PriceInUse {
        effective_date: NaiveDate,
        invoiced_periods: usize,
    },

    /// Unit prices must be strictly positive
    #[error("Invalid unit price {amount}: must be greater than zero")]
    InvalidPrice { amount: rust_decimal::Decimal },

    /// Price record not found
    #[error("Price record not found: {0}")]
    NotFound(String),
}
