//! Metering domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::usage::UsageStatus;

/// Errors that can occur in the metering domain
#[derive(Debug, Error)]
pub enum MeteringError {
    /// Meter readings can only move forward
    #[error("Invalid reading: end {end} is below start {start}")]
    InvalidReading { start: Decimal, end: Decimal },

    /// The new reading does not continue from the previous one
    #[error("Reading discontinuity: expected start {expected} (previous end), found {found}")]
    ReadingDiscontinuity { expected: Decimal, found: Decimal },

    /// Service usage quantities must be strictly positive
    #[error("Invalid quantity {0}: must be greater than zero")]
    InvalidQuantity(Decimal),

    /// Operation not valid for the record's current status
    #[error("Cannot {operation} a usage record in status {status:?}: only Recorded records may change")]
    InvalidState {
        operation: &'static str,
        status: UsageStatus,
    },

    /// The supplied price record does not price this usage
    #[error("Price subject mismatch: {0}")]
    PriceSubjectMismatch(String),

    /// Usage record not found
    #[error("Usage record not found: {0}")]
    NotFound(String),
}
