//! Repository implementations
//!
//! One repository per aggregate. Each re-runs the domain rules inside its
//! transaction, so concurrent writers racing past the application check
//! still hit the schema constraints, and rows read back are mapped through
//! the domain constructors' invariants.

pub mod billing;
pub mod contract;
pub mod metering;
pub mod pricing;

use core_kernel::Currency;

use crate::error::DatabaseError;

/// Maps a stored currency code back to the domain enum
pub(crate) fn parse_currency(code: &str) -> Result<Currency, DatabaseError> {
    Currency::from_code(code)
        .ok_or_else(|| DatabaseError::CorruptRow(format!("unknown currency code '{}'", code)))
}
