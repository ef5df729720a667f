//! Metering Domain - Usage Records
//!
//! A usage record is one metered utility reading (electricity, water) or one
//! discrete service-consumption event for a room. The unit price is captured
//! from the price history at creation time and never re-derived, so later
//! price changes cannot silently reprice history.
//!
//! # Lifecycle
//!
//! Records are created `Recorded`, flip to `Billed` exactly once when folded
//! into an invoice, and may be tombstoned `Cancelled` only while still
//! `Recorded`. Cancelled rows are kept forever: the continuity check for the
//! next reading skips them but needs them gone from the chain, not deleted.
//!
//! # Continuity
//!
//! For each room and metered utility, a new reading's start must equal the
//! previous non-cancelled reading's end. [`MeterLedger`] enforces this.

pub mod error;
pub mod usage;
pub mod meter;

pub use error::MeteringError;
pub use usage::{UsageKind, UsageRecord, UsageStatus};
pub use meter::MeterLedger;
