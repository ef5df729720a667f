//! Core Kernel - Foundational types for the rental billing system
//!
//! This crate provides the building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Civil-date ranges for billing periods and contract terms
//! - Strongly-typed identifiers

pub mod money;
pub mod temporal;
pub mod identifiers;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{DateRange, TemporalError};
pub use identifiers::{
    PropertyId, RoomId, ServiceId, LandlordId, ContractId, OccupantId,
    PriceRecordId, UsageRecordId, InvoiceId, InvoiceDetailId, PaymentId,
};
