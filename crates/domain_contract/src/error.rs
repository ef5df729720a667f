//! Contract domain errors

use chrono::NaiveDate;
use thiserror::Error;

use crate::contract::ContractStatus;
use crate::room::RoomStatus;

/// Errors that can occur in the contract domain
#[derive(Debug, Error)]
pub enum ContractError {
    /// Exactly one occupant must be flagged as the billing representative
    #[error("Contract requires exactly one representative occupant, found {0}")]
    MissingOrMultipleRepresentative(usize),

    /// The lease term must end after it starts
    #[error("Invalid date range: end {end} must be after start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// The room is not available for a new contract
    #[error("Room is not available: current status is {0:?}")]
    RoomNotAvailable(RoomStatus),

    /// Termination refused while unsettled invoices exist
    #[error("Cannot terminate: {0} unpaid invoice(s) remain")]
    UnpaidInvoicesExist(usize),

    /// Invoicing and metering are gated on an Active contract
    #[error("Contract is not active (status {0:?}): no invoices may be issued")]
    ContractNotActive(ContractStatus),

    /// The requested transition is not in the state machine
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: ContractStatus,
        to: ContractStatus,
    },

    /// Payment due day must exist in every month
    #[error("Invalid payment due day {0}: must be between 1 and 28")]
    InvalidDueDay(u8),

    /// Contract not found
    #[error("Contract not found: {0}")]
    NotFound(String),
}
