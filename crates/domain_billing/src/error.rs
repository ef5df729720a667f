//! Billing domain errors

use chrono::NaiveDate;
use thiserror::Error;

use core_kernel::{InvoiceDetailId, InvoiceId, Money, MoneyError};
use domain_contract::ContractError;
use domain_metering::MeteringError;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Payments must be strictly positive and in the invoice currency
    #[error("Invalid payment amount: {0}")]
    InvalidAmount(Money),

    /// Payments may never exceed the remaining balance
    #[error("Payment of {amount} exceeds remaining balance {remaining}")]
    Overpayment { remaining: Money, amount: Money },

    /// One invoice per contract per billing period
    #[error("An invoice for the period ending {0} already exists")]
    DuplicatePeriod(NaiveDate),

    /// A settled invoice is immutable
    #[error("Invoice {0} is fully paid and can no longer change")]
    InvoiceFullyPaid(InvoiceId),

    /// Detail edits may never shrink an invoice below what is already paid
    #[error("Change would drop the total due to {total_due}, below the {total_paid} already paid")]
    TotalBelowPaid { total_due: Money, total_paid: Money },

    /// Line item lookup failed
    #[error("Invoice detail not found: {0}")]
    DetailNotFound(InvoiceDetailId),

    #[error("Invoice not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Metering(#[from] MeteringError),

    #[error(transparent)]
    Money(#[from] MoneyError),
}
