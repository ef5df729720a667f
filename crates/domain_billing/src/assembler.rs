//! Invoice assembly
//!
//! The assembler is the composition point of the system: given an active
//! contract, the billing period, and the period's unbilled usage, it folds
//! everything into one invoice and flips the consumed usage records to
//! `Billed` in the same pass.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use core_kernel::{DateRange, Money, ServiceId};
use domain_contract::Contract;
use domain_metering::{UsageRecord, UsageStatus};

use crate::error::BillingError;
use crate::invoice::{ChargeCategory, Invoice, InvoiceDetail};

/// An ad-hoc line requested by the caller
///
/// Only quantity and unit price are taken from the caller; the amount is
/// recomputed during assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailSpec {
    pub category: ChargeCategory,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub service_id: Option<ServiceId>,
}

/// Assembles invoices from contracts and usage
pub struct InvoiceAssembler;

impl InvoiceAssembler {
    /// Builds the invoice for one contract and one billing period
    ///
    /// Lines, in order: the contract rent, one line per `Recorded` usage
    /// record of the contract's room dated inside the period (each flipped
    /// to `Billed`), then any ad-hoc lines. The due date is the contract's
    /// payment due day in the month after the period ends.
    ///
    /// # Errors
    ///
    /// - `Contract` when the contract is not active
    /// - `DuplicatePeriod` when an invoice for this period end already
    ///   exists
    pub fn assemble(
        contract: &Contract,
        period: DateRange,
        usage: &mut [UsageRecord],
        extras: &[DetailSpec],
        existing_period_ends: &[NaiveDate],
        issue_date: NaiveDate,
    ) -> Result<Invoice, BillingError> {
        contract.ensure_billable()?;
        if existing_period_ends.contains(&period.end) {
            return Err(BillingError::DuplicatePeriod(period.end));
        }

        let due_date = due_date_after(period.end, contract.payment_due_day);
        let mut invoice = Invoice::new(
            contract.id,
            contract.room_id,
            period,
            issue_date,
            due_date,
            contract.rent.currency(),
        );

        invoice.add_detail(InvoiceDetail::new(
            ChargeCategory::Rent,
            format!("Rent {}", period),
            Decimal::ONE,
            contract.rent,
        ))?;

        for record in usage.iter_mut() {
            if record.status != UsageStatus::Recorded
                || record.room_id != contract.room_id
                || !period.contains(record.event_date)
            {
                continue;
            }
            invoice.add_detail(InvoiceDetail::from_usage(record))?;
            record.mark_billed(invoice.id)?;
        }

        for spec in extras {
            let mut detail = InvoiceDetail::new(
                spec.category,
                spec.description.clone(),
                spec.quantity,
                spec.unit_price,
            );
            detail.service_id = spec.service_id;
            invoice.add_detail(detail)?;
        }

        info!(
            invoice = %invoice.id,
            contract = %contract.id,
            %period,
            total = %invoice.total_due,
            lines = invoice.details.len(),
            "invoice assembled"
        );
        Ok(invoice)
    }
}

/// The given due day in the month after `period_end`
///
/// Due days are capped at 28 upstream, so the date always exists.
fn due_date_after(period_end: NaiveDate, due_day: u8) -> NaiveDate {
    let (year, month) = if period_end.month() == 12 {
        (period_end.year() + 1, 1)
    } else {
        (period_end.year(), period_end.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, u32::from(due_day)).unwrap_or(period_end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_due_date_rolls_into_next_month() {
        assert_eq!(due_date_after(d(2025, 1, 31), 5), d(2025, 2, 5));
        assert_eq!(due_date_after(d(2025, 12, 31), 5), d(2026, 1, 5));
    }
}
