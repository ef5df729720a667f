//! Payment reconciliation

use chrono::NaiveDate;
use tracing::info;

use core_kernel::{LandlordId, Money};

use crate::error::BillingError;
use crate::invoice::Invoice;
use crate::payment::{Payment, PaymentMethod};

/// Applies payments to invoices and sweeps overdue balances
pub struct PaymentReconciler;

impl PaymentReconciler {
    /// Records a payment against an invoice
    ///
    /// The invoice's totals and status are re-derived, and the returned
    /// payment is the append-only fact to persist alongside it.
    pub fn record_payment(
        invoice: &mut Invoice,
        amount: Money,
        method: PaymentMethod,
        reference: Option<String>,
        paid_at: NaiveDate,
        recorded_by: LandlordId,
    ) -> Result<Payment, BillingError> {
        invoice.apply_payment(amount)?;
        let payment = Payment::new(invoice.id, amount, method, reference, paid_at, recorded_by);
        info!(
            invoice = %invoice.id,
            payment = %payment.id,
            %amount,
            remaining = %invoice.remaining,
            status = %invoice.status,
            "payment recorded"
        );
        Ok(payment)
    }

    /// Flags every past-due invoice still carrying a balance as overdue
    ///
    /// Returns how many invoices changed status.
    pub fn sweep_overdue(invoices: &mut [Invoice], today: NaiveDate) -> usize {
        invoices
            .iter_mut()
            .map(|invoice| invoice.mark_overdue(today))
            .filter(|&changed| changed)
            .count()
    }
}
