//! Invoice aggregate
//!
//! An invoice covers one contract and one billing period. Its line items
//! carry server-computed amounts, its totals are always derived by
//! [`Invoice::recompute_totals`], and once fully paid it never changes
//! again.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{
    ContractId, Currency, DateRange, InvoiceDetailId, InvoiceId, Money, RoomId, ServiceId,
    UsageRecordId,
};
use domain_metering::{UsageKind, UsageRecord};
use domain_pricing::UtilityType;

use crate::error::BillingError;

/// What a line item charges for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeCategory {
    Rent,
    Electricity,
    Water,
    /// Flat recurring service charge (internet, garbage collection...)
    FixedService,
    /// Per-use service charge folded from a usage record
    MeteredService,
    Other,
}

impl ChargeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeCategory::Rent => "rent",
            ChargeCategory::Electricity => "electricity",
            ChargeCategory::Water => "water",
            ChargeCategory::FixedService => "fixed_service",
            ChargeCategory::MeteredService => "metered_service",
            ChargeCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rent" => Some(ChargeCategory::Rent),
            "electricity" => Some(ChargeCategory::Electricity),
            "water" => Some(ChargeCategory::Water),
            "fixed_service" => Some(ChargeCategory::FixedService),
            "metered_service" => Some(ChargeCategory::MeteredService),
            "other" => Some(ChargeCategory::Other),
            _ => None,
        }
    }
}

/// Settlement state of an invoice
///
/// `Overdue` is applied by an external sweep and is sticky; only an
/// arriving payment promotes it to `PartiallyPaid` or `FullyPaid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    PartiallyPaid,
    FullyPaid,
    Overdue,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::PartiallyPaid => "partially_paid",
            PaymentStatus::FullyPaid => "fully_paid",
            PaymentStatus::Overdue => "overdue",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "partially_paid" => Some(PaymentStatus::PartiallyPaid),
            "fully_paid" => Some(PaymentStatus::FullyPaid),
            "overdue" => Some(PaymentStatus::Overdue),
            _ => None,
        }
    }

    /// True when an invoice in this status blocks contract termination
    pub fn blocks_termination(&self) -> bool {
        matches!(self, PaymentStatus::Unpaid | PaymentStatus::Overdue)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line item on an invoice
///
/// The amount is always recomputed from quantity and unit price; callers
/// never supply it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDetail {
    pub id: InvoiceDetailId,
    pub category: ChargeCategory,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
    pub amount: Money,
    /// Set when the line was folded from a metered or service usage record
    pub usage_record_id: Option<UsageRecordId>,
    /// Set for service charges
    pub service_id: Option<ServiceId>,
}

impl InvoiceDetail {
    pub fn new(
        category: ChargeCategory,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Money,
    ) -> Self {
        Self {
            id: InvoiceDetailId::new(),
            category,
            description: description.into(),
            quantity,
            unit_price,
            amount: unit_price.multiply(quantity).round_to_currency(),
            usage_record_id: None,
            service_id: None,
        }
    }

    /// Builds a line from a usage record, carrying the back-reference
    pub fn from_usage(record: &UsageRecord) -> Self {
        let (category, description, service_id) = match record.kind {
            UsageKind::Utility { utility } => {
                let category = match utility {
                    UtilityType::Electricity => ChargeCategory::Electricity,
                    UtilityType::Water => ChargeCategory::Water,
                };
                (category, utility.to_string(), None)
            }
            UsageKind::Service { service_id } => (
                ChargeCategory::MeteredService,
                format!("service {}", service_id),
                Some(service_id),
            ),
        };
        Self {
            id: InvoiceDetailId::new(),
            category,
            description,
            quantity: record.quantity,
            unit_price: record.unit_price,
            amount: record.unit_price.multiply(record.quantity).round_to_currency(),
            usage_record_id: Some(record.id),
            service_id,
        }
    }

    pub fn with_service(mut self, service_id: ServiceId) -> Self {
        self.service_id = Some(service_id);
        self
    }
}

/// An invoice for one contract and one billing period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub contract_id: ContractId,
    pub room_id: RoomId,
    pub period: DateRange,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: Currency,
    pub details: Vec<InvoiceDetail>,
    pub total_due: Money,
    pub total_paid: Money,
    pub remaining: Money,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates an empty invoice for a contract and period
    pub fn new(
        contract_id: ContractId,
        room_id: RoomId,
        period: DateRange,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InvoiceId::new_v7(),
            contract_id,
            room_id,
            period,
            issue_date,
            due_date,
            currency,
            details: Vec::new(),
            total_due: Money::zero(currency),
            total_paid: Money::zero(currency),
            remaining: Money::zero(currency),
            status: PaymentStatus::Unpaid,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a line item and re-derives the totals
    pub fn add_detail(&mut self, detail: InvoiceDetail) -> Result<(), BillingError> {
        self.ensure_mutable()?;
        let prospective = self.total_due.checked_add(&detail.amount)?;
        self.ensure_covers_paid(prospective)?;
        self.details.push(detail);
        self.recompute_totals()
    }

    /// Replaces a line's quantity and unit price, recomputing its amount
    pub fn update_detail(
        &mut self,
        detail_id: InvoiceDetailId,
        quantity: Decimal,
        unit_price: Money,
    ) -> Result<(), BillingError> {
        self.ensure_mutable()?;
        let index = self
            .details
            .iter()
            .position(|d| d.id == detail_id)
            .ok_or(BillingError::DetailNotFound(detail_id))?;
        let new_amount = unit_price.multiply(quantity).round_to_currency();
        let prospective = self
            .total_due
            .checked_sub(&self.details[index].amount)?
            .checked_add(&new_amount)?;
        self.ensure_covers_paid(prospective)?;

        let detail = &mut self.details[index];
        detail.quantity = quantity;
        detail.unit_price = unit_price;
        detail.amount = new_amount;
        self.recompute_totals()
    }

    /// Removes a line item and re-derives the totals
    pub fn remove_detail(&mut self, detail_id: InvoiceDetailId) -> Result<(), BillingError> {
        self.ensure_mutable()?;
        let index = self
            .details
            .iter()
            .position(|d| d.id == detail_id)
            .ok_or(BillingError::DetailNotFound(detail_id))?;
        let prospective = self.total_due.checked_sub(&self.details[index].amount)?;
        self.ensure_covers_paid(prospective)?;
        self.details.remove(index);
        self.recompute_totals()
    }

    /// Re-derives `total_due`, `remaining`, and the settlement status from
    /// the line items and payments applied so far
    ///
    /// An externally-set `Overdue` survives recomputation while a balance
    /// remains; only [`Invoice::apply_payment`] promotes it.
    pub fn recompute_totals(&mut self) -> Result<(), BillingError> {
        let mut total = Money::zero(self.currency);
        for detail in &self.details {
            total = total.checked_add(&detail.amount)?;
        }
        self.total_due = total.round_to_currency();
        self.remaining = self.total_due.checked_sub(&self.total_paid)?;

        self.status = if self.status == PaymentStatus::Overdue && self.remaining.is_positive() {
            PaymentStatus::Overdue
        } else if self.total_paid.is_positive() {
            if self.remaining.is_positive() {
                PaymentStatus::PartiallyPaid
            } else {
                PaymentStatus::FullyPaid
            }
        } else {
            PaymentStatus::Unpaid
        };
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Applies a payment to the invoice
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for non-positive amounts
    /// - `Money` on currency mismatch
    /// - `InvoiceFullyPaid` when nothing remains to pay
    /// - `Overpayment` when the amount exceeds the remaining balance
    pub fn apply_payment(&mut self, amount: Money) -> Result<(), BillingError> {
        if !amount.is_positive() {
            return Err(BillingError::InvalidAmount(amount));
        }
        if self.status == PaymentStatus::FullyPaid {
            return Err(BillingError::InvoiceFullyPaid(self.id));
        }
        let new_paid = self.total_paid.checked_add(&amount)?;
        if new_paid.checked_sub(&self.total_due)?.is_positive() {
            return Err(BillingError::Overpayment {
                remaining: self.remaining,
                amount,
            });
        }
        self.total_paid = new_paid;
        // A payment is the one event allowed to promote an overdue invoice
        if self.status == PaymentStatus::Overdue {
            self.status = PaymentStatus::Unpaid;
        }
        self.recompute_totals()
    }

    /// Flags the invoice overdue when past due with a balance outstanding
    ///
    /// Returns `true` when the status changed.
    pub fn mark_overdue(&mut self, today: NaiveDate) -> bool {
        let past_due = today > self.due_date;
        let flaggable = !matches!(
            self.status,
            PaymentStatus::Overdue | PaymentStatus::FullyPaid
        );
        if past_due && self.remaining.is_positive() && flaggable {
            self.status = PaymentStatus::Overdue;
            self.updated_at = Utc::now();
            return true;
        }
        false
    }

    fn ensure_mutable(&self) -> Result<(), BillingError> {
        if self.status == PaymentStatus::FullyPaid {
            return Err(BillingError::InvoiceFullyPaid(self.id));
        }
        Ok(())
    }

    // Collected payments must stay covered by the lines, so `remaining`
    // can never go negative through a detail edit
    fn ensure_covers_paid(&self, prospective_due: Money) -> Result<(), BillingError> {
        if prospective_due.checked_sub(&self.total_paid)?.is_negative() {
            return Err(BillingError::TotalBelowPaid {
                total_due: prospective_due,
                total_paid: self.total_paid,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn invoice_with_rent(rent: Decimal) -> Invoice {
        let mut invoice = Invoice::new(
            ContractId::new(),
            RoomId::new(),
            DateRange::new(d(2025, 1, 1), d(2025, 1, 31)).unwrap(),
            d(2025, 2, 1),
            d(2025, 2, 5),
            Currency::VND,
        );
        invoice
            .add_detail(InvoiceDetail::new(
                ChargeCategory::Rent,
                "Monthly rent",
                dec!(1),
                Money::vnd(rent),
            ))
            .unwrap();
        invoice
    }

    #[test]
    fn test_detail_amount_is_recomputed() {
        let detail = InvoiceDetail::new(
            ChargeCategory::Electricity,
            "electricity",
            dec!(50),
            Money::vnd(dec!(4000)),
        );
        assert_eq!(detail.amount.amount(), dec!(200000));
    }

    #[test]
    fn test_totals_track_detail_edits() {
        let mut invoice = invoice_with_rent(dec!(3000000));
        assert_eq!(invoice.total_due.amount(), dec!(3000000));

        let detail = InvoiceDetail::new(
            ChargeCategory::Other,
            "cleaning",
            dec!(1),
            Money::vnd(dec!(100000)),
        );
        let detail_id = detail.id;
        invoice.add_detail(detail).unwrap();
        assert_eq!(invoice.total_due.amount(), dec!(3100000));

        invoice
            .update_detail(detail_id, dec!(2), Money::vnd(dec!(100000)))
            .unwrap();
        assert_eq!(invoice.total_due.amount(), dec!(3200000));

        invoice.remove_detail(detail_id).unwrap();
        assert_eq!(invoice.total_due.amount(), dec!(3000000));
    }

    #[test]
    fn test_fully_paid_invoice_is_immutable() {
        let mut invoice = invoice_with_rent(dec!(3000000));
        invoice.apply_payment(Money::vnd(dec!(3000000))).unwrap();
        assert_eq!(invoice.status, PaymentStatus::FullyPaid);

        let detail = InvoiceDetail::new(
            ChargeCategory::Other,
            "late add",
            dec!(1),
            Money::vnd(dec!(1)),
        );
        assert!(matches!(
            invoice.add_detail(detail),
            Err(BillingError::InvoiceFullyPaid(_))
        ));
        assert!(matches!(
            invoice.apply_payment(Money::vnd(dec!(1))),
            Err(BillingError::InvoiceFullyPaid(_))
        ));
    }

    #[test]
    fn test_detail_edit_cannot_drop_total_below_paid() {
        let mut invoice = invoice_with_rent(dec!(3000000));
        let extra = InvoiceDetail::new(
            ChargeCategory::Other,
            "repair",
            dec!(1),
            Money::vnd(dec!(1000000)),
        );
        let extra_id = extra.id;
        invoice.add_detail(extra).unwrap();
        invoice.apply_payment(Money::vnd(dec!(3500000))).unwrap();
        assert_eq!(invoice.status, PaymentStatus::PartiallyPaid);

        // Removing the extra line would leave 3,000,000 due against
        // 3,500,000 collected
        assert!(matches!(
            invoice.remove_detail(extra_id),
            Err(BillingError::TotalBelowPaid { .. })
        ));
        // Shrinking it below the shortfall is refused the same way
        assert!(matches!(
            invoice.update_detail(extra_id, dec!(1), Money::vnd(dec!(400000))),
            Err(BillingError::TotalBelowPaid { .. })
        ));

        // The rejected edits left nothing behind
        assert_eq!(invoice.details.len(), 2);
        assert_eq!(invoice.total_due.amount(), dec!(4000000));
        assert_eq!(invoice.remaining.amount(), dec!(500000));
        assert_eq!(invoice.status, PaymentStatus::PartiallyPaid);

        // Shrinking down to exactly what was collected settles the invoice
        invoice
            .update_detail(extra_id, dec!(1), Money::vnd(dec!(500000)))
            .unwrap();
        assert_eq!(invoice.status, PaymentStatus::FullyPaid);
        assert!(invoice.remaining.is_zero());
    }

    #[test]
    fn test_only_unpaid_and_overdue_block_termination() {
        assert!(PaymentStatus::Unpaid.blocks_termination());
        assert!(PaymentStatus::Overdue.blocks_termination());
        assert!(!PaymentStatus::PartiallyPaid.blocks_termination());
        assert!(!PaymentStatus::FullyPaid.blocks_termination());
    }

    #[test]
    fn test_overdue_is_sticky_until_paid() {
        let mut invoice = invoice_with_rent(dec!(3000000));
        assert!(invoice.mark_overdue(d(2025, 2, 6)));
        assert_eq!(invoice.status, PaymentStatus::Overdue);

        // Editing details keeps the overdue flag while nothing is paid
        invoice
            .add_detail(InvoiceDetail::new(
                ChargeCategory::Other,
                "adjustment",
                dec!(1),
                Money::vnd(dec!(50000)),
            ))
            .unwrap();
        assert_eq!(invoice.status, PaymentStatus::Overdue);

        // A payment promotes it
        invoice.apply_payment(Money::vnd(dec!(1000000))).unwrap();
        assert_eq!(invoice.status, PaymentStatus::PartiallyPaid);
    }

    #[test]
    fn test_mark_overdue_needs_past_due_and_balance() {
        let mut invoice = invoice_with_rent(dec!(3000000));
        // Not yet past due on the due date itself
        assert!(!invoice.mark_overdue(d(2025, 2, 5)));

        // A partially paid invoice past due still carries a balance
        invoice.apply_payment(Money::vnd(dec!(1000000))).unwrap();
        assert!(invoice.mark_overdue(d(2025, 3, 1)));
        assert_eq!(invoice.status, PaymentStatus::Overdue);
        // Idempotent once flagged
        assert!(!invoice.mark_overdue(d(2025, 3, 2)));

        // Settling it promotes and keeps it immutable thereafter
        invoice.apply_payment(Money::vnd(dec!(2000000))).unwrap();
        assert_eq!(invoice.status, PaymentStatus::FullyPaid);
        assert!(!invoice.mark_overdue(d(2025, 4, 1)));
    }
}
