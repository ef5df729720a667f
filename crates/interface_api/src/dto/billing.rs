//! Billing DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_billing::{Invoice, InvoiceDetail, Payment};

use super::{default_currency, MoneyDto};

/// An ad-hoc charge line on a create or amend request
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct DetailRequest {
    pub category: String,
    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be an ISO 4217 code"))]
    pub currency: String,
    pub service_id: Option<Uuid>,
}

/// Request to create an invoice for a contract and billing period
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub contract_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(nested)]
    pub extra_lines: Vec<DetailRequest>,
}

/// Request to re-price an existing invoice line
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateDetailRequest {
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be an ISO 4217 code"))]
    pub currency: String,
}

/// Request to record a payment against an invoice
#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be an ISO 4217 code"))]
    pub currency: String,
    pub method: String,
    pub reference: Option<String>,
    pub paid_at: NaiveDate,
}

/// An invoice line on the wire
#[derive(Debug, Serialize)]
pub struct InvoiceDetailResponse {
    pub id: Uuid,
    pub category: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: MoneyDto,
    pub amount: MoneyDto,
    pub usage_record_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
}

impl From<InvoiceDetail> for InvoiceDetailResponse {
    fn from(detail: InvoiceDetail) -> Self {
        Self {
            id: detail.id.as_uuid(),
            category: detail.category.as_str().to_string(),
            description: detail.description,
            quantity: detail.quantity,
            unit_price: detail.unit_price.into(),
            amount: detail.amount.into(),
            usage_record_id: detail.usage_record_id.map(|id| id.as_uuid()),
            service_id: detail.service_id.map(|id| id.as_uuid()),
        }
    }
}

/// An invoice on the wire
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub room_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub details: Vec<InvoiceDetailResponse>,
    pub total_due: MoneyDto,
    pub total_paid: MoneyDto,
    pub remaining: MoneyDto,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id.as_uuid(),
            contract_id: invoice.contract_id.as_uuid(),
            room_id: invoice.room_id.as_uuid(),
            period_start: invoice.period.start,
            period_end: invoice.period.end,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            details: invoice
                .details
                .into_iter()
                .map(InvoiceDetailResponse::from)
                .collect(),
            total_due: invoice.total_due.into(),
            total_paid: invoice.total_paid.into(),
            remaining: invoice.remaining.into(),
            status: invoice.status.as_str().to_string(),
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

/// A payment on the wire
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: MoneyDto,
    pub method: String,
    pub reference: Option<String>,
    pub paid_at: NaiveDate,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.as_uuid(),
            invoice_id: payment.invoice_id.as_uuid(),
            amount: payment.amount.into(),
            method: payment.method.as_str().to_string(),
            reference: payment.reference,
            paid_at: payment.paid_at,
            recorded_by: payment.recorded_by.as_uuid(),
            created_at: payment.created_at,
        }
    }
}

/// Result of recording a payment: the payment plus the reconciled invoice
#[derive(Debug, Serialize)]
pub struct PaymentRecordedResponse {
    pub payment: PaymentResponse,
    pub invoice: InvoiceResponse,
}

/// Full invoice view including its payment history
#[derive(Debug, Serialize)]
pub struct InvoiceWithPaymentsResponse {
    #[serde(flatten)]
    pub invoice: InvoiceResponse,
    pub payments: Vec<PaymentResponse>,
}

/// Result of an overdue sweep
#[derive(Debug, Serialize)]
pub struct SweepOverdueResponse {
    pub flagged: u64,
    pub as_of: NaiveDate,
}
