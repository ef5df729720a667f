//! Payment records
//!
//! A payment is an append-only fact: once recorded against an invoice it is
//! never edited or deleted. Corrections happen by recording the right
//! payment, not by rewriting history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, LandlordId, Money, PaymentId};

/// How the tenant paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    DigitalWallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::DigitalWallet => "digital_wallet",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            "digital_wallet" => Some(PaymentMethod::DigitalWallet),
            _ => None,
        }
    }
}

/// A payment applied to an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub method: PaymentMethod,
    /// Bank reference or receipt number
    pub reference: Option<String>,
    pub paid_at: NaiveDate,
    pub recorded_by: LandlordId,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        invoice_id: InvoiceId,
        amount: Money,
        method: PaymentMethod,
        reference: Option<String>,
        paid_at: NaiveDate,
        recorded_by: LandlordId,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            invoice_id,
            amount,
            method,
            reference,
            paid_at,
            recorded_by,
            created_at: Utc::now(),
        }
    }
}
