//! Billing Domain - Invoice Assembly and Payment Reconciliation
//!
//! This crate is the composition point of the system: it folds a contract's
//! rent, the period's metered usage, and ad-hoc service charges into a
//! single invoice, then reconciles payments against it.
//!
//! All money arithmetic goes through [`core_kernel::Money`]; line amounts
//! are always recomputed from quantity and unit price, never trusted from
//! the caller.

pub mod assembler;
pub mod error;
pub mod invoice;
pub mod payment;
pub mod reconciler;

pub use assembler::{DetailSpec, InvoiceAssembler};
pub use error::BillingError;
pub use invoice::{ChargeCategory, Invoice, InvoiceDetail, PaymentStatus};
pub use payment::{Payment, PaymentMethod};
pub use reconciler::PaymentReconciler;
