//! Custom Test Assertions
//!
//! Assertion helpers for domain types with more meaningful failure messages
//! than bare `assert_eq!`.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_billing::Invoice;

/// Asserts that a Money value has the expected amount
pub fn assert_amount(actual: &Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Amount mismatch: got {}, expected {} {}",
        actual,
        expected,
        actual.currency()
    );
}

/// Asserts that a Money value is positive
pub fn assert_money_positive(money: &Money) {
    assert!(money.is_positive(), "Expected positive money, got {}", money);
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts the invoice reconciliation invariant: paid + remaining = due,
/// with a non-negative remainder
pub fn assert_invoice_reconciled(invoice: &Invoice) {
    let rebuilt = invoice
        .total_paid
        .checked_add(&invoice.remaining)
        .expect("invoice totals share one currency");
    assert_eq!(
        rebuilt, invoice.total_due,
        "Reconciliation broken on invoice {}: paid {} + remaining {} != due {}",
        invoice.id, invoice.total_paid, invoice.remaining, invoice.total_due
    );
    assert!(
        !invoice.remaining.is_negative(),
        "Invoice {} has a negative remainder: {}",
        invoice.id,
        invoice.remaining
    );
}
