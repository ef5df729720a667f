//! Property-Based Test Generators
//!
//! Proptest strategies that generate random domain values while keeping
//! their invariants intact.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{DateRange, Money};

/// Whole VND amounts in a realistic billing range
pub fn vnd_amount_strategy() -> impl Strategy<Value = Money> {
    (1i64..100_000_000i64).prop_map(|amount| Money::vnd(Decimal::new(amount, 0)))
}

/// VND amounts including zero, for payment sequences
pub fn vnd_payment_strategy() -> impl Strategy<Value = Money> {
    (0i64..100_000_000i64).prop_map(|amount| Money::vnd(Decimal::new(amount, 0)))
}

/// Dates within the years the fixtures operate in
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2024i32..=2026, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| {
        NaiveDate::from_ymd_opt(y, m, d).expect("day range stays within every month")
    })
}

/// Valid date ranges (start <= end)
pub fn date_range_strategy() -> impl Strategy<Value = DateRange> {
    (date_strategy(), 0i64..365).prop_map(|(start, days)| {
        let end = start + chrono::Duration::days(days);
        DateRange::new(start, end).expect("end is never before start")
    })
}

/// Meter reading pairs with non-negative consumption
pub fn reading_pair_strategy() -> impl Strategy<Value = (Decimal, Decimal)> {
    (0i64..1_000_000i64, 0i64..10_000i64).prop_map(|(start, consumed)| {
        (Decimal::new(start, 0), Decimal::new(start + consumed, 0))
    })
}

/// Payment due days a contract accepts (1..=28)
pub fn due_day_strategy() -> impl Strategy<Value = u8> {
    1u8..=28
}
