//! Integration tests for the pricing domain

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::{DateRange, LandlordId, Money, PropertyId, ServiceId};
use domain_pricing::{PriceHistory, PriceSubject, PricingError, UtilityType};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn price_changes_never_rewrite_history() {
    let mut history = PriceHistory::new(PriceSubject::utility(
        PropertyId::new(),
        UtilityType::Electricity,
    ));
    let landlord = LandlordId::new();

    history.add(Money::vnd(dec!(3500)), d(2024, 1, 1), landlord).unwrap();
    history.add(Money::vnd(dec!(4000)), d(2025, 1, 1), landlord).unwrap();
    history.add(Money::vnd(dec!(4200)), d(2025, 6, 1), landlord).unwrap();

    // A reading dated before the increase still resolves the old price
    let price = history.applicable_at(d(2024, 11, 20)).unwrap();
    assert_eq!(price.unit_price.amount(), dec!(3500));

    // The query date exactly on an effective date resolves the new price
    let price = history.applicable_at(d(2025, 6, 1)).unwrap();
    assert_eq!(price.unit_price.amount(), dec!(4200));
}

#[test]
fn service_prices_are_versioned_independently() {
    let cleaning = ServiceId::new();
    let mut history = PriceHistory::new(PriceSubject::service(cleaning));
    let landlord = LandlordId::new();

    history.add(Money::vnd(dec!(150000)), d(2025, 1, 1), landlord).unwrap();

    let price = history.applicable_at(d(2025, 3, 1)).unwrap();
    assert_eq!(price.unit_price.amount(), dec!(150000));
    assert_eq!(price.subject, PriceSubject::service(cleaning));
}

#[test]
fn latest_record_window_is_open_ended() {
    let mut history = PriceHistory::new(PriceSubject::utility(
        PropertyId::new(),
        UtilityType::Water,
    ));
    let landlord = LandlordId::new();
    let id = history
        .add(Money::vnd(dec!(10000)), d(2025, 1, 1), landlord)
        .unwrap()
        .id;

    // An invoice far in the future still pins the open-ended latest record
    let invoiced = vec![DateRange::new(d(2027, 5, 1), d(2027, 5, 31)).unwrap()];
    let result = history.remove(id, &invoiced);
    assert!(matches!(result, Err(PricingError::PriceInUse { .. })));
}

#[test]
fn rejection_messages_name_the_invariant() {
    let mut history = PriceHistory::new(PriceSubject::utility(
        PropertyId::new(),
        UtilityType::Electricity,
    ));
    let err = history.applicable_at(d(2025, 1, 1)).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("No price found"));
    assert!(msg.contains("2025-01-01"));
}
