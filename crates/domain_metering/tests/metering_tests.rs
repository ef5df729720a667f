//! Integration tests for the metering domain

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::{LandlordId, Money, PropertyId, RoomId, ServiceId};
use domain_metering::{MeterLedger, MeteringError, UsageRecord, UsageStatus};
use domain_pricing::{PriceRecord, PriceSubject, UtilityType};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn utility_price(utility: UtilityType, amount: rust_decimal::Decimal) -> PriceRecord {
    PriceRecord::new(
        PriceSubject::utility(PropertyId::new(), utility),
        Money::vnd(amount),
        d(2025, 1, 1),
        LandlordId::new(),
    )
}

/// Electricity at 4000/kWh, reading 100 -> 150 on 2025-01-15:
/// amount = 50 x 4000 = 200000, status Recorded.
#[test]
fn reading_charge_is_quantity_times_captured_price() {
    let mut ledger = MeterLedger::new(RoomId::new(), UtilityType::Electricity);
    let price = utility_price(UtilityType::Electricity, dec!(4000));

    let record = ledger
        .record_reading(dec!(100), dec!(150), &price, d(2025, 1, 15), LandlordId::new())
        .unwrap();

    assert_eq!(record.quantity, dec!(50));
    assert_eq!(record.unit_price.amount(), dec!(4000));
    assert_eq!(record.amount.amount(), dec!(200000));
    assert_eq!(record.status, UsageStatus::Recorded);
}

/// Previous end 50, new start 40: rejected, no record persisted.
#[test]
fn discontinuous_reading_is_rejected() {
    let mut ledger = MeterLedger::new(RoomId::new(), UtilityType::Water);
    let price = utility_price(UtilityType::Water, dec!(10000));
    let by = LandlordId::new();

    ledger
        .record_reading(dec!(10), dec!(50), &price, d(2025, 1, 1), by)
        .unwrap();
    let err = ledger
        .record_reading(dec!(40), dec!(70), &price, d(2025, 2, 1), by)
        .unwrap_err();

    assert!(matches!(
        err,
        MeteringError::ReadingDiscontinuity {
            expected,
            found
        } if expected == dec!(50) && found == dec!(40)
    ));
    assert_eq!(ledger.records().len(), 1);
}

#[test]
fn consecutive_readings_form_a_continuous_chain() {
    let mut ledger = MeterLedger::new(RoomId::new(), UtilityType::Electricity);
    let price = utility_price(UtilityType::Electricity, dec!(4000));
    let by = LandlordId::new();

    ledger.record_reading(dec!(0), dec!(50), &price, d(2025, 1, 1), by).unwrap();
    ledger.record_reading(dec!(50), dec!(120), &price, d(2025, 2, 1), by).unwrap();
    ledger.record_reading(dec!(120), dec!(180), &price, d(2025, 3, 1), by).unwrap();

    let live: Vec<_> = ledger
        .records()
        .iter()
        .filter(|r| r.status != UsageStatus::Cancelled)
        .collect();
    for pair in live.windows(2) {
        assert_eq!(pair[1].start_reading, pair[0].end_reading);
    }
}

#[test]
fn backwards_reading_is_rejected() {
    let mut ledger = MeterLedger::new(RoomId::new(), UtilityType::Electricity);
    let price = utility_price(UtilityType::Electricity, dec!(4000));

    let err = ledger
        .record_reading(dec!(100), dec!(90), &price, d(2025, 1, 1), LandlordId::new())
        .unwrap_err();
    assert!(matches!(err, MeteringError::InvalidReading { .. }));
}

#[test]
fn amending_a_recorded_reading_reprices_it() {
    let price = utility_price(UtilityType::Electricity, dec!(4000));
    let mut record = UsageRecord::metered(
        RoomId::new(),
        UtilityType::Electricity,
        dec!(100),
        dec!(140),
        &price,
        d(2025, 1, 15),
        LandlordId::new(),
    )
    .unwrap();

    record.amend_reading(dec!(100), dec!(150), &price).unwrap();
    assert_eq!(record.quantity, dec!(50));
    assert_eq!(record.amount.amount(), dec!(200000));
}

#[test]
fn service_usage_requires_positive_quantity() {
    let service_id = ServiceId::new();
    let price = PriceRecord::new(
        PriceSubject::service(service_id),
        Money::vnd(dec!(25000)),
        d(2025, 1, 1),
        LandlordId::new(),
    );

    let err = UsageRecord::service_use(
        RoomId::new(),
        service_id,
        dec!(0),
        &price,
        d(2025, 1, 10),
        LandlordId::new(),
    )
    .unwrap_err();
    assert!(matches!(err, MeteringError::InvalidQuantity(_)));

    let record = UsageRecord::service_use(
        RoomId::new(),
        service_id,
        dec!(3),
        &price,
        d(2025, 1, 10),
        LandlordId::new(),
    )
    .unwrap();
    assert_eq!(record.amount.amount(), dec!(75000));
}

#[test]
fn price_for_wrong_subject_is_rejected() {
    let water_price = utility_price(UtilityType::Water, dec!(10000));

    let result = UsageRecord::metered(
        RoomId::new(),
        UtilityType::Electricity,
        dec!(0),
        dec!(10),
        &water_price,
        d(2025, 1, 1),
        LandlordId::new(),
    );
    assert!(matches!(
        result,
        Err(MeteringError::PriceSubjectMismatch(_))
    ));
}
