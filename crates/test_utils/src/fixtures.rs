//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for common entities. The fixtures are consistent
//! and predictable so unit tests can assert exact amounts and dates.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use core_kernel::{DateRange, LandlordId, Money, PriceRecordId, PropertyId, RoomId, ServiceId};
use domain_pricing::{PriceRecord, PriceSubject, UtilityType};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Typical monthly rent for a single room
    pub fn rent() -> Money {
        Money::vnd(dec!(3_000_000))
    }

    /// Typical one-month deposit
    pub fn deposit() -> Money {
        Money::vnd(dec!(3_000_000))
    }

    /// Electricity unit price per kWh
    pub fn electricity_price() -> Money {
        Money::vnd(dec!(4_000))
    }

    /// Water unit price per cubic meter
    pub fn water_price() -> Money {
        Money::vnd(dec!(15_000))
    }

    /// Laundry service price per use
    pub fn service_price() -> Money {
        Money::vnd(dec!(25_000))
    }

    /// A zero VND amount
    pub fn zero() -> Money {
        Money::zero(core_kernel::Currency::VND)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Standard contract start (Jan 1, 2025)
    pub fn contract_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    /// Standard contract end (Dec 31, 2025)
    pub fn contract_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
    }

    /// The January 2025 billing period
    pub fn january() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .unwrap()
    }

    /// The February 2025 billing period
    pub fn february() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
        )
        .unwrap()
    }

    /// A date inside the January period
    pub fn mid_january() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    /// A recording timestamp matching the fixture dates
    pub fn recorded_at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()
    }
}

/// Fixture for price records
pub struct PriceFixtures;

impl PriceFixtures {
    /// An electricity price effective before the fixture periods
    pub fn electricity(property_id: PropertyId, landlord: LandlordId) -> PriceRecord {
        PriceRecord {
            id: PriceRecordId::new_v7(),
            subject: PriceSubject::utility(property_id, UtilityType::Electricity),
            unit_price: MoneyFixtures::electricity_price(),
            effective_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            recorded_by: landlord,
            recorded_at: TemporalFixtures::recorded_at(),
        }
    }

    /// A water price effective before the fixture periods
    pub fn water(property_id: PropertyId, landlord: LandlordId) -> PriceRecord {
        PriceRecord {
            id: PriceRecordId::new_v7(),
            subject: PriceSubject::utility(property_id, UtilityType::Water),
            unit_price: MoneyFixtures::water_price(),
            effective_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            recorded_by: landlord,
            recorded_at: TemporalFixtures::recorded_at(),
        }
    }

    /// A service price effective before the fixture periods
    pub fn service(service_id: ServiceId, landlord: LandlordId) -> PriceRecord {
        PriceRecord {
            id: PriceRecordId::new_v7(),
            subject: PriceSubject::service(service_id),
            unit_price: MoneyFixtures::service_price(),
            effective_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
            recorded_by: landlord,
            recorded_at: TemporalFixtures::recorded_at(),
        }
    }
}

/// Fixture for identifiers shared across a test scenario
pub struct IdFixtures;

impl IdFixtures {
    pub fn landlord() -> LandlordId {
        LandlordId::new()
    }

    pub fn property() -> PropertyId {
        PropertyId::new()
    }

    pub fn room() -> RoomId {
        RoomId::new()
    }

    pub fn service() -> ServiceId {
        ServiceId::new()
    }
}
