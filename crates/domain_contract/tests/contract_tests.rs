//! Integration tests for the contract lifecycle

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::{Money, RoomId};
use domain_contract::{
    derive_room_status, Contract, ContractError, ContractStatus, Occupant, PaymentPeriod,
    RoomStatus,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn active_contract(room_id: RoomId) -> Contract {
    Contract::create(
        room_id,
        RoomStatus::Vacant,
        d(2025, 1, 1),
        d(2025, 12, 31),
        Money::vnd(dec!(5000000)),
        Money::vnd(dec!(3000000)),
        PaymentPeriod::Monthly,
        5,
        vec![Occupant::representative("Nguyen Van A", None)],
        d(2025, 2, 1),
    )
    .unwrap()
}

/// Termination with one unpaid invoice is refused and the contract stays
/// active.
#[test]
fn termination_refused_while_invoices_unpaid() {
    let mut contract = active_contract(RoomId::new());

    let err = contract.terminate(1).unwrap_err();
    assert!(matches!(err, ContractError::UnpaidInvoicesExist(1)));
    assert_eq!(contract.status, ContractStatus::Active);

    contract.terminate(0).unwrap();
    assert_eq!(contract.status, ContractStatus::Terminated);
}

#[test]
fn room_status_is_recomputed_from_contracts() {
    let room_id = RoomId::new();
    let mut contract = active_contract(room_id);
    assert_eq!(derive_room_status(&[contract.clone()]), RoomStatus::Occupied);

    contract.terminate(0).unwrap();
    assert_eq!(derive_room_status(&[contract]), RoomStatus::Vacant);

    assert_eq!(derive_room_status(&[]), RoomStatus::Vacant);
}

#[test]
fn deposit_on_future_contract_reserves_the_room() {
    let room_id = RoomId::new();
    let contract = Contract::create(
        room_id,
        RoomStatus::Vacant,
        d(2025, 6, 1),
        d(2026, 5, 31),
        Money::vnd(dec!(5000000)),
        Money::vnd(dec!(3000000)),
        PaymentPeriod::Monthly,
        5,
        vec![Occupant::representative("Tran Thi B", None)],
        d(2025, 2, 1),
    )
    .unwrap();
    assert_eq!(contract.status, ContractStatus::Created);
    assert_eq!(derive_room_status(&[contract]), RoomStatus::Reserved);
}

#[test]
fn creation_rejects_inverted_term_and_multiple_representatives() {
    let err = Contract::create(
        RoomId::new(),
        RoomStatus::Vacant,
        d(2025, 12, 31),
        d(2025, 1, 1),
        Money::vnd(dec!(0)),
        Money::vnd(dec!(3000000)),
        PaymentPeriod::Monthly,
        5,
        vec![Occupant::representative("A", None)],
        d(2025, 1, 1),
    )
    .unwrap_err();
    assert!(matches!(err, ContractError::InvalidDateRange { .. }));

    let err = Contract::create(
        RoomId::new(),
        RoomStatus::Vacant,
        d(2025, 1, 1),
        d(2025, 12, 31),
        Money::vnd(dec!(0)),
        Money::vnd(dec!(3000000)),
        PaymentPeriod::Monthly,
        5,
        vec![
            Occupant::representative("A", None),
            Occupant::representative("B", None),
        ],
        d(2025, 1, 1),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ContractError::MissingOrMultipleRepresentative(2)
    ));
}

#[test]
fn quarterly_period_spans_three_months() {
    assert_eq!(PaymentPeriod::Quarterly.months(), 3);
    assert_eq!(PaymentPeriod::parse("quarterly"), Some(PaymentPeriod::Quarterly));
}
