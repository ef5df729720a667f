//! Integration tests for invoice assembly and payment reconciliation

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use core_kernel::{DateRange, LandlordId, Money, PropertyId, RoomId, ServiceId};
use domain_billing::{
    BillingError, ChargeCategory, DetailSpec, InvoiceAssembler, PaymentMethod, PaymentReconciler,
    PaymentStatus,
};
use domain_contract::{Contract, Occupant, PaymentPeriod, RoomStatus};
use domain_metering::{UsageRecord, UsageStatus};
use domain_pricing::{PriceRecord, PriceSubject, UtilityType};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn january() -> DateRange {
    DateRange::new(d(2025, 1, 1), d(2025, 1, 31)).unwrap()
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
        d(2025, 1, 1),
    )
    .unwrap()
}

/// Rent 3,000,000 + electricity 50 kWh x 4,000 + service 2 x 25,000
/// = 3,250,000 across three lines, and the usage flips to Billed.
fn january_usage(room_id: RoomId, by: LandlordId) -> Vec<UsageRecord> {
    let electricity = PriceRecord::new(
        PriceSubject::utility(PropertyId::new(), UtilityType::Electricity),
        Money::vnd(dec!(4000)),
        d(2025, 1, 1),
        by,
    );
    let service_id = ServiceId::new();
    let laundry = PriceRecord::new(
        PriceSubject::service(service_id),
        Money::vnd(dec!(25000)),
        d(2025, 1, 1),
        by,
    );

    vec![
        UsageRecord::metered(
            room_id,
            UtilityType::Electricity,
            dec!(100),
            dec!(150),
            &electricity,
            d(2025, 1, 20),
            by,
        )
        .unwrap(),
        UsageRecord::service_use(room_id, service_id, dec!(2), &laundry, d(2025, 1, 10), by)
            .unwrap(),
    ]
}

#[test]
fn assembly_folds_rent_and_period_usage() {
    let by = LandlordId::new();
    let contract = active_contract(RoomId::new());
    let mut usage = january_usage(contract.room_id, by);

    let invoice =
        InvoiceAssembler::assemble(&contract, january(), &mut usage, &[], &[], d(2025, 2, 1))
            .unwrap();

    assert_eq!(invoice.details.len(), 3);
    assert_eq!(invoice.total_due.amount(), dec!(3250000));
    assert_eq!(invoice.remaining.amount(), dec!(3250000));
    assert_eq!(invoice.status, PaymentStatus::Unpaid);
    assert_eq!(invoice.due_date, d(2025, 2, 5));

    for record in &usage {
        assert_eq!(record.status, UsageStatus::Billed);
        assert_eq!(record.invoice_id, Some(invoice.id));
    }
}

#[test]
fn usage_outside_the_period_or_room_is_left_alone() {
    let by = LandlordId::new();
    let contract = active_contract(RoomId::new());
    let mut usage = january_usage(contract.room_id, by);
    // A February reading and a reading for another room must not fold in
    let electricity = PriceRecord::new(
        PriceSubject::utility(PropertyId::new(), UtilityType::Electricity),
        Money::vnd(dec!(4000)),
        d(2025, 1, 1),
        by,
    );
    usage.push(
        UsageRecord::metered(
            contract.room_id,
            UtilityType::Electricity,
            dec!(150),
            dec!(180),
            &electricity,
            d(2025, 2, 10),
            by,
        )
        .unwrap(),
    );
    usage.push(
        UsageRecord::metered(
            RoomId::new(),
            UtilityType::Electricity,
            dec!(0),
            dec!(30),
            &electricity,
            d(2025, 1, 15),
            by,
        )
        .unwrap(),
    );

    let invoice =
        InvoiceAssembler::assemble(&contract, january(), &mut usage, &[], &[], d(2025, 2, 1))
            .unwrap();

    assert_eq!(invoice.details.len(), 3);
    assert_eq!(usage[2].status, UsageStatus::Recorded);
    assert_eq!(usage[3].status, UsageStatus::Recorded);
}

#[test]
fn a_period_is_billed_at_most_once() {
    let by = LandlordId::new();
    let contract = active_contract(RoomId::new());
    let mut usage = january_usage(contract.room_id, by);

    let first =
        InvoiceAssembler::assemble(&contract, january(), &mut usage, &[], &[], d(2025, 2, 1))
            .unwrap();

    // Same period again: refused before any usage is touched
    let err = InvoiceAssembler::assemble(
        &contract,
        january(),
        &mut usage,
        &[],
        &[first.period.end],
        d(2025, 2, 2),
    )
    .unwrap_err();
    assert!(matches!(err, BillingError::DuplicatePeriod(end) if end == d(2025, 1, 31)));

    // And billed usage never folds into a later invoice either
    let february = DateRange::new(d(2025, 2, 1), d(2025, 2, 28)).unwrap();
    let second = InvoiceAssembler::assemble(
        &contract,
        february,
        &mut usage,
        &[],
        &[first.period.end],
        d(2025, 3, 1),
    )
    .unwrap();
    assert_eq!(second.details.len(), 1); // rent only
}

#[test]
fn ad_hoc_lines_are_repriced_server_side() {
    let contract = active_contract(RoomId::new());
    let extras = vec![DetailSpec {
        category: ChargeCategory::Other,
        description: "Key replacement".into(),
        quantity: dec!(2),
        unit_price: Money::vnd(dec!(50000)),
        service_id: None,
    }];

    let invoice =
        InvoiceAssembler::assemble(&contract, january(), &mut [], &extras, &[], d(2025, 2, 1))
            .unwrap();

    let line = invoice
        .details
        .iter()
        .find(|detail| detail.category == ChargeCategory::Other)
        .unwrap();
    assert_eq!(line.amount.amount(), dec!(100000));
    assert_eq!(invoice.total_due.amount(), dec!(3100000));
}

#[test]
fn full_payment_settles_the_invoice() {
    let by = LandlordId::new();
    let contract = active_contract(RoomId::new());
    let mut usage = january_usage(contract.room_id, by);
    let mut invoice =
        InvoiceAssembler::assemble(&contract, january(), &mut usage, &[], &[], d(2025, 2, 1))
            .unwrap();

    let payment = PaymentReconciler::record_payment(
        &mut invoice,
        Money::vnd(dec!(3250000)),
        PaymentMethod::BankTransfer,
        Some("FT2502-0042".into()),
        d(2025, 2, 3),
        by,
    )
    .unwrap();

    assert_eq!(payment.invoice_id, invoice.id);
    assert_eq!(invoice.status, PaymentStatus::FullyPaid);
    assert!(invoice.remaining.is_zero());
}

#[test]
fn partial_payment_leaves_the_balance_open() {
    let by = LandlordId::new();
    let contract = active_contract(RoomId::new());
    let mut usage = january_usage(contract.room_id, by);
    let mut invoice =
        InvoiceAssembler::assemble(&contract, january(), &mut usage, &[], &[], d(2025, 2, 1))
            .unwrap();

    PaymentReconciler::record_payment(
        &mut invoice,
        Money::vnd(dec!(1000000)),
        PaymentMethod::Cash,
        None,
        d(2025, 2, 3),
        by,
    )
    .unwrap();

    assert_eq!(invoice.status, PaymentStatus::PartiallyPaid);
    assert_eq!(invoice.remaining.amount(), dec!(2250000));
    assert_eq!(invoice.total_paid.amount(), dec!(1000000));
}

#[test]
fn overpayment_is_rejected_and_nothing_changes() {
    let by = LandlordId::new();
    let contract = active_contract(RoomId::new());
    let mut usage = january_usage(contract.room_id, by);
    let mut invoice =
        InvoiceAssembler::assemble(&contract, january(), &mut usage, &[], &[], d(2025, 2, 1))
            .unwrap();

    let err = PaymentReconciler::record_payment(
        &mut invoice,
        Money::vnd(dec!(4000000)),
        PaymentMethod::Cash,
        None,
        d(2025, 2, 3),
        by,
    )
    .unwrap_err();

    match err {
        BillingError::Overpayment { remaining, amount } => {
            assert_eq!(remaining.amount(), dec!(3250000));
            assert_eq!(amount.amount(), dec!(4000000));
        }
        other => panic!("expected overpayment, got {:?}", other),
    }
    assert_eq!(invoice.status, PaymentStatus::Unpaid);
    assert!(invoice.total_paid.is_zero());
}

#[test]
fn overdue_sweep_flags_only_past_due_open_invoices() {
    let by = LandlordId::new();
    let contract = active_contract(RoomId::new());

    let mut past_due =
        InvoiceAssembler::assemble(&contract, january(), &mut [], &[], &[], d(2025, 2, 1))
            .unwrap();
    let february = DateRange::new(d(2025, 2, 1), d(2025, 2, 28)).unwrap();
    let not_due_yet = InvoiceAssembler::assemble(
        &contract,
        february,
        &mut [],
        &[],
        &[past_due.period.end],
        d(2025, 3, 1),
    )
    .unwrap();
    let mut paid =
        InvoiceAssembler::assemble(
            &contract,
            DateRange::new(d(2025, 3, 1), d(2025, 3, 31)).unwrap(),
            &mut [],
            &[],
            &[past_due.period.end, not_due_yet.period.end],
            d(2025, 4, 1),
        )
        .unwrap();
    let settle = paid.total_due;
    PaymentReconciler::record_payment(
        &mut paid,
        settle,
        PaymentMethod::Cash,
        None,
        d(2025, 4, 2),
        by,
    )
    .unwrap();

    let mut invoices = vec![past_due.clone(), not_due_yet.clone(), paid];
    // 2025-02-06 is past january's due date (02-05) but not february's (03-05)
    let flagged = PaymentReconciler::sweep_overdue(&mut invoices, d(2025, 2, 6));

    assert_eq!(flagged, 1);
    assert_eq!(invoices[0].status, PaymentStatus::Overdue);
    assert_eq!(invoices[1].status, PaymentStatus::Unpaid);
    assert_eq!(invoices[2].status, PaymentStatus::FullyPaid);

    // Re-sweeping is idempotent
    past_due = invoices[0].clone();
    assert!(!past_due.mark_overdue(d(2025, 2, 7)));

    // A payment promotes the flag, and an open balance past due re-earns it
    PaymentReconciler::record_payment(
        &mut past_due,
        Money::vnd(dec!(1000000)),
        PaymentMethod::Cash,
        None,
        d(2025, 2, 7),
        by,
    )
    .unwrap();
    assert_eq!(past_due.status, PaymentStatus::PartiallyPaid);
    assert!(past_due.mark_overdue(d(2025, 2, 8)));
}

mod properties {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    proptest! {
        /// total_paid + remaining == total_due after any accepted payment
        /// sequence, and the status always matches the amounts.
        #[test]
        fn reconciliation_invariant_holds(payments in proptest::collection::vec(1i64..2_000_000, 1..8)) {
            let by = LandlordId::new();
            let contract = active_contract(RoomId::new());
            let mut usage = january_usage(contract.room_id, by);
            let mut invoice = InvoiceAssembler::assemble(
                &contract,
                january(),
                &mut usage,
                &[],
                &[],
                d(2025, 2, 1),
            )
            .unwrap();

            for raw in payments {
                let amount = Money::vnd(Decimal::new(raw, 0));
                let _ = invoice.apply_payment(amount);

                let sum = invoice.total_paid.checked_add(&invoice.remaining).unwrap();
                prop_assert_eq!(sum, invoice.total_due);
                prop_assert!(!invoice.remaining.is_negative());
                match invoice.status {
                    PaymentStatus::FullyPaid => prop_assert!(invoice.remaining.is_zero()),
                    PaymentStatus::PartiallyPaid => {
                        prop_assert!(invoice.total_paid.is_positive());
                        prop_assert!(invoice.remaining.is_positive());
                    }
                    PaymentStatus::Unpaid => prop_assert!(invoice.total_paid.is_zero()),
                    PaymentStatus::Overdue => unreachable!(),
                }
            }
        }
    }
}
