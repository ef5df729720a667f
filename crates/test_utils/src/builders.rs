//! Test Data Builders
//!
//! Builders with sensible defaults so tests only spell out the fields the
//! scenario cares about.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{LandlordId, Money, RoomId};
use domain_billing::{ChargeCategory, Invoice, InvoiceDetail};
use domain_contract::{Contract, ContractError, Occupant, PaymentPeriod, RoomStatus};

use crate::fixtures::{IdFixtures, MoneyFixtures, TemporalFixtures};

/// Builder for test contracts
pub struct ContractBuilder {
    room_id: RoomId,
    room_status: RoomStatus,
    start_date: NaiveDate,
    end_date: NaiveDate,
    deposit: Money,
    rent: Money,
    payment_period: PaymentPeriod,
    payment_due_day: u8,
    occupants: Vec<Occupant>,
    today: NaiveDate,
}

impl Default for ContractBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractBuilder {
    /// A one-year monthly contract starting active on Jan 1, 2025
    pub fn new() -> Self {
        Self {
            room_id: IdFixtures::room(),
            room_status: RoomStatus::Vacant,
            start_date: TemporalFixtures::contract_start(),
            end_date: TemporalFixtures::contract_end(),
            deposit: MoneyFixtures::deposit(),
            rent: MoneyFixtures::rent(),
            payment_period: PaymentPeriod::Monthly,
            payment_due_day: 5,
            occupants: vec![Occupant::representative("Nguyen Van A", None)],
            today: TemporalFixtures::contract_start(),
        }
    }

    pub fn with_room(mut self, room_id: RoomId) -> Self {
        self.room_id = room_id;
        self
    }

    pub fn with_room_status(mut self, status: RoomStatus) -> Self {
        self.room_status = status;
        self
    }

    pub fn with_term(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn with_deposit(mut self, deposit: Money) -> Self {
        self.deposit = deposit;
        self
    }

    pub fn with_rent(mut self, rent: Money) -> Self {
        self.rent = rent;
        self
    }

    pub fn with_payment_period(mut self, period: PaymentPeriod) -> Self {
        self.payment_period = period;
        self
    }

    pub fn with_due_day(mut self, day: u8) -> Self {
        self.payment_due_day = day;
        self
    }

    pub fn with_occupants(mut self, occupants: Vec<Occupant>) -> Self {
        self.occupants = occupants;
        self
    }

    pub fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Runs the domain validations and returns the result
    pub fn try_build(self) -> Result<Contract, ContractError> {
        Contract::create(
            self.room_id,
            self.room_status,
            self.start_date,
            self.end_date,
            self.deposit,
            self.rent,
            self.payment_period,
            self.payment_due_day,
            self.occupants,
            self.today,
        )
    }

    /// Builds a contract the defaults make valid
    pub fn build(self) -> Contract {
        self.try_build().expect("builder defaults form a valid contract")
    }
}

/// Builder for test invoices, bypassing assembly
///
/// Use this when a test needs an invoice in a known state without walking
/// through usage folding; go through `InvoiceAssembler` to test assembly
/// itself.
pub struct InvoiceBuilder {
    contract: Contract,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    lines: Vec<InvoiceDetail>,
}

impl Default for InvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceBuilder {
    pub fn new() -> Self {
        Self {
            contract: ContractBuilder::new().build(),
            issue_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 2, 5).unwrap(),
            lines: Vec::new(),
        }
    }

    pub fn for_contract(mut self, contract: Contract) -> Self {
        self.contract = contract;
        self
    }

    pub fn issued(mut self, issue_date: NaiveDate, due_date: NaiveDate) -> Self {
        self.issue_date = issue_date;
        self.due_date = due_date;
        self
    }

    pub fn with_line(
        mut self,
        category: ChargeCategory,
        description: &str,
        quantity: Decimal,
        unit_price: Money,
    ) -> Self {
        self.lines
            .push(InvoiceDetail::new(category, description, quantity, unit_price));
        self
    }

    /// An invoice carrying the contract's rent for January 2025
    pub fn build(self) -> Invoice {
        let mut invoice = Invoice::new(
            self.contract.id,
            self.contract.room_id,
            TemporalFixtures::january(),
            self.issue_date,
            self.due_date,
            self.contract.rent.currency(),
        );
        invoice.details.push(InvoiceDetail::new(
            ChargeCategory::Rent,
            "Rent",
            dec!(1),
            self.contract.rent,
        ));
        invoice.details.extend(self.lines);
        invoice
            .recompute_totals()
            .expect("builder lines share the invoice currency");
        invoice
    }
}

/// A landlord identity reused across a scenario
pub fn landlord() -> LandlordId {
    IdFixtures::landlord()
}
