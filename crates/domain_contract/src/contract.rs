//! Contract Aggregate Root
//!
//! The Contract aggregate is the main consistency boundary for a lease.
//! It ensures that all changes to a lease are valid and maintains invariants.
//!
//! # Invariants
//!
//! - Exactly one occupant is the billing representative
//! - The lease term ends strictly after it starts
//! - A contract may only be created against a vacant room
//! - A contract cannot be terminated while unpaid invoices remain
//! - `Terminated` is terminal

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use core_kernel::{ContractId, Money, RoomId};

use crate::error::ContractError;
use crate::occupant::Occupant;
use crate::room::RoomStatus;

/// Contract lifecycle states
///
/// `Created -> Active` and `Active -> Expired` follow the calendar and are
/// applied via [`Contract::roll_status`]; `Terminated` is an explicit,
/// terminal transition reachable from every other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Signed but the lease has not started yet
    Created,
    /// The lease is in force
    Active,
    /// The lease term has passed its end date
    Expired,
    /// Ended explicitly; terminal
    Terminated,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Created => "created",
            ContractStatus::Active => "active",
            ContractStatus::Expired => "expired",
            ContractStatus::Terminated => "terminated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(ContractStatus::Created),
            "active" => Some(ContractStatus::Active),
            "expired" => Some(ContractStatus::Expired),
            "terminated" => Some(ContractStatus::Terminated),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often rent falls due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPeriod {
    Monthly,
    Quarterly,
}

impl PaymentPeriod {
    /// Length of one billing period in months
    pub fn months(&self) -> u32 {
        match self {
            PaymentPeriod::Monthly => 1,
            PaymentPeriod::Quarterly => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentPeriod::Monthly => "monthly",
            PaymentPeriod::Quarterly => "quarterly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(PaymentPeriod::Monthly),
            "quarterly" => Some(PaymentPeriod::Quarterly),
            _ => None,
        }
    }
}

/// A lease over one room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub room_id: RoomId,
    pub occupants: Vec<Occupant>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub deposit: Money,
    pub rent: Money,
    pub payment_period: PaymentPeriod,
    /// Day of month rent falls due; capped at 28 so it exists in every month
    pub payment_due_day: u8,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub terminated_at: Option<DateTime<Utc>>,
}

impl Contract {
    /// Creates a new contract against a vacant room
    ///
    /// The initial status follows the calendar: `Active` when the lease has
    /// already started as of `today`, `Created` otherwise.
    ///
    /// # Errors
    ///
    /// - `MissingOrMultipleRepresentative` unless exactly one occupant is
    ///   flagged as representative
    /// - `InvalidDateRange` when `end_date <= start_date`
    /// - `RoomNotAvailable` when the room is not vacant
    /// - `InvalidDueDay` when `payment_due_day` is outside 1..=28
    #[allow(clippy::too_many_arguments)]
    pub fn create(
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
    ) -> Result<Self, ContractError> {
        let representatives = occupants.iter().filter(|o| o.is_representative).count();
        if representatives != 1 {
            return Err(ContractError::MissingOrMultipleRepresentative(
                representatives,
            ));
        }
        if end_date <= start_date {
            return Err(ContractError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }
        if room_status != RoomStatus::Vacant {
            return Err(ContractError::RoomNotAvailable(room_status));
        }
        if !(1..=28).contains(&payment_due_day) {
            return Err(ContractError::InvalidDueDay(payment_due_day));
        }

        let status = if start_date > today {
            ContractStatus::Created
        } else {
            ContractStatus::Active
        };

        let contract = Self {
            id: ContractId::new(),
            room_id,
            occupants,
            start_date,
            end_date,
            deposit,
            rent,
            payment_period,
            payment_due_day,
            status,
            created_at: Utc::now(),
            terminated_at: None,
        };
        info!(
            contract = %contract.id,
            room = %room_id,
            %status,
            "contract created"
        );
        Ok(contract)
    }

    /// The billing representative
    pub fn representative(&self) -> Option<&Occupant> {
        self.occupants.iter().find(|o| o.is_representative)
    }

    /// The room status this contract implies on its own
    pub fn initial_room_status(&self) -> RoomStatus {
        match self.status {
            ContractStatus::Active => RoomStatus::Occupied,
            ContractStatus::Created if self.deposit.is_positive() => RoomStatus::Reserved,
            _ => RoomStatus::Vacant,
        }
    }

    /// Gate for invoice assembly and meter recording
    pub fn ensure_billable(&self) -> Result<(), ContractError> {
        if self.status != ContractStatus::Active {
            return Err(ContractError::ContractNotActive(self.status));
        }
        Ok(())
    }

    /// Terminates the contract explicitly
    ///
    /// Refused while unpaid invoices remain, and once terminated the state
    /// never changes again.
    pub fn terminate(&mut self, unpaid_invoices: usize) -> Result<(), ContractError> {
        if self.status == ContractStatus::Terminated {
            return Err(ContractError::InvalidTransition {
                from: ContractStatus::Terminated,
                to: ContractStatus::Terminated,
            });
        }
        if unpaid_invoices > 0 {
            return Err(ContractError::UnpaidInvoicesExist(unpaid_invoices));
        }
        self.status = ContractStatus::Terminated;
        self.terminated_at = Some(Utc::now());
        info!(contract = %self.id, "contract terminated");
        Ok(())
    }

    /// Applies passage-of-time transitions as of `today`
    ///
    /// Returns `true` when the status changed. Terminated contracts never
    /// move.
    pub fn roll_status(&mut self, today: NaiveDate) -> bool {
        let next = match self.status {
            ContractStatus::Created if today >= self.start_date => {
                if today > self.end_date {
                    ContractStatus::Expired
                } else {
                    ContractStatus::Active
                }
            }
            ContractStatus::Active if today > self.end_date => ContractStatus::Expired,
            _ => return false,
        };
        info!(contract = %self.id, from = %self.status, to = %next, "status rolled");
        self.status = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn vnd(amount: rust_decimal::Decimal) -> Money {
        Money::vnd(amount)
    }

    fn sample_occupants() -> Vec<Occupant> {
        vec![
            Occupant::representative("Nguyen Van A", Some("0901234567".into())),
            Occupant::resident("Tran Thi B", None),
        ]
    }

    fn sample_contract(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Contract {
        Contract::create(
            RoomId::new(),
            RoomStatus::Vacant,
            start,
            end,
            vnd(dec!(5000000)),
            vnd(dec!(3000000)),
            PaymentPeriod::Monthly,
            5,
            sample_occupants(),
            today,
        )
        .unwrap()
    }

    #[test]
    fn test_starts_active_when_lease_already_running() {
        let contract = sample_contract(d(2025, 1, 1), d(2025, 12, 31), d(2025, 3, 1));
        assert_eq!(contract.status, ContractStatus::Active);
        assert_eq!(contract.initial_room_status(), RoomStatus::Occupied);
    }

    #[test]
    fn test_future_start_is_created_and_deposit_reserves_room() {
        let contract = sample_contract(d(2025, 6, 1), d(2026, 5, 31), d(2025, 3, 1));
        assert_eq!(contract.status, ContractStatus::Created);
        assert_eq!(contract.initial_room_status(), RoomStatus::Reserved);
    }

    #[test]
    fn test_future_start_without_deposit_leaves_room_vacant() {
        let contract = Contract::create(
            RoomId::new(),
            RoomStatus::Vacant,
            d(2025, 6, 1),
            d(2026, 5, 31),
            Money::zero(Currency::VND),
            vnd(dec!(3000000)),
            PaymentPeriod::Monthly,
            5,
            sample_occupants(),
            d(2025, 3, 1),
        )
        .unwrap();
        assert_eq!(contract.initial_room_status(), RoomStatus::Vacant);
    }

    #[test]
    fn test_requires_exactly_one_representative() {
        let err = Contract::create(
            RoomId::new(),
            RoomStatus::Vacant,
            d(2025, 1, 1),
            d(2025, 12, 31),
            vnd(dec!(5000000)),
            vnd(dec!(3000000)),
            PaymentPeriod::Monthly,
            5,
            vec![Occupant::resident("Nguyen Van A", None)],
            d(2025, 1, 1),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ContractError::MissingOrMultipleRepresentative(0)
        ));
    }

    #[test]
    fn test_rejects_occupied_room() {
        let err = Contract::create(
            RoomId::new(),
            RoomStatus::Occupied,
            d(2025, 1, 1),
            d(2025, 12, 31),
            vnd(dec!(5000000)),
            vnd(dec!(3000000)),
            PaymentPeriod::Monthly,
            5,
            sample_occupants(),
            d(2025, 1, 1),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ContractError::RoomNotAvailable(RoomStatus::Occupied)
        ));
    }

    #[test]
    fn test_rejects_due_day_outside_every_month() {
        let err = Contract::create(
            RoomId::new(),
            RoomStatus::Vacant,
            d(2025, 1, 1),
            d(2025, 12, 31),
            vnd(dec!(5000000)),
            vnd(dec!(3000000)),
            PaymentPeriod::Monthly,
            31,
            sample_occupants(),
            d(2025, 1, 1),
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::InvalidDueDay(31)));
    }

    #[test]
    fn test_roll_status_follows_calendar() {
        let mut contract = sample_contract(d(2025, 6, 1), d(2025, 12, 31), d(2025, 3, 1));
        assert_eq!(contract.status, ContractStatus::Created);

        assert!(!contract.roll_status(d(2025, 5, 31)));
        assert!(contract.roll_status(d(2025, 6, 1)));
        assert_eq!(contract.status, ContractStatus::Active);

        assert!(!contract.roll_status(d(2025, 12, 31)));
        assert!(contract.roll_status(d(2026, 1, 1)));
        assert_eq!(contract.status, ContractStatus::Expired);
    }

    #[test]
    fn test_terminated_is_terminal() {
        let mut contract = sample_contract(d(2025, 1, 1), d(2025, 12, 31), d(2025, 3, 1));
        contract.terminate(0).unwrap();
        assert_eq!(contract.status, ContractStatus::Terminated);

        assert!(!contract.roll_status(d(2026, 6, 1)));
        assert!(matches!(
            contract.terminate(0),
            Err(ContractError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_ensure_billable_gates_on_active() {
        let contract = sample_contract(d(2025, 6, 1), d(2025, 12, 31), d(2025, 3, 1));
        assert!(matches!(
            contract.ensure_billable(),
            Err(ContractError::ContractNotActive(ContractStatus::Created))
        ));
    }
}
