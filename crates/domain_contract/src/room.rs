//! Derived room status
//!
//! A room's status is never stored as an independent counter; it is always
//! recomputed from the contracts that reference the room. That makes it
//! impossible for the status to drift from the contract ledger.

use serde::{Deserialize, Serialize};

use crate::contract::{Contract, ContractStatus};

/// Occupancy status of a room, derived from its contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Vacant,
    Reserved,
    Occupied,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Vacant => "vacant",
            RoomStatus::Reserved => "reserved",
            RoomStatus::Occupied => "occupied",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "vacant" => Some(RoomStatus::Vacant),
            "reserved" => Some(RoomStatus::Reserved),
            "occupied" => Some(RoomStatus::Occupied),
            _ => None,
        }
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recomputes a room's status from the contracts referencing it
///
/// An `Active` contract makes the room `Occupied`. Otherwise a `Created`
/// contract holding a positive deposit makes it `Reserved`. With neither,
/// the room is `Vacant`. Expired and terminated contracts never count.
pub fn derive_room_status(contracts: &[Contract]) -> RoomStatus {
    if contracts.iter().any(|c| c.status == ContractStatus::Active) {
        return RoomStatus::Occupied;
    }
    if contracts
        .iter()
        .any(|c| c.status == ContractStatus::Created && c.deposit.is_positive())
    {
        return RoomStatus::Reserved;
    }
    RoomStatus::Vacant
}
