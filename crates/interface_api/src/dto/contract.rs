//! Contract DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_contract::{Contract, Occupant};

use super::{default_currency, MoneyDto};

/// An occupant on a new contract
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OccupantDto {
    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub full_name: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub is_representative: bool,
}

impl From<OccupantDto> for Occupant {
    fn from(dto: OccupantDto) -> Self {
        Occupant::new(dto.full_name, dto.phone, dto.is_representative)
    }
}

/// Request to create a contract
#[derive(Debug, Deserialize, Validate)]
pub struct CreateContractRequest {
    pub room_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub deposit: Decimal,
    pub rent: Decimal,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be an ISO 4217 code"))]
    pub currency: String,
    pub payment_period: String,
    pub payment_due_day: u8,
    #[validate(nested, length(min = 1, message = "At least one occupant is required"))]
    pub occupants: Vec<OccupantDto>,
}

/// An occupant on the wire
#[derive(Debug, Serialize)]
pub struct OccupantResponse {
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub is_representative: bool,
}

impl From<Occupant> for OccupantResponse {
    fn from(occupant: Occupant) -> Self {
        Self {
            id: occupant.id.as_uuid(),
            full_name: occupant.full_name,
            phone: occupant.phone,
            is_representative: occupant.is_representative,
        }
    }
}

/// A contract on the wire
#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub id: Uuid,
    pub room_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub deposit: MoneyDto,
    pub rent: MoneyDto,
    pub payment_period: String,
    pub payment_due_day: u8,
    pub status: String,
    pub occupants: Vec<OccupantResponse>,
    pub created_at: DateTime<Utc>,
    pub terminated_at: Option<DateTime<Utc>>,
}

impl From<Contract> for ContractResponse {
    fn from(contract: Contract) -> Self {
        Self {
            id: contract.id.as_uuid(),
            room_id: contract.room_id.as_uuid(),
            start_date: contract.start_date,
            end_date: contract.end_date,
            deposit: contract.deposit.into(),
            rent: contract.rent.into(),
            payment_period: contract.payment_period.as_str().to_string(),
            payment_due_day: contract.payment_due_day,
            status: contract.status.as_str().to_string(),
            occupants: contract
                .occupants
                .into_iter()
                .map(OccupantResponse::from)
                .collect(),
            created_at: contract.created_at,
            terminated_at: contract.terminated_at,
        }
    }
}

/// Result of a status-roll sweep
#[derive(Debug, Serialize)]
pub struct RollStatusesResponse {
    pub rolled: usize,
    pub as_of: NaiveDate,
}
