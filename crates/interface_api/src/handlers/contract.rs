//! Contract lifecycle handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use core_kernel::{ContractId, Money, RoomId};
use domain_contract::{Occupant, PaymentPeriod};
use infra_db::ContractRepository;

use crate::auth::Claims;
use crate::dto::contract::{ContractResponse, CreateContractRequest, RollStatusesResponse};
use crate::error::ApiError;
use crate::handlers::{acting_landlord, ensure_owner, parse_currency, validate};
use crate::AppState;

/// POST /api/v1/contracts
pub async fn create_contract(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<ContractResponse>), ApiError> {
    validate(&request)?;
    let landlord = acting_landlord(&claims)?;
    let room_id = RoomId::from_uuid(request.room_id);
    let currency = parse_currency(&request.currency)?;
    let payment_period = PaymentPeriod::parse(&request.payment_period).ok_or_else(|| {
        ApiError::Validation(format!("Unknown payment period '{}'", request.payment_period))
    })?;

    let repo = ContractRepository::new(state.pool.clone());
    ensure_owner(repo.room_owner(room_id).await?, landlord)?;

    let occupants: Vec<Occupant> = request.occupants.into_iter().map(Occupant::from).collect();
    let contract = repo
        .create_contract(
            room_id,
            request.start_date,
            request.end_date,
            Money::new(request.deposit, currency),
            Money::new(request.rent, currency),
            payment_period,
            request.payment_due_day,
            occupants,
            Utc::now().date_naive(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(contract.into())))
}

/// GET /api/v1/contracts/:id
pub async fn get_contract(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContractResponse>, ApiError> {
    let landlord = acting_landlord(&claims)?;
    let id = ContractId::from_uuid(id);

    let repo = ContractRepository::new(state.pool.clone());
    ensure_owner(repo.contract_owner(id).await?, landlord)?;

    let contract = repo.get(id).await?;
    Ok(Json(contract.into()))
}

/// POST /api/v1/contracts/:id/terminate
pub async fn terminate_contract(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContractResponse>, ApiError> {
    let landlord = acting_landlord(&claims)?;
    let id = ContractId::from_uuid(id);

    let repo = ContractRepository::new(state.pool.clone());
    ensure_owner(repo.contract_owner(id).await?, landlord)?;

    let contract = repo.terminate(id).await?;
    Ok(Json(contract.into()))
}

/// POST /api/v1/contracts/roll-statuses
///
/// Applies passage-of-time transitions to every open contract. Idempotent;
/// intended to be hit by an external scheduler.
pub async fn roll_statuses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<RollStatusesResponse>, ApiError> {
    acting_landlord(&claims)?;
    let today = Utc::now().date_naive();

    let repo = ContractRepository::new(state.pool.clone());
    let rolled = repo.roll_statuses(today).await?;
    Ok(Json(RollStatusesResponse {
        rolled,
        as_of: today,
    }))
}
