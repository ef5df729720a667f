//! Usage recording handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::{RoomId, ServiceId, UsageRecordId};
use domain_pricing::UtilityType;
use infra_db::MeteringRepository;

use crate::auth::Claims;
use crate::dto::metering::{AmendUsageRequest, RecordUsageRequest, UsageRecordResponse};
use crate::error::ApiError;
use crate::handlers::{acting_landlord, ensure_owner, validate};
use crate::AppState;

/// POST /api/v1/rooms/:room_id/usage
pub async fn record_usage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(room_id): Path<Uuid>,
    Json(request): Json<RecordUsageRequest>,
) -> Result<(StatusCode, Json<UsageRecordResponse>), ApiError> {
    validate(&request)?;
    let landlord = acting_landlord(&claims)?;
    let room_id = RoomId::from_uuid(room_id);

    let repo = MeteringRepository::new(state.pool.clone());
    ensure_owner(repo.room_owner(room_id).await?, landlord)?;

    let record = match (request.utility.as_deref(), request.service_id) {
        (Some(utility), None) => {
            let utility = UtilityType::parse(utility)
                .ok_or_else(|| ApiError::Validation(format!("Unknown utility '{}'", utility)))?;
            let (start, end) = match (request.start_reading, request.end_reading) {
                (Some(start), Some(end)) => (start, end),
                _ => {
                    return Err(ApiError::Validation(
                        "A metered reading needs start_reading and end_reading".to_string(),
                    ))
                }
            };
            repo.record_reading(room_id, utility, start, end, request.event_date, landlord)
                .await?
        }
        (None, Some(service_id)) => {
            let quantity = request.quantity.ok_or_else(|| {
                ApiError::Validation("A service usage needs a quantity".to_string())
            })?;
            repo.record_service_use(
                room_id,
                ServiceId::from_uuid(service_id),
                quantity,
                request.event_date,
                landlord,
            )
            .await?
        }
        _ => {
            return Err(ApiError::Validation(
                "Give either utility with readings, or service_id with quantity".to_string(),
            ))
        }
    };

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /api/v1/rooms/:room_id/usage
pub async fn list_usage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(room_id): Path<Uuid>,
) -> Result<Json<Vec<UsageRecordResponse>>, ApiError> {
    let landlord = acting_landlord(&claims)?;
    let room_id = RoomId::from_uuid(room_id);

    let repo = MeteringRepository::new(state.pool.clone());
    ensure_owner(repo.room_owner(room_id).await?, landlord)?;

    let records = repo.list_for_room(room_id).await?;
    Ok(Json(records.into_iter().map(UsageRecordResponse::from).collect()))
}

/// POST /api/v1/usage/:id/cancel
pub async fn cancel_usage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<UsageRecordResponse>, ApiError> {
    let landlord = acting_landlord(&claims)?;
    let id = UsageRecordId::from_uuid(id);

    let repo = MeteringRepository::new(state.pool.clone());
    ensure_owner(repo.usage_owner(id).await?, landlord)?;

    let record = repo.cancel(id).await?;
    Ok(Json(record.into()))
}

/// PUT /api/v1/usage/:id
pub async fn amend_usage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<AmendUsageRequest>,
) -> Result<Json<UsageRecordResponse>, ApiError> {
    validate(&request)?;
    let landlord = acting_landlord(&claims)?;
    let id = UsageRecordId::from_uuid(id);

    let repo = MeteringRepository::new(state.pool.clone());
    ensure_owner(repo.usage_owner(id).await?, landlord)?;

    let record = match (request.start_reading, request.end_reading, request.quantity) {
        (Some(start), Some(end), None) => repo.amend_reading(id, start, end).await?,
        (None, None, Some(quantity)) => repo.amend_quantity(id, quantity).await?,
        _ => {
            return Err(ApiError::Validation(
                "Give either start_reading with end_reading, or quantity".to_string(),
            ))
        }
    };
    Ok(Json(record.into()))
}
