//! Price history handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use core_kernel::{Money, PriceRecordId, PropertyId, ServiceId};
use domain_pricing::{PriceSubject, UtilityType};
use infra_db::PricingRepository;

use crate::auth::Claims;
use crate::dto::pricing::{CreatePriceRequest, ListPricesQuery, PriceRecordResponse};
use crate::error::ApiError;
use crate::handlers::{acting_landlord, ensure_owner, parse_currency, validate};
use crate::AppState;

fn subject_from_request(request: &CreatePriceRequest) -> Result<PriceSubject, ApiError> {
    match (request.property_id, request.utility.as_deref(), request.service_id) {
        (Some(property_id), Some(utility), None) => {
            let utility = UtilityType::parse(utility)
                .ok_or_else(|| ApiError::Validation(format!("Unknown utility '{}'", utility)))?;
            Ok(PriceSubject::utility(PropertyId::from_uuid(property_id), utility))
        }
        (None, None, Some(service_id)) => {
            Ok(PriceSubject::service(ServiceId::from_uuid(service_id)))
        }
        _ => Err(ApiError::Validation(
            "Give either property_id with utility, or service_id".to_string(),
        )),
    }
}

/// POST /api/v1/prices
pub async fn create_price(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreatePriceRequest>,
) -> Result<(StatusCode, Json<PriceRecordResponse>), ApiError> {
    validate(&request)?;
    let landlord = acting_landlord(&claims)?;
    let subject = subject_from_request(&request)?;
    let currency = parse_currency(&request.currency)?;

    let repo = PricingRepository::new(state.pool.clone());
    ensure_owner(repo.owner_of_subject(subject).await?, landlord)?;

    let record = repo
        .add_price(
            subject,
            Money::new(request.unit_price, currency),
            request.effective_date,
            landlord,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /api/v1/prices?property_id=...
pub async fn list_prices(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListPricesQuery>,
) -> Result<Json<Vec<PriceRecordResponse>>, ApiError> {
    let landlord = acting_landlord(&claims)?;
    let property_id = PropertyId::from_uuid(query.property_id);

    let repo = PricingRepository::new(state.pool.clone());
    // Any utility subject of the property resolves to the same owner row
    let probe = PriceSubject::utility(property_id, UtilityType::Electricity);
    ensure_owner(repo.owner_of_subject(probe).await?, landlord)?;

    let records = repo.list_for_property(property_id).await?;
    Ok(Json(records.into_iter().map(PriceRecordResponse::from).collect()))
}

/// DELETE /api/v1/prices/:id
pub async fn delete_price(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PriceRecordResponse>, ApiError> {
    let landlord = acting_landlord(&claims)?;
    let id = PriceRecordId::from_uuid(id);

    let repo = PricingRepository::new(state.pool.clone());
    ensure_owner(repo.price_owner(id).await?, landlord)?;

    let removed = repo.remove_price(id).await?;
    Ok(Json(removed.into()))
}
