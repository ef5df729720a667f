//! Invoice and payment handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;

use core_kernel::{ContractId, DateRange, InvoiceDetailId, InvoiceId, Money, ServiceId};
use domain_billing::{ChargeCategory, DetailSpec, PaymentMethod};
use infra_db::{BillingRepository, ContractRepository};

use crate::auth::Claims;
use crate::dto::billing::{
    CreateInvoiceRequest, DetailRequest, InvoiceResponse, InvoiceWithPaymentsResponse,
    PaymentRecordedResponse, RecordPaymentRequest, SweepOverdueResponse, UpdateDetailRequest,
};
use crate::error::ApiError;
use crate::handlers::{acting_landlord, ensure_owner, parse_currency, validate};
use crate::AppState;

fn detail_spec(request: &DetailRequest) -> Result<DetailSpec, ApiError> {
    let category = ChargeCategory::parse(&request.category).ok_or_else(|| {
        ApiError::Validation(format!("Unknown charge category '{}'", request.category))
    })?;
    let currency = parse_currency(&request.currency)?;
    Ok(DetailSpec {
        category,
        description: request.description.clone(),
        quantity: request.quantity,
        unit_price: Money::new(request.unit_price, currency),
        service_id: request.service_id.map(ServiceId::from_uuid),
    })
}

/// POST /api/v1/invoices
pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    validate(&request)?;
    let landlord = acting_landlord(&claims)?;
    let contract_id = ContractId::from_uuid(request.contract_id);
    let period = DateRange::new(request.period_start, request.period_end)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let extras = request
        .extra_lines
        .iter()
        .map(detail_spec)
        .collect::<Result<Vec<_>, _>>()?;

    let contracts = ContractRepository::new(state.pool.clone());
    ensure_owner(contracts.contract_owner(contract_id).await?, landlord)?;

    let repo = BillingRepository::new(state.pool.clone());
    let issue_date = request.issue_date.unwrap_or_else(|| Utc::now().date_naive());
    let invoice = repo
        .create_invoice(contract_id, period, &extras, issue_date)
        .await?;

    Ok((StatusCode::CREATED, Json(invoice.into())))
}

/// GET /api/v1/invoices/:id
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceWithPaymentsResponse>, ApiError> {
    let landlord = acting_landlord(&claims)?;
    let id = InvoiceId::from_uuid(id);

    let repo = BillingRepository::new(state.pool.clone());
    ensure_owner(repo.invoice_owner(id).await?, landlord)?;

    let invoice = repo.get_invoice(id).await?;
    let payments = repo.payments_for_invoice(id).await?;
    Ok(Json(InvoiceWithPaymentsResponse {
        invoice: invoice.into(),
        payments: payments.into_iter().map(Into::into).collect(),
    }))
}

/// POST /api/v1/invoices/:id/details
pub async fn add_detail(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<DetailRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), ApiError> {
    validate(&request)?;
    let landlord = acting_landlord(&claims)?;
    let id = InvoiceId::from_uuid(id);

    let repo = BillingRepository::new(state.pool.clone());
    ensure_owner(repo.invoice_owner(id).await?, landlord)?;

    let invoice = repo.add_detail(id, detail_spec(&request)?).await?;
    Ok((StatusCode::CREATED, Json(invoice.into())))
}

/// PUT /api/v1/invoices/:id/details/:detail_id
pub async fn update_detail(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, detail_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateDetailRequest>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    validate(&request)?;
    let landlord = acting_landlord(&claims)?;
    let id = InvoiceId::from_uuid(id);
    let currency = parse_currency(&request.currency)?;

    let repo = BillingRepository::new(state.pool.clone());
    ensure_owner(repo.invoice_owner(id).await?, landlord)?;

    let invoice = repo
        .update_detail(
            id,
            InvoiceDetailId::from_uuid(detail_id),
            request.quantity,
            Money::new(request.unit_price, currency),
        )
        .await?;
    Ok(Json(invoice.into()))
}

/// DELETE /api/v1/invoices/:id/details/:detail_id
pub async fn remove_detail(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, detail_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let landlord = acting_landlord(&claims)?;
    let id = InvoiceId::from_uuid(id);

    let repo = BillingRepository::new(state.pool.clone());
    ensure_owner(repo.invoice_owner(id).await?, landlord)?;

    let invoice = repo
        .remove_detail(id, InvoiceDetailId::from_uuid(detail_id))
        .await?;
    Ok(Json(invoice.into()))
}

/// POST /api/v1/invoices/:id/payments
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<PaymentRecordedResponse>), ApiError> {
    validate(&request)?;
    let landlord = acting_landlord(&claims)?;
    let id = InvoiceId::from_uuid(id);
    let currency = parse_currency(&request.currency)?;
    let method = PaymentMethod::parse(&request.method).ok_or_else(|| {
        ApiError::Validation(format!("Unknown payment method '{}'", request.method))
    })?;

    let repo = BillingRepository::new(state.pool.clone());
    ensure_owner(repo.invoice_owner(id).await?, landlord)?;

    let (payment, invoice) = repo
        .record_payment(
            id,
            Money::new(request.amount, currency),
            method,
            request.reference.clone(),
            request.paid_at,
            landlord,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentRecordedResponse {
            payment: payment.into(),
            invoice: invoice.into(),
        }),
    ))
}

/// POST /api/v1/invoices/sweep-overdue
///
/// Flags every past-due invoice with no payment as overdue. Idempotent;
/// intended to be hit by an external scheduler.
pub async fn sweep_overdue(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SweepOverdueResponse>, ApiError> {
    acting_landlord(&claims)?;
    let today = Utc::now().date_naive();

    let repo = BillingRepository::new(state.pool.clone());
    let flagged = repo.sweep_overdue(today).await?;
    Ok(Json(SweepOverdueResponse {
        flagged,
        as_of: today,
    }))
}
