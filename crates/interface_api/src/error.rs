//! API error handling
//!
//! Maps domain and infrastructure rejections to HTTP statuses: validation
//! failures are 422, missing entities 404, state or consistency conflicts
//! 409, ownership mismatches 403.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain_billing::BillingError;
use domain_contract::ContractError;
use domain_metering::MeteringError;
use domain_pricing::PricingError;
use infra_db::{DatabaseError, RepositoryError};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
            ApiError::Database(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", msg.clone())
            }
            ApiError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg.clone())
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(e) => e.into(),
            RepositoryError::Pricing(e) => e.into(),
            RepositoryError::Metering(e) => e.into(),
            RepositoryError::Contract(e) => e.into(),
            RepositoryError::Billing(e) => e.into(),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::NotFound(msg),
            DatabaseError::DuplicateEntry(msg)
            | DatabaseError::ForeignKeyViolation(msg)
            | DatabaseError::ConstraintViolation(msg) => ApiError::Conflict(msg),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<PricingError> for ApiError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::InvalidPrice { .. } => ApiError::Validation(err.to_string()),
            PricingError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PricingError::NoPriceFound { .. }
            | PricingError::DuplicateEffectiveDate { .. }
            | PricingError::PriceInUse { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<MeteringError> for ApiError {
    fn from(err: MeteringError) -> Self {
        match err {
            MeteringError::InvalidReading { .. } | MeteringError::InvalidQuantity(_) => {
                ApiError::Validation(err.to_string())
            }
            MeteringError::NotFound(_) => ApiError::NotFound(err.to_string()),
            MeteringError::ReadingDiscontinuity { .. }
            | MeteringError::InvalidState { .. }
            | MeteringError::PriceSubjectMismatch(_) => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<ContractError> for ApiError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::MissingOrMultipleRepresentative(_)
            | ContractError::InvalidDateRange { .. }
            | ContractError::InvalidDueDay(_) => ApiError::Validation(err.to_string()),
            ContractError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ContractError::RoomNotAvailable(_)
            | ContractError::UnpaidInvoicesExist(_)
            | ContractError::ContractNotActive(_)
            | ContractError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::InvalidAmount(_) | BillingError::Money(_) => {
                ApiError::Validation(err.to_string())
            }
            BillingError::NotFound(_) | BillingError::DetailNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            BillingError::Overpayment { .. }
            | BillingError::TotalBelowPaid { .. }
            | BillingError::DuplicatePeriod(_)
            | BillingError::InvoiceFullyPaid(_) => ApiError::Conflict(err.to_string()),
            BillingError::Contract(e) => e.into(),
            BillingError::Metering(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::Money;
    use rust_decimal::Decimal;

    #[test]
    fn test_status_mapping() {
        let overpayment: ApiError = BillingError::Overpayment {
            remaining: Money::vnd(Decimal::new(100, 0)),
            amount: Money::vnd(Decimal::new(200, 0)),
        }
        .into();
        assert!(matches!(overpayment, ApiError::Conflict(_)));

        let duplicate: ApiError = PricingError::DuplicateEffectiveDate {
            subject: domain_pricing::PriceSubject::service(core_kernel::ServiceId::new()),
            effective_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
        .into();
        assert!(matches!(duplicate, ApiError::Conflict(_)));

        let invalid: ApiError = ContractError::InvalidDueDay(31).into();
        assert!(matches!(invalid, ApiError::Validation(_)));
    }
}
