//! Request handlers

pub mod billing;
pub mod contract;
pub mod health;
pub mod metering;
pub mod pricing;

use validator::Validate;

use core_kernel::{Currency, LandlordId};

use crate::auth::Claims;
use crate::error::ApiError;

/// Runs the declarative request validations
pub(crate) fn validate(request: &impl Validate) -> Result<(), ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))
}

/// The landlord the bearer token authenticates
pub(crate) fn acting_landlord(claims: &Claims) -> Result<LandlordId, ApiError> {
    claims.landlord_id().map_err(|_| ApiError::Unauthorized)
}

/// Rejects requests against resources the landlord does not own
pub(crate) fn ensure_owner(owner: LandlordId, acting: LandlordId) -> Result<(), ApiError> {
    if owner != acting {
        return Err(ApiError::Forbidden(
            "Resource belongs to another landlord".to_string(),
        ));
    }
    Ok(())
}

/// Parses an ISO 4217 currency code from a request
pub(crate) fn parse_currency(code: &str) -> Result<Currency, ApiError> {
    Currency::from_code(code)
        .ok_or_else(|| ApiError::Validation(format!("Unsupported currency '{}'", code)))
}
