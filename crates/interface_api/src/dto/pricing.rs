//! Pricing DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_pricing::{PriceRecord, PriceSubject};

use super::{default_currency, MoneyDto};

/// Request to append a price record
///
/// Exactly one subject must be given: `property_id` + `utility` for a
/// metered utility, or `service_id` for a service.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePriceRequest {
    pub property_id: Option<Uuid>,
    pub utility: Option<String>,
    pub service_id: Option<Uuid>,
    pub unit_price: Decimal,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be an ISO 4217 code"))]
    pub currency: String,
    pub effective_date: NaiveDate,
}

/// Query parameters for listing prices
#[derive(Debug, Deserialize)]
pub struct ListPricesQuery {
    pub property_id: Uuid,
}

/// A price record on the wire
#[derive(Debug, Serialize)]
pub struct PriceRecordResponse {
    pub id: Uuid,
    pub property_id: Option<Uuid>,
    pub utility: Option<String>,
    pub service_id: Option<Uuid>,
    pub unit_price: MoneyDto,
    pub effective_date: NaiveDate,
    pub recorded_by: Uuid,
    pub recorded_at: DateTime<Utc>,
}

impl From<PriceRecord> for PriceRecordResponse {
    fn from(record: PriceRecord) -> Self {
        let (property_id, utility, service_id) = match record.subject {
            PriceSubject::Utility {
                property_id,
                utility,
            } => (
                Some(property_id.as_uuid()),
                Some(utility.as_str().to_string()),
                None,
            ),
            PriceSubject::Service { service_id } => (None, None, Some(service_id.as_uuid())),
        };
        Self {
            id: record.id.as_uuid(),
            property_id,
            utility,
            service_id,
            unit_price: record.unit_price.into(),
            effective_date: record.effective_date,
            recorded_by: record.recorded_by.as_uuid(),
            recorded_at: record.recorded_at,
        }
    }
}
