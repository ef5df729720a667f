//! Metering DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_metering::{UsageKind, UsageRecord};

use super::MoneyDto;

/// Request to record usage for a room
///
/// A metered reading carries `utility` with `start_reading`/`end_reading`;
/// a service event carries `service_id` with `quantity`.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordUsageRequest {
    pub utility: Option<String>,
    pub service_id: Option<Uuid>,
    pub start_reading: Option<Decimal>,
    pub end_reading: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub event_date: NaiveDate,
}

/// Request to correct a not-yet-billed usage record
#[derive(Debug, Deserialize, Validate)]
pub struct AmendUsageRequest {
    pub start_reading: Option<Decimal>,
    pub end_reading: Option<Decimal>,
    pub quantity: Option<Decimal>,
}

/// A usage record on the wire
#[derive(Debug, Serialize)]
pub struct UsageRecordResponse {
    pub id: Uuid,
    pub room_id: Uuid,
    pub utility: Option<String>,
    pub service_id: Option<Uuid>,
    pub start_reading: Option<Decimal>,
    pub end_reading: Option<Decimal>,
    pub quantity: Decimal,
    pub unit_price: MoneyDto,
    pub amount: MoneyDto,
    pub event_date: NaiveDate,
    pub invoice_id: Option<Uuid>,
    pub status: String,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<UsageRecord> for UsageRecordResponse {
    fn from(record: UsageRecord) -> Self {
        let (utility, service_id) = match record.kind {
            UsageKind::Utility { utility } => (Some(utility.as_str().to_string()), None),
            UsageKind::Service { service_id } => (None, Some(service_id.as_uuid())),
        };
        Self {
            id: record.id.as_uuid(),
            room_id: record.room_id.as_uuid(),
            utility,
            service_id,
            start_reading: record.start_reading,
            end_reading: record.end_reading,
            quantity: record.quantity,
            unit_price: record.unit_price.into(),
            amount: record.amount.into(),
            event_date: record.event_date,
            invoice_id: record.invoice_id.map(|id| id.as_uuid()),
            status: record.status.as_str().to_string(),
            recorded_by: record.recorded_by.as_uuid(),
            created_at: record.created_at,
        }
    }
}
