//! Metering repository
//!
//! Persists usage records. Recording a reading resolves the unit price from
//! the price history at the event date and replays the room's reading chain
//! through [`MeterLedger`] inside one transaction, so the continuity
//! invariant holds under concurrent writers (the chain rows are locked
//! first).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use core_kernel::{InvoiceId, LandlordId, Money, PropertyId, RoomId, ServiceId, UsageRecordId};
use domain_metering::{MeterLedger, MeteringError, UsageKind, UsageRecord, UsageStatus};
use domain_pricing::{PriceRecord, PriceSubject, PricingError, UtilityType};

use crate::error::{DatabaseError, RepositoryError};
use crate::repositories::parse_currency;

/// Repository for usage records and meter ledgers
#[derive(Debug, Clone)]
pub struct MeteringRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UsageRow {
    usage_record_id: Uuid,
    room_id: Uuid,
    utility: Option<String>,
    service_id: Option<Uuid>,
    start_reading: Option<Decimal>,
    end_reading: Option<Decimal>,
    quantity: Decimal,
    unit_price: Decimal,
    amount: Decimal,
    currency: String,
    event_date: NaiveDate,
    invoice_id: Option<Uuid>,
    status: String,
    recorded_by: Uuid,
    created_at: DateTime<Utc>,
}

impl UsageRow {
    pub(crate) fn into_domain(self) -> Result<UsageRecord, DatabaseError> {
        let kind = match (self.utility.as_deref(), self.service_id) {
            (Some(utility), None) => UsageKind::Utility {
                utility: UtilityType::parse(utility).ok_or_else(|| {
                    DatabaseError::CorruptRow(format!("unknown utility '{}'", utility))
                })?,
            },
            (None, Some(service_id)) => UsageKind::Service {
                service_id: ServiceId::from_uuid(service_id),
            },
            _ => {
                return Err(DatabaseError::CorruptRow(format!(
                    "usage record {} has an inconsistent kind",
                    self.usage_record_id
                )))
            }
        };
        let status = UsageStatus::parse(&self.status).ok_or_else(|| {
            DatabaseError::CorruptRow(format!("unknown usage status '{}'", self.status))
        })?;
        let currency = parse_currency(&self.currency)?;
        Ok(UsageRecord {
            id: UsageRecordId::from_uuid(self.usage_record_id),
            room_id: RoomId::from_uuid(self.room_id),
            kind,
            start_reading: self.start_reading,
            end_reading: self.end_reading,
            quantity: self.quantity,
            unit_price: Money::new(self.unit_price, currency),
            amount: Money::new(self.amount, currency),
            event_date: self.event_date,
            invoice_id: self.invoice_id.map(InvoiceId::from_uuid),
            status,
            recorded_by: LandlordId::from_uuid(self.recorded_by),
            created_at: self.created_at,
        })
    }
}

const USAGE_COLUMNS: &str = "usage_record_id, room_id, utility, service_id, start_reading, \
     end_reading, quantity, unit_price, amount, currency, event_date, invoice_id, status, \
     recorded_by, created_at";

impl MeteringRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records a metered utility reading for a room
    ///
    /// One transaction: lock the room's reading chain, resolve the
    /// applicable price at `event_date`, replay the chain through the
    /// domain ledger, insert the new row. `NoPriceFound` rejects the whole
    /// write.
    pub async fn record_reading(
        &self,
        room_id: RoomId,
        utility: UtilityType,
        start_reading: Decimal,
        end_reading: Decimal,
        event_date: NaiveDate,
        recorded_by: LandlordId,
    ) -> Result<UsageRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let property_id = room_property(&mut tx, room_id).await?;
        let subject = PriceSubject::utility(property_id, utility);
        let price = applicable_price(&mut tx, subject, event_date).await?;

        let rows: Vec<UsageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {USAGE_COLUMNS}
            FROM usage_records
            WHERE room_id = $1 AND utility = $2
            ORDER BY created_at
            FOR UPDATE
            "#
        ))
        .bind(room_id.as_uuid())
        .bind(utility.as_str())
        .fetch_all(&mut *tx)
        .await?;
        let chain = rows
            .into_iter()
            .map(UsageRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        let mut ledger = MeterLedger::from_records(room_id, utility, chain);
        let record = ledger
            .record_reading(start_reading, end_reading, &price, event_date, recorded_by)?
            .clone();

        insert_usage(&mut tx, &record).await?;
        tx.commit().await?;

        info!(usage = %record.id, room = %room_id, %utility, "reading persisted");
        Ok(record)
    }

    /// Records a discrete service-usage event for a room
    pub async fn record_service_use(
        &self,
        room_id: RoomId,
        service_id: ServiceId,
        quantity: Decimal,
        event_date: NaiveDate,
        recorded_by: LandlordId,
    ) -> Result<UsageRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let property_id = room_property(&mut tx, room_id).await?;
        let service_property: Option<(Uuid,)> =
            sqlx::query_as("SELECT property_id FROM services WHERE service_id = $1")
                .bind(service_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        match service_property {
            Some((pid,)) if pid == property_id.as_uuid() => {}
            Some(_) => {
                return Err(DatabaseError::ConstraintViolation(format!(
                    "service {} belongs to another property than room {}",
                    service_id, room_id
                ))
                .into())
            }
            None => return Err(DatabaseError::not_found("Service", service_id).into()),
        }

        let price = applicable_price(&mut tx, PriceSubject::service(service_id), event_date).await?;
        let record =
            UsageRecord::service_use(room_id, service_id, quantity, &price, event_date, recorded_by)?;

        insert_usage(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Tombstones a recorded usage row
    pub async fn cancel(&self, id: UsageRecordId) -> Result<UsageRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut record = lock_usage(&mut tx, id).await?;
        record.cancel()?;

        sqlx::query("UPDATE usage_records SET status = $2 WHERE usage_record_id = $1")
            .bind(id.as_uuid())
            .bind(record.status.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Corrects a not-yet-billed reading, repricing against the history
    pub async fn amend_reading(
        &self,
        id: UsageRecordId,
        start_reading: Decimal,
        end_reading: Decimal,
    ) -> Result<UsageRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut record = lock_usage(&mut tx, id).await?;

        let utility = match record.kind {
            UsageKind::Utility { utility } => utility,
            UsageKind::Service { .. } => {
                return Err(MeteringError::PriceSubjectMismatch(
                    "cannot amend readings on a service usage".to_string(),
                )
                .into())
            }
        };
        let property_id = room_property(&mut tx, record.room_id).await?;
        let price = applicable_price(
            &mut tx,
            PriceSubject::utility(property_id, utility),
            record.event_date,
        )
        .await?;
        record.amend_reading(start_reading, end_reading, &price)?;

        update_usage_amounts(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Corrects a not-yet-billed service usage quantity
    pub async fn amend_quantity(
        &self,
        id: UsageRecordId,
        quantity: Decimal,
    ) -> Result<UsageRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut record = lock_usage(&mut tx, id).await?;

        let service_id = match record.kind {
            UsageKind::Service { service_id } => service_id,
            UsageKind::Utility { .. } => {
                return Err(MeteringError::PriceSubjectMismatch(
                    "cannot amend a quantity on a metered reading".to_string(),
                )
                .into())
            }
        };
        let price =
            applicable_price(&mut tx, PriceSubject::service(service_id), record.event_date)
                .await?;
        record.amend_quantity(quantity, &price)?;

        update_usage_amounts(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// All usage rows for a room, in recording order
    pub async fn list_for_room(&self, room_id: RoomId) -> Result<Vec<UsageRecord>, RepositoryError> {
        let rows: Vec<UsageRow> = sqlx::query_as(&format!(
            "SELECT {USAGE_COLUMNS} FROM usage_records WHERE room_id = $1 ORDER BY created_at"
        ))
        .bind(room_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| row.into_domain().map_err(RepositoryError::from))
            .collect()
    }

    /// The landlord owning the room's property
    pub async fn room_owner(&self, room_id: RoomId) -> Result<LandlordId, RepositoryError> {
        let owner: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT p.landlord_id
            FROM rooms r
            JOIN properties p ON p.property_id = r.property_id
            WHERE r.room_id = $1
            "#,
        )
        .bind(room_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        owner
            .map(|(id,)| LandlordId::from_uuid(id))
            .ok_or_else(|| DatabaseError::not_found("Room", room_id).into())
    }

    /// The landlord owning the property a usage record's room belongs to
    pub async fn usage_owner(&self, id: UsageRecordId) -> Result<LandlordId, RepositoryError> {
        let owner: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT p.landlord_id
            FROM usage_records u
            JOIN rooms r ON r.room_id = u.room_id
            JOIN properties p ON p.property_id = r.property_id
            WHERE u.usage_record_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        owner
            .map(|(uuid,)| LandlordId::from_uuid(uuid))
            .ok_or_else(|| DatabaseError::not_found("Usage record", id).into())
    }
}

async fn room_property(
    tx: &mut Transaction<'_, Postgres>,
    room_id: RoomId,
) -> Result<PropertyId, RepositoryError> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT property_id FROM rooms WHERE room_id = $1")
        .bind(room_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?;
    row.map(|(id,)| PropertyId::from_uuid(id))
        .ok_or_else(|| DatabaseError::not_found("Room", room_id).into())
}

async fn applicable_price(
    tx: &mut Transaction<'_, Postgres>,
    subject: PriceSubject,
    as_of: NaiveDate,
) -> Result<PriceRecord, RepositoryError> {
    let (property_id, utility, service_id) = match subject {
        PriceSubject::Utility {
            property_id,
            utility,
        } => (Some(property_id.as_uuid()), Some(utility.as_str()), None),
        PriceSubject::Service { service_id } => (None, None, Some(service_id.as_uuid())),
    };
    let row: Option<(Uuid, Decimal, String, NaiveDate, Uuid, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT price_record_id, unit_price, currency, effective_date, recorded_by, recorded_at
        FROM price_records
        WHERE property_id IS NOT DISTINCT FROM $1
          AND utility IS NOT DISTINCT FROM $2
          AND service_id IS NOT DISTINCT FROM $3
          AND effective_date <= $4
        ORDER BY effective_date DESC
        LIMIT 1
        "#,
    )
    .bind(property_id)
    .bind(utility)
    .bind(service_id)
    .bind(as_of)
    .fetch_optional(&mut **tx)
    .await?;

    let (id, unit_price, currency, effective_date, recorded_by, recorded_at) =
        row.ok_or(PricingError::NoPriceFound { subject, as_of })?;
    Ok(PriceRecord {
        id: core_kernel::PriceRecordId::from_uuid(id),
        subject,
        unit_price: Money::new(unit_price, parse_currency(&currency)?),
        effective_date,
        recorded_by: LandlordId::from_uuid(recorded_by),
        recorded_at,
    })
}

async fn lock_usage(
    tx: &mut Transaction<'_, Postgres>,
    id: UsageRecordId,
) -> Result<UsageRecord, RepositoryError> {
    let row: Option<UsageRow> = sqlx::query_as(&format!(
        "SELECT {USAGE_COLUMNS} FROM usage_records WHERE usage_record_id = $1 FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await?;
    match row {
        Some(row) => Ok(row.into_domain()?),
        None => Err(MeteringError::NotFound(id.to_string()).into()),
    }
}

async fn insert_usage(
    tx: &mut Transaction<'_, Postgres>,
    record: &UsageRecord,
) -> Result<(), RepositoryError> {
    let (utility, service_id) = match record.kind {
        UsageKind::Utility { utility } => (Some(utility.as_str()), None),
        UsageKind::Service { service_id } => (None, Some(service_id.as_uuid())),
    };
    sqlx::query(
        r#"
        INSERT INTO usage_records (
            usage_record_id, room_id, utility, service_id, start_reading, end_reading,
            quantity, unit_price, amount, currency, event_date, invoice_id, status,
            recorded_by, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(record.id.as_uuid())
    .bind(record.room_id.as_uuid())
    .bind(utility)
    .bind(service_id)
    .bind(record.start_reading)
    .bind(record.end_reading)
    .bind(record.quantity)
    .bind(record.unit_price.amount())
    .bind(record.amount.amount())
    .bind(record.amount.currency().code())
    .bind(record.event_date)
    .bind(record.invoice_id.map(|id| id.as_uuid()))
    .bind(record.status.as_str())
    .bind(record.recorded_by.as_uuid())
    .bind(record.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_usage_amounts(
    tx: &mut Transaction<'_, Postgres>,
    record: &UsageRecord,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        UPDATE usage_records
        SET start_reading = $2, end_reading = $3, quantity = $4,
            unit_price = $5, amount = $6
        WHERE usage_record_id = $1
        "#,
    )
    .bind(record.id.as_uuid())
    .bind(record.start_reading)
    .bind(record.end_reading)
    .bind(record.quantity)
    .bind(record.unit_price.amount())
    .bind(record.amount.amount())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
