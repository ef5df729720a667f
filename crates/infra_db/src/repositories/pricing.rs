//! Pricing repository
//!
//! Persists the append-only price history. The applicable-price lookup is
//! the domain rule expressed in SQL (`ORDER BY effective_date DESC LIMIT
//! 1`); the duplicate-date and removal rules run through [`PriceHistory`]
//! so their rejections carry the domain error messages.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{DateRange, LandlordId, Money, PriceRecordId, PropertyId, ServiceId};
use domain_pricing::{PriceHistory, PriceRecord, PriceSubject, PricingError, UtilityType};

use crate::error::{DatabaseError, RepositoryError};
use crate::repositories::parse_currency;

/// Repository for price records and histories
#[derive(Debug, Clone)]
pub struct PricingRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    price_record_id: Uuid,
    property_id: Option<Uuid>,
    utility: Option<String>,
    service_id: Option<Uuid>,
    unit_price: Decimal,
    currency: String,
    effective_date: NaiveDate,
    recorded_by: Uuid,
    recorded_at: DateTime<Utc>,
}

impl PriceRow {
    fn into_domain(self) -> Result<PriceRecord, DatabaseError> {
        let subject = match (self.property_id, self.utility.as_deref(), self.service_id) {
            (Some(property_id), Some(utility), None) => {
                let utility = UtilityType::parse(utility).ok_or_else(|| {
                    DatabaseError::CorruptRow(format!("unknown utility '{}'", utility))
                })?;
                PriceSubject::utility(PropertyId::from_uuid(property_id), utility)
            }
            (None, None, Some(service_id)) => {
                PriceSubject::service(ServiceId::from_uuid(service_id))
            }
            _ => {
                return Err(DatabaseError::CorruptRow(format!(
                    "price record {} has an inconsistent subject",
                    self.price_record_id
                )))
            }
        };
        Ok(PriceRecord {
            id: PriceRecordId::from_uuid(self.price_record_id),
            subject,
            unit_price: Money::new(self.unit_price, parse_currency(&self.currency)?),
            effective_date: self.effective_date,
            recorded_by: LandlordId::from_uuid(self.recorded_by),
            recorded_at: self.recorded_at,
        })
    }
}

fn subject_columns(subject: PriceSubject) -> (Option<Uuid>, Option<&'static str>, Option<Uuid>) {
    match subject {
        PriceSubject::Utility {
            property_id,
            utility,
        } => (Some(property_id.as_uuid()), Some(utility.as_str()), None),
        PriceSubject::Service { service_id } => (None, None, Some(service_id.as_uuid())),
    }
}

impl PricingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends a price record for the subject
    ///
    /// The domain history validates positivity and date uniqueness first;
    /// the unique constraint backs it up against concurrent writers.
    pub async fn add_price(
        &self,
        subject: PriceSubject,
        unit_price: Money,
        effective_date: NaiveDate,
        recorded_by: LandlordId,
    ) -> Result<PriceRecord, RepositoryError> {
        let mut history = self.history_for(subject).await?;
        let record = history.add(unit_price, effective_date, recorded_by)?.clone();

        let (property_id, utility, service_id) = subject_columns(subject);
        sqlx::query(
            r#"
            INSERT INTO price_records (
                price_record_id, property_id, utility, service_id,
                unit_price, currency, effective_date, recorded_by, recorded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(property_id)
        .bind(utility)
        .bind(service_id)
        .bind(record.unit_price.amount())
        .bind(record.unit_price.currency().code())
        .bind(record.effective_date)
        .bind(record.recorded_by.as_uuid())
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(DatabaseError::from(&e)))?;

        Ok(record)
    }

    /// Loads the full history for a subject, ascending by effective date
    pub async fn history_for(&self, subject: PriceSubject) -> Result<PriceHistory, RepositoryError> {
        let (property_id, utility, service_id) = subject_columns(subject);
        let rows: Vec<PriceRow> = sqlx::query_as(
            r#"
            SELECT price_record_id, property_id, utility, service_id,
                   unit_price, currency, effective_date, recorded_by, recorded_at
            FROM price_records
            WHERE property_id IS NOT DISTINCT FROM $1
              AND utility IS NOT DISTINCT FROM $2
              AND service_id IS NOT DISTINCT FROM $3
            ORDER BY effective_date
            "#,
        )
        .bind(property_id)
        .bind(utility)
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(PriceRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PriceHistory::from_records(subject, records)?)
    }

    /// The record applicable on `as_of` for a subject
    pub async fn applicable_at(
        &self,
        subject: PriceSubject,
        as_of: NaiveDate,
    ) -> Result<PriceRecord, RepositoryError> {
        let (property_id, utility, service_id) = subject_columns(subject);
        let row: Option<PriceRow> = sqlx::query_as(
            r#"
            SELECT price_record_id, property_id, utility, service_id,
                   unit_price, currency, effective_date, recorded_by, recorded_at
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
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into_domain()?),
            None => Err(PricingError::NoPriceFound { subject, as_of }.into()),
        }
    }

    /// Removes a price record unless an invoiced period overlaps the window
    /// it was applicable for
    ///
    /// One transaction: the subject's whole history is locked so the
    /// in-use judgement and the delete commit or roll back as one unit.
    pub async fn remove_price(&self, id: PriceRecordId) -> Result<PriceRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<PriceRow> = sqlx::query_as(
            r#"
            SELECT price_record_id, property_id, utility, service_id,
                   unit_price, currency, effective_date, recorded_by, recorded_at
            FROM price_records
            WHERE price_record_id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;
        let record = row
            .ok_or(PricingError::NotFound(id.to_string()))?
            .into_domain()?;

        let (property_id, utility, service_id) = subject_columns(record.subject);
        let rows: Vec<PriceRow> = sqlx::query_as(
            r#"
            SELECT price_record_id, property_id, utility, service_id,
                   unit_price, currency, effective_date, recorded_by, recorded_at
            FROM price_records
            WHERE property_id IS NOT DISTINCT FROM $1
              AND utility IS NOT DISTINCT FROM $2
              AND service_id IS NOT DISTINCT FROM $3
            ORDER BY effective_date
            FOR UPDATE
            "#,
        )
        .bind(property_id)
        .bind(utility)
        .bind(service_id)
        .fetch_all(&mut *tx)
        .await?;
        let records = rows
            .into_iter()
            .map(PriceRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        let mut history = PriceHistory::from_records(record.subject, records)?;

        let invoiced_periods = invoiced_periods(&mut tx, record.subject).await?;
        let removed = history.remove(id, &invoiced_periods)?;

        sqlx::query("DELETE FROM price_records WHERE price_record_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(removed)
    }

    /// All price records for a property: its utility prices plus the prices
    /// of its services
    pub async fn list_for_property(
        &self,
        property_id: PropertyId,
    ) -> Result<Vec<PriceRecord>, RepositoryError> {
        let rows: Vec<PriceRow> = sqlx::query_as(
            r#"
            SELECT p.price_record_id, p.property_id, p.utility, p.service_id,
                   p.unit_price, p.currency, p.effective_date, p.recorded_by, p.recorded_at
            FROM price_records p
            LEFT JOIN services s ON s.service_id = p.service_id
            WHERE p.property_id = $1 OR s.property_id = $1
            ORDER BY p.effective_date
            "#,
        )
        .bind(property_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| row.into_domain().map_err(RepositoryError::from))
            .collect()
    }

    /// The landlord owning the property a price record applies to
    pub async fn price_owner(&self, id: PriceRecordId) -> Result<LandlordId, RepositoryError> {
        let owner: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT pr.landlord_id
            FROM price_records p
            LEFT JOIN services s ON s.service_id = p.service_id
            JOIN properties pr ON pr.property_id = COALESCE(p.property_id, s.property_id)
            WHERE p.price_record_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        owner
            .map(|(uuid,)| LandlordId::from_uuid(uuid))
            .ok_or_else(|| DatabaseError::not_found("Price record", id).into())
    }

    /// The landlord owning the subject's property
    pub async fn owner_of_subject(
        &self,
        subject: PriceSubject,
    ) -> Result<LandlordId, RepositoryError> {
        let owner: Option<(Uuid,)> = match subject {
            PriceSubject::Utility { property_id, .. } => {
                sqlx::query_as("SELECT landlord_id FROM properties WHERE property_id = $1")
                    .bind(property_id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?
            }
            PriceSubject::Service { service_id } => {
                sqlx::query_as(
                    r#"
                    SELECT p.landlord_id
                    FROM services s
                    JOIN properties p ON p.property_id = s.property_id
                    WHERE s.service_id = $1
                    "#,
                )
                .bind(service_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?
            }
        };
        owner
            .map(|(id,)| LandlordId::from_uuid(id))
            .ok_or_else(|| DatabaseError::not_found("Subject", subject).into())
    }

}

/// Billing periods of every invoice that could reference this subject's
/// prices: invoices of the property's rooms for utilities, invoices with a
/// detail line for the service otherwise
async fn invoiced_periods(
    tx: &mut Transaction<'_, Postgres>,
    subject: PriceSubject,
) -> Result<Vec<DateRange>, RepositoryError> {
    let rows: Vec<(NaiveDate, NaiveDate)> = match subject {
        PriceSubject::Utility { property_id, .. } => {
            sqlx::query_as(
                r#"
                SELECT i.period_start, i.period_end
                FROM invoices i
                JOIN rooms r ON r.room_id = i.room_id
                WHERE r.property_id = $1
                "#,
            )
            .bind(property_id.as_uuid())
            .fetch_all(&mut **tx)
            .await?
        }
        PriceSubject::Service { service_id } => {
            sqlx::query_as(
                r#"
                SELECT DISTINCT i.period_start, i.period_end
                FROM invoices i
                JOIN invoice_details d ON d.invoice_id = i.invoice_id
                WHERE d.service_id = $1
                "#,
            )
            .bind(service_id.as_uuid())
            .fetch_all(&mut **tx)
            .await?
        }
    };

    let mut periods = Vec::with_capacity(rows.len());
    for (start, end) in rows {
        periods.push(
            DateRange::new(start, end)
                .map_err(|e| RepositoryError::Database(DatabaseError::CorruptRow(e.to_string())))?,
        );
    }
    Ok(periods)
}
