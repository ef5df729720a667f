//! Billing repository and orchestrator
//!
//! The transactional use cases of the system live here. "Create invoice"
//! and "record payment" are each one all-or-nothing SQLx transaction:
//! contract and invoice rows are locked with `SELECT ... FOR UPDATE` so
//! concurrent requests serialize, the domain aggregates re-run their rules
//! on the locked state, and any failure rolls the whole unit back.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use core_kernel::{
    ContractId, DateRange, InvoiceDetailId, InvoiceId, LandlordId, Money, RoomId, ServiceId,
    UsageRecordId,
};
use domain_billing::{
    BillingError, ChargeCategory, DetailSpec, Invoice, InvoiceAssembler, InvoiceDetail, Payment,
    PaymentMethod, PaymentReconciler, PaymentStatus,
};

use crate::error::{DatabaseError, RepositoryError};
use crate::repositories::contract::lock_contract;
use crate::repositories::parse_currency;

/// Repository for invoices and payments, and the billing orchestrator
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    invoice_id: Uuid,
    contract_id: Uuid,
    room_id: Uuid,
    period_start: NaiveDate,
    period_end: NaiveDate,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    currency: String,
    total_due: Decimal,
    total_paid: Decimal,
    remaining: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct DetailRow {
    invoice_detail_id: Uuid,
    category: String,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    amount: Decimal,
    usage_record_id: Option<Uuid>,
    service_id: Option<Uuid>,
}

impl InvoiceRow {
    fn into_domain(self, details: Vec<InvoiceDetail>) -> Result<Invoice, DatabaseError> {
        let currency = parse_currency(&self.currency)?;
        let status = PaymentStatus::parse(&self.status).ok_or_else(|| {
            DatabaseError::CorruptRow(format!("unknown invoice status '{}'", self.status))
        })?;
        let period = DateRange::new(self.period_start, self.period_end)
            .map_err(|e| DatabaseError::CorruptRow(e.to_string()))?;
        Ok(Invoice {
            id: InvoiceId::from_uuid(self.invoice_id),
            contract_id: ContractId::from_uuid(self.contract_id),
            room_id: RoomId::from_uuid(self.room_id),
            period,
            issue_date: self.issue_date,
            due_date: self.due_date,
            currency,
            details,
            total_due: Money::new(self.total_due, currency),
            total_paid: Money::new(self.total_paid, currency),
            remaining: Money::new(self.remaining, currency),
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl DetailRow {
    fn into_domain(self, currency: &str) -> Result<InvoiceDetail, DatabaseError> {
        let currency = parse_currency(currency)?;
        let category = ChargeCategory::parse(&self.category).ok_or_else(|| {
            DatabaseError::CorruptRow(format!("unknown charge category '{}'", self.category))
        })?;
        Ok(InvoiceDetail {
            id: InvoiceDetailId::from_uuid(self.invoice_detail_id),
            category,
            description: self.description,
            quantity: self.quantity,
            unit_price: Money::new(self.unit_price, currency),
            amount: Money::new(self.amount, currency),
            usage_record_id: self.usage_record_id.map(UsageRecordId::from_uuid),
            service_id: self.service_id.map(ServiceId::from_uuid),
        })
    }
}

const INVOICE_COLUMNS: &str = "invoice_id, contract_id, room_id, period_start, period_end, \
     issue_date, due_date, currency, total_due, total_paid, remaining, status, created_at, \
     updated_at";

impl BillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the invoice for one contract and billing period
    ///
    /// One transaction: lock the contract row, collect already-invoiced
    /// period ends, lock the period's `Recorded` usage rows, assemble the
    /// invoice through the domain, persist invoice and details, flip the
    /// folded usage rows to `Billed`.
    pub async fn create_invoice(
        &self,
        contract_id: ContractId,
        period: DateRange,
        extras: &[DetailSpec],
        issue_date: NaiveDate,
    ) -> Result<Invoice, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let contract = lock_contract(&mut tx, contract_id).await?;

        let existing: Vec<(NaiveDate,)> =
            sqlx::query_as("SELECT period_end FROM invoices WHERE contract_id = $1")
                .bind(contract_id.as_uuid())
                .fetch_all(&mut *tx)
                .await?;
        let existing_period_ends: Vec<NaiveDate> = existing.into_iter().map(|(d,)| d).collect();

        let usage_rows: Vec<crate::repositories::metering::UsageRow> = sqlx::query_as(
            r#"
            SELECT usage_record_id, room_id, utility, service_id, start_reading, end_reading,
                   quantity, unit_price, amount, currency, event_date, invoice_id, status,
                   recorded_by, created_at
            FROM usage_records
            WHERE room_id = $1 AND status = 'recorded' AND event_date BETWEEN $2 AND $3
            ORDER BY created_at
            FOR UPDATE
            "#,
        )
        .bind(contract.room_id.as_uuid())
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&mut *tx)
        .await?;
        let mut usage = usage_rows
            .into_iter()
            .map(|row| row.into_domain())
            .collect::<Result<Vec<_>, _>>()?;

        let invoice = InvoiceAssembler::assemble(
            &contract,
            period,
            &mut usage,
            extras,
            &existing_period_ends,
            issue_date,
        )?;

        insert_invoice(&mut tx, &invoice).await?;
        for detail in &invoice.details {
            insert_detail(&mut tx, invoice.id, detail).await?;
        }
        for record in usage.iter().filter(|r| r.invoice_id == Some(invoice.id)) {
            sqlx::query(
                "UPDATE usage_records SET status = 'billed', invoice_id = $2 WHERE usage_record_id = $1",
            )
            .bind(record.id.as_uuid())
            .bind(invoice.id.as_uuid())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(
            invoice = %invoice.id,
            contract = %contract_id,
            total = %invoice.total_due,
            "invoice created"
        );
        Ok(invoice)
    }

    /// Records a payment against an invoice
    ///
    /// One transaction: lock the invoice row (serializing concurrent
    /// payments), replay the domain reconciliation on the locked state,
    /// append the payment row, store the updated totals.
    pub async fn record_payment(
        &self,
        invoice_id: InvoiceId,
        amount: Money,
        method: PaymentMethod,
        reference: Option<String>,
        paid_at: NaiveDate,
        recorded_by: LandlordId,
    ) -> Result<(Payment, Invoice), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut invoice = lock_invoice(&mut tx, invoice_id).await?;
        let payment = PaymentReconciler::record_payment(
            &mut invoice,
            amount,
            method,
            reference,
            paid_at,
            recorded_by,
        )?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, invoice_id, amount, currency, method, reference,
                paid_at, recorded_by, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(invoice_id.as_uuid())
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().code())
        .bind(payment.method.as_str())
        .bind(&payment.reference)
        .bind(payment.paid_at)
        .bind(payment.recorded_by.as_uuid())
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        store_invoice_totals(&mut tx, &invoice).await?;
        tx.commit().await?;

        Ok((payment, invoice))
    }

    /// Flags every past-due invoice still carrying a balance as overdue
    pub async fn sweep_overdue(&self, today: NaiveDate) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = 'overdue', updated_at = now()
            WHERE status IN ('unpaid', 'partially_paid') AND remaining > 0 AND due_date < $1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await?;

        let flagged = result.rows_affected();
        info!(flagged, %today, "overdue sweep completed");
        Ok(flagged)
    }

    /// Adds an ad-hoc line to an unsettled invoice
    pub async fn add_detail(
        &self,
        invoice_id: InvoiceId,
        spec: DetailSpec,
    ) -> Result<Invoice, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut invoice = lock_invoice(&mut tx, invoice_id).await?;

        let mut detail = InvoiceDetail::new(
            spec.category,
            spec.description,
            spec.quantity,
            spec.unit_price,
        );
        detail.service_id = spec.service_id;
        let detail_id = detail.id;
        invoice.add_detail(detail)?;

        if let Some(detail) = invoice.details.iter().find(|d| d.id == detail_id) {
            insert_detail(&mut tx, invoice_id, detail).await?;
        }
        store_invoice_totals(&mut tx, &invoice).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    /// Re-prices a line on an unsettled invoice
    pub async fn update_detail(
        &self,
        invoice_id: InvoiceId,
        detail_id: InvoiceDetailId,
        quantity: Decimal,
        unit_price: Money,
    ) -> Result<Invoice, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut invoice = lock_invoice(&mut tx, invoice_id).await?;
        invoice.update_detail(detail_id, quantity, unit_price)?;

        if let Some(detail) = invoice.details.iter().find(|d| d.id == detail_id) {
            sqlx::query(
                r#"
                UPDATE invoice_details
                SET quantity = $2, unit_price = $3, amount = $4
                WHERE invoice_detail_id = $1
                "#,
            )
            .bind(detail_id.as_uuid())
            .bind(detail.quantity)
            .bind(detail.unit_price.amount())
            .bind(detail.amount.amount())
            .execute(&mut *tx)
            .await?;
        }
        store_invoice_totals(&mut tx, &invoice).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    /// Removes a line from an unsettled invoice
    pub async fn remove_detail(
        &self,
        invoice_id: InvoiceId,
        detail_id: InvoiceDetailId,
    ) -> Result<Invoice, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut invoice = lock_invoice(&mut tx, invoice_id).await?;
        invoice.remove_detail(detail_id)?;

        sqlx::query("DELETE FROM invoice_details WHERE invoice_detail_id = $1")
            .bind(detail_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        store_invoice_totals(&mut tx, &invoice).await?;
        tx.commit().await?;
        Ok(invoice)
    }

    /// Loads an invoice with its details
    pub async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, RepositoryError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        let row = row.ok_or(BillingError::NotFound(id.to_string()))?;

        let details: Vec<DetailRow> = sqlx::query_as(
            r#"
            SELECT invoice_detail_id, category, description, quantity, unit_price, amount,
                   usage_record_id, service_id
            FROM invoice_details
            WHERE invoice_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let currency = row.currency.clone();
        let details = details
            .into_iter()
            .map(|d| d.into_domain(&currency))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(row.into_domain(details)?)
    }

    /// Payments recorded against an invoice, in recording order
    pub async fn payments_for_invoice(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Payment>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct PaymentRow {
            payment_id: Uuid,
            invoice_id: Uuid,
            amount: Decimal,
            currency: String,
            method: String,
            reference: Option<String>,
            paid_at: NaiveDate,
            recorded_by: Uuid,
            created_at: DateTime<Utc>,
        }

        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT payment_id, invoice_id, amount, currency, method, reference,
                   paid_at, recorded_by, created_at
            FROM payments
            WHERE invoice_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(invoice_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut payments = Vec::with_capacity(rows.len());
        for row in rows {
            let method = PaymentMethod::parse(&row.method).ok_or_else(|| {
                DatabaseError::CorruptRow(format!("unknown payment method '{}'", row.method))
            })?;
            payments.push(Payment {
                id: core_kernel::PaymentId::from_uuid(row.payment_id),
                invoice_id: InvoiceId::from_uuid(row.invoice_id),
                amount: Money::new(row.amount, parse_currency(&row.currency)?),
                method,
                reference: row.reference,
                paid_at: row.paid_at,
                recorded_by: LandlordId::from_uuid(row.recorded_by),
                created_at: row.created_at,
            });
        }
        Ok(payments)
    }

    /// The landlord owning the invoice's room's property
    pub async fn invoice_owner(&self, id: InvoiceId) -> Result<LandlordId, RepositoryError> {
        let owner: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT p.landlord_id
            FROM invoices i
            JOIN rooms r ON r.room_id = i.room_id
            JOIN properties p ON p.property_id = r.property_id
            WHERE i.invoice_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        owner
            .map(|(uuid,)| LandlordId::from_uuid(uuid))
            .ok_or_else(|| DatabaseError::not_found("Invoice", id).into())
    }
}

async fn lock_invoice(
    tx: &mut Transaction<'_, Postgres>,
    id: InvoiceId,
) -> Result<Invoice, RepositoryError> {
    let row: Option<InvoiceRow> = sqlx::query_as(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1 FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await?;
    let row = row.ok_or(BillingError::NotFound(id.to_string()))?;

    let details: Vec<DetailRow> = sqlx::query_as(
        r#"
        SELECT invoice_detail_id, category, description, quantity, unit_price, amount,
               usage_record_id, service_id
        FROM invoice_details
        WHERE invoice_id = $1
        "#,
    )
    .bind(id.as_uuid())
    .fetch_all(&mut **tx)
    .await?;

    let currency = row.currency.clone();
    let details = details
        .into_iter()
        .map(|d| d.into_domain(&currency))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(row.into_domain(details)?)
}

async fn insert_invoice(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &Invoice,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            invoice_id, contract_id, room_id, period_start, period_end, issue_date,
            due_date, currency, total_due, total_paid, remaining, status,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(invoice.id.as_uuid())
    .bind(invoice.contract_id.as_uuid())
    .bind(invoice.room_id.as_uuid())
    .bind(invoice.period.start)
    .bind(invoice.period.end)
    .bind(invoice.issue_date)
    .bind(invoice.due_date)
    .bind(invoice.currency.code())
    .bind(invoice.total_due.amount())
    .bind(invoice.total_paid.amount())
    .bind(invoice.remaining.amount())
    .bind(invoice.status.as_str())
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| RepositoryError::Database(DatabaseError::from(&e)))?;
    Ok(())
}

async fn insert_detail(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: InvoiceId,
    detail: &InvoiceDetail,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        INSERT INTO invoice_details (
            invoice_detail_id, invoice_id, category, description, quantity,
            unit_price, amount, usage_record_id, service_id
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(detail.id.as_uuid())
    .bind(invoice_id.as_uuid())
    .bind(detail.category.as_str())
    .bind(&detail.description)
    .bind(detail.quantity)
    .bind(detail.unit_price.amount())
    .bind(detail.amount.amount())
    .bind(detail.usage_record_id.map(|id| id.as_uuid()))
    .bind(detail.service_id.map(|id| id.as_uuid()))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn store_invoice_totals(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &Invoice,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        UPDATE invoices
        SET total_due = $2, total_paid = $3, remaining = $4, status = $5, updated_at = $6
        WHERE invoice_id = $1
        "#,
    )
    .bind(invoice.id.as_uuid())
    .bind(invoice.total_due.amount())
    .bind(invoice.total_paid.amount())
    .bind(invoice.remaining.amount())
    .bind(invoice.status.as_str())
    .bind(invoice.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
