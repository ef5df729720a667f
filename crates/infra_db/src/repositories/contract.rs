//! Contract repository
//!
//! Persists contract aggregates with their occupants. Room status is never
//! stored authoritatively: every write that can change occupancy recomputes
//! it from the room's current contracts inside the same transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use core_kernel::{ContractId, LandlordId, Money, OccupantId, RoomId};
use domain_billing::PaymentStatus;
use domain_contract::{
    derive_room_status, Contract, ContractError, ContractStatus, Occupant, PaymentPeriod,
    RoomStatus,
};

use crate::error::{DatabaseError, RepositoryError};
use crate::repositories::parse_currency;

/// Repository for contracts and the derived room status
#[derive(Debug, Clone)]
pub struct ContractRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ContractRow {
    contract_id: Uuid,
    room_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    deposit: Decimal,
    rent: Decimal,
    currency: String,
    payment_period: String,
    payment_due_day: i16,
    status: String,
    created_at: DateTime<Utc>,
    terminated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
struct OccupantRow {
    occupant_id: Uuid,
    full_name: String,
    phone: Option<String>,
    is_representative: bool,
}

impl ContractRow {
    fn into_domain(self, occupants: Vec<Occupant>) -> Result<Contract, DatabaseError> {
        let currency = parse_currency(&self.currency)?;
        let status = ContractStatus::parse(&self.status).ok_or_else(|| {
            DatabaseError::CorruptRow(format!("unknown contract status '{}'", self.status))
        })?;
        let payment_period = PaymentPeriod::parse(&self.payment_period).ok_or_else(|| {
            DatabaseError::CorruptRow(format!(
                "unknown payment period '{}'",
                self.payment_period
            ))
        })?;
        Ok(Contract {
            id: ContractId::from_uuid(self.contract_id),
            room_id: RoomId::from_uuid(self.room_id),
            occupants,
            start_date: self.start_date,
            end_date: self.end_date,
            deposit: Money::new(self.deposit, currency),
            rent: Money::new(self.rent, currency),
            payment_period,
            payment_due_day: self.payment_due_day as u8,
            status,
            created_at: self.created_at,
            terminated_at: self.terminated_at,
        })
    }
}

impl From<OccupantRow> for Occupant {
    fn from(row: OccupantRow) -> Self {
        Occupant {
            id: OccupantId::from_uuid(row.occupant_id),
            full_name: row.full_name,
            phone: row.phone,
            is_representative: row.is_representative,
        }
    }
}

const CONTRACT_COLUMNS: &str = "contract_id, room_id, start_date, end_date, deposit, rent, \
     currency, payment_period, payment_due_day, status, created_at, terminated_at";

impl ContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a contract against a vacant room
    ///
    /// One transaction: lock the room, recompute its status from current
    /// contracts, run the domain validations, insert the contract and
    /// occupants, store the recomputed room status.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_contract(
        &self,
        room_id: RoomId,
        start_date: NaiveDate,
        end_date: NaiveDate,
        deposit: Money,
        rent: Money,
        payment_period: PaymentPeriod,
        payment_due_day: u8,
        occupants: Vec<Occupant>,
        today: NaiveDate,
    ) -> Result<Contract, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        lock_room(&mut tx, room_id).await?;
        let mut contracts = contracts_for_room(&mut tx, room_id).await?;
        let room_status = derive_room_status(&contracts);

        let contract = Contract::create(
            room_id,
            room_status,
            start_date,
            end_date,
            deposit,
            rent,
            payment_period,
            payment_due_day,
            occupants,
            today,
        )?;

        insert_contract(&mut tx, &contract).await?;
        contracts.push(contract.clone());
        store_room_status(&mut tx, room_id, derive_room_status(&contracts)).await?;
        tx.commit().await?;

        Ok(contract)
    }

    /// Terminates a contract, refusing while unpaid or overdue invoices
    /// remain
    ///
    /// Partially paid invoices do not block: the lease can end while a
    /// known balance is being collected.
    pub async fn terminate(&self, id: ContractId) -> Result<Contract, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut contract = lock_contract(&mut tx, id).await?;
        let statuses: Vec<(String,)> =
            sqlx::query_as("SELECT status FROM invoices WHERE contract_id = $1")
                .bind(id.as_uuid())
                .fetch_all(&mut *tx)
                .await?;
        let mut blocking = 0;
        for (status,) in statuses {
            let status = PaymentStatus::parse(&status).ok_or_else(|| {
                DatabaseError::CorruptRow(format!("unknown invoice status '{}'", status))
            })?;
            if status.blocks_termination() {
                blocking += 1;
            }
        }

        contract.terminate(blocking)?;

        sqlx::query(
            "UPDATE contracts SET status = $2, terminated_at = $3 WHERE contract_id = $1",
        )
        .bind(id.as_uuid())
        .bind(contract.status.as_str())
        .bind(contract.terminated_at)
        .execute(&mut *tx)
        .await?;

        let contracts = contracts_for_room(&mut tx, contract.room_id).await?;
        store_room_status(&mut tx, contract.room_id, derive_room_status(&contracts)).await?;
        tx.commit().await?;

        info!(contract = %id, "contract terminated and room status recomputed");
        Ok(contract)
    }

    /// Applies passage-of-time transitions to every open contract
    ///
    /// Returns the number of contracts whose status changed.
    pub async fn roll_statuses(&self, today: NaiveDate) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<ContractRow> = sqlx::query_as(&format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM contracts
            WHERE status IN ('created', 'active')
            ORDER BY contract_id
            FOR UPDATE
            "#
        ))
        .fetch_all(&mut *tx)
        .await?;

        let mut rolled = 0;
        let mut touched_rooms = Vec::new();
        for row in rows {
            let mut contract = row.into_domain(Vec::new())?;
            if contract.roll_status(today) {
                sqlx::query("UPDATE contracts SET status = $2 WHERE contract_id = $1")
                    .bind(contract.id.as_uuid())
                    .bind(contract.status.as_str())
                    .execute(&mut *tx)
                    .await?;
                if !touched_rooms.contains(&contract.room_id) {
                    touched_rooms.push(contract.room_id);
                }
                rolled += 1;
            }
        }
        for room_id in touched_rooms {
            let contracts = contracts_for_room(&mut tx, room_id).await?;
            store_room_status(&mut tx, room_id, derive_room_status(&contracts)).await?;
        }
        tx.commit().await?;

        info!(rolled, %today, "contract statuses rolled");
        Ok(rolled)
    }

    /// Loads a contract with its occupants
    pub async fn get(&self, id: ContractId) -> Result<Contract, RepositoryError> {
        let row: Option<ContractRow> = sqlx::query_as(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE contract_id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        let row = row.ok_or(ContractError::NotFound(id.to_string()))?;

        let occupants: Vec<OccupantRow> = sqlx::query_as(
            r#"
            SELECT occupant_id, full_name, phone, is_representative
            FROM occupants
            WHERE contract_id = $1
            ORDER BY is_representative DESC, full_name
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(row.into_domain(occupants.into_iter().map(Occupant::from).collect())?)
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
            .map(|(uuid,)| LandlordId::from_uuid(uuid))
            .ok_or_else(|| DatabaseError::not_found("Room", room_id).into())
    }

    /// The landlord owning the contract's room's property
    pub async fn contract_owner(&self, id: ContractId) -> Result<LandlordId, RepositoryError> {
        let owner: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT p.landlord_id
            FROM contracts c
            JOIN rooms r ON r.room_id = c.room_id
            JOIN properties p ON p.property_id = r.property_id
            WHERE c.contract_id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        owner
            .map(|(uuid,)| LandlordId::from_uuid(uuid))
            .ok_or_else(|| DatabaseError::not_found("Contract", id).into())
    }
}

async fn lock_room(
    tx: &mut Transaction<'_, Postgres>,
    room_id: RoomId,
) -> Result<(), RepositoryError> {
    let row: Option<(Uuid,)> =
        sqlx::query_as("SELECT room_id FROM rooms WHERE room_id = $1 FOR UPDATE")
            .bind(room_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;
    row.map(|_| ())
        .ok_or_else(|| DatabaseError::not_found("Room", room_id).into())
}

pub(crate) async fn lock_contract(
    tx: &mut Transaction<'_, Postgres>,
    id: ContractId,
) -> Result<Contract, RepositoryError> {
    let row: Option<ContractRow> = sqlx::query_as(&format!(
        "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE contract_id = $1 FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await?;
    let row = row.ok_or(ContractError::NotFound(id.to_string()))?;

    let occupants: Vec<OccupantRow> = sqlx::query_as(
        "SELECT occupant_id, full_name, phone, is_representative FROM occupants WHERE contract_id = $1",
    )
    .bind(id.as_uuid())
    .fetch_all(&mut **tx)
    .await?;

    Ok(row.into_domain(occupants.into_iter().map(Occupant::from).collect())?)
}

async fn contracts_for_room(
    tx: &mut Transaction<'_, Postgres>,
    room_id: RoomId,
) -> Result<Vec<Contract>, RepositoryError> {
    let rows: Vec<ContractRow> = sqlx::query_as(&format!(
        "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE room_id = $1"
    ))
    .bind(room_id.as_uuid())
    .fetch_all(&mut **tx)
    .await?;
    // Occupants are irrelevant to status derivation
    rows.into_iter()
        .map(|row| row.into_domain(Vec::new()).map_err(RepositoryError::from))
        .collect()
}

async fn store_room_status(
    tx: &mut Transaction<'_, Postgres>,
    room_id: RoomId,
    status: RoomStatus,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE rooms SET status = $2 WHERE room_id = $1")
        .bind(room_id.as_uuid())
        .bind(status.as_str())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert_contract(
    tx: &mut Transaction<'_, Postgres>,
    contract: &Contract,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        INSERT INTO contracts (
            contract_id, room_id, start_date, end_date, deposit, rent, currency,
            payment_period, payment_due_day, status, created_at, terminated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(contract.id.as_uuid())
    .bind(contract.room_id.as_uuid())
    .bind(contract.start_date)
    .bind(contract.end_date)
    .bind(contract.deposit.amount())
    .bind(contract.rent.amount())
    .bind(contract.rent.currency().code())
    .bind(contract.payment_period.as_str())
    .bind(i16::from(contract.payment_due_day))
    .bind(contract.status.as_str())
    .bind(contract.created_at)
    .bind(contract.terminated_at)
    .execute(&mut **tx)
    .await?;

    for occupant in &contract.occupants {
        sqlx::query(
            r#"
            INSERT INTO occupants (occupant_id, contract_id, full_name, phone, is_representative)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(occupant.id.as_uuid())
        .bind(contract.id.as_uuid())
        .bind(&occupant.full_name)
        .bind(&occupant.phone)
        .bind(occupant.is_representative)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
