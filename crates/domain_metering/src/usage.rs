//! Usage records
//!
//! One metered reading or one discrete service use, with its charge computed
//! against the price captured at creation time.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{InvoiceId, LandlordId, Money, RoomId, ServiceId, UsageRecordId};
use domain_pricing::{PriceRecord, PriceSubject, UtilityType};

use crate::error::MeteringError;

/// What kind of consumption a usage record captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UsageKind {
    /// Metered utility consumption (start/end readings)
    Utility { utility: UtilityType },
    /// One discrete use of a service (laundry, cleaning, parking...)
    Service { service_id: ServiceId },
}

impl UsageKind {
    /// Metered kinds carry start/end readings and the continuity invariant
    pub fn is_metered(&self) -> bool {
        matches!(self, UsageKind::Utility { .. })
    }
}

/// Usage record lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageStatus {
    /// Captured, not yet on any invoice
    Recorded,
    /// Folded into an invoice; immutable from here
    Billed,
    /// Tombstoned before billing; kept for the audit chain
    Cancelled,
}

impl UsageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsageStatus::Recorded => "recorded",
            UsageStatus::Billed => "billed",
            UsageStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<UsageStatus> {
        match s {
            "recorded" => Some(UsageStatus::Recorded),
            "billed" => Some(UsageStatus::Billed),
            "cancelled" => Some(UsageStatus::Cancelled),
            _ => None,
        }
    }
}

/// One utility reading or service-consumption event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Unique identifier
    pub id: UsageRecordId,
    /// Room the consumption belongs to
    pub room_id: RoomId,
    /// Utility or service consumed
    pub kind: UsageKind,
    /// Meter value at period start (metered kinds only)
    pub start_reading: Option<Decimal>,
    /// Meter value at period end (metered kinds only)
    pub end_reading: Option<Decimal>,
    /// Consumed quantity (end - start for metered kinds)
    pub quantity: Decimal,
    /// Unit price captured from the price history at creation
    pub unit_price: Money,
    /// quantity x unit_price
    pub amount: Money,
    /// Date the consumption was read or the service used
    pub event_date: NaiveDate,
    /// Invoice this record was billed on, once Billed
    pub invoice_id: Option<InvoiceId>,
    /// Lifecycle status
    pub status: UsageStatus,
    /// Landlord who recorded the event
    pub recorded_by: LandlordId,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    /// Creates a metered utility reading
    ///
    /// Continuity against the previous reading is the ledger's job
    /// ([`crate::MeterLedger::record_reading`]); this constructor validates
    /// the reading pair itself and prices the consumption.
    ///
    /// # Errors
    ///
    /// - `InvalidReading` when `end < start`
    /// - `PriceSubjectMismatch` when the price record prices something else
    pub fn metered(
        room_id: RoomId,
        utility: UtilityType,
        start_reading: Decimal,
        end_reading: Decimal,
        price: &PriceRecord,
        event_date: NaiveDate,
        recorded_by: LandlordId,
    ) -> Result<Self, MeteringError> {
        if end_reading < start_reading {
            return Err(MeteringError::InvalidReading {
                start: start_reading,
                end: end_reading,
            });
        }
        match price.subject {
            PriceSubject::Utility { utility: priced, .. } if priced == utility => {}
            other => {
                return Err(MeteringError::PriceSubjectMismatch(format!(
                    "expected a {} price, got {}",
                    utility, other
                )))
            }
        }

        let quantity = end_reading - start_reading;
        Ok(Self {
            id: UsageRecordId::new_v7(),
            room_id,
            kind: UsageKind::Utility { utility },
            start_reading: Some(start_reading),
            end_reading: Some(end_reading),
            quantity,
            unit_price: price.unit_price,
            amount: price.unit_price * quantity,
            event_date,
            invoice_id: None,
            status: UsageStatus::Recorded,
            recorded_by,
            created_at: Utc::now(),
        })
    }

    /// Creates a discrete service-usage event
    ///
    /// # Errors
    ///
    /// - `InvalidQuantity` when `quantity <= 0`
    /// - `PriceSubjectMismatch` when the price record prices something else
    pub fn service_use(
        room_id: RoomId,
        service_id: ServiceId,
        quantity: Decimal,
        price: &PriceRecord,
        event_date: NaiveDate,
        recorded_by: LandlordId,
    ) -> Result<Self, MeteringError> {
        if quantity <= Decimal::ZERO {
            return Err(MeteringError::InvalidQuantity(quantity));
        }
        match price.subject {
            PriceSubject::Service { service_id: priced } if priced == service_id => {}
            other => {
                return Err(MeteringError::PriceSubjectMismatch(format!(
                    "expected a price for service {}, got {}",
                    service_id, other
                )))
            }
        }

        Ok(Self {
            id: UsageRecordId::new_v7(),
            room_id,
            kind: UsageKind::Service { service_id },
            start_reading: None,
            end_reading: None,
            quantity,
            unit_price: price.unit_price,
            amount: price.unit_price * quantity,
            event_date,
            invoice_id: None,
            status: UsageStatus::Recorded,
            recorded_by,
            created_at: Utc::now(),
        })
    }

    /// Tombstones the record
    ///
    /// Cancellation never deletes: the row stays so the reading chain it
    /// participated in remains auditable.
    pub fn cancel(&mut self) -> Result<(), MeteringError> {
        if self.status != UsageStatus::Recorded {
            return Err(MeteringError::InvalidState {
                operation: "cancel",
                status: self.status,
            });
        }
        self.status = UsageStatus::Cancelled;
        Ok(())
    }

    /// Marks the record as billed on an invoice
    ///
    /// A record can be billed exactly once; `Billed` is terminal.
    pub fn mark_billed(&mut self, invoice_id: InvoiceId) -> Result<(), MeteringError> {
        if self.status != UsageStatus::Recorded {
            return Err(MeteringError::InvalidState {
                operation: "bill",
                status: self.status,
            });
        }
        self.status = UsageStatus::Billed;
        self.invoice_id = Some(invoice_id);
        Ok(())
    }

    /// Corrects a not-yet-billed metered reading
    ///
    /// Recomputes quantity and amount against the (possibly unchanged)
    /// applicable price.
    pub fn amend_reading(
        &mut self,
        start_reading: Decimal,
        end_reading: Decimal,
        price: &PriceRecord,
    ) -> Result<(), MeteringError> {
        if self.status != UsageStatus::Recorded {
            return Err(MeteringError::InvalidState {
                operation: "amend",
                status: self.status,
            });
        }
        if !self.kind.is_metered() {
            return Err(MeteringError::PriceSubjectMismatch(
                "cannot amend readings on a service usage".to_string(),
            ));
        }
        if end_reading < start_reading {
            return Err(MeteringError::InvalidReading {
                start: start_reading,
                end: end_reading,
            });
        }

        self.start_reading = Some(start_reading);
        self.end_reading = Some(end_reading);
        self.quantity = end_reading - start_reading;
        self.unit_price = price.unit_price;
        self.amount = price.unit_price * self.quantity;
        Ok(())
    }

    /// Corrects a not-yet-billed service usage quantity
    pub fn amend_quantity(
        &mut self,
        quantity: Decimal,
        price: &PriceRecord,
    ) -> Result<(), MeteringError> {
        if self.status != UsageStatus::Recorded {
            return Err(MeteringError::InvalidState {
                operation: "amend",
                status: self.status,
            });
        }
        if quantity <= Decimal::ZERO {
            return Err(MeteringError::InvalidQuantity(quantity));
        }

        self.quantity = quantity;
        self.unit_price = price.unit_price;
        self.amount = price.unit_price * quantity;
        Ok(())
    }
}
