//! Price records
//!
//! A price record is a time-versioned unit price for either a metered
//! utility on one property or a fixed service. Records are append-only;
//! corrections are made by adding a new record with a later effective date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{LandlordId, Money, PriceRecordId, PropertyId, ServiceId};

/// Metered utility types billed per consumption unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityType {
    /// Billed per kWh
    Electricity,
    /// Billed per cubic meter
    Water,
}

impl UtilityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UtilityType::Electricity => "electricity",
            UtilityType::Water => "water",
        }
    }

    pub fn parse(s: &str) -> Option<UtilityType> {
        match s {
            "electricity" => Some(UtilityType::Electricity),
            "water" => Some(UtilityType::Water),
            _ => None,
        }
    }
}

impl fmt::Display for UtilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a price record prices: a utility on a property, or a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceSubject {
    Utility {
        property_id: PropertyId,
        utility: UtilityType,
    },
    Service {
        service_id: ServiceId,
    },
}

impl PriceSubject {
    pub fn utility(property_id: PropertyId, utility: UtilityType) -> Self {
        PriceSubject::Utility {
            property_id,
            utility,
        }
    }

    pub fn service(service_id: ServiceId) -> Self {
        PriceSubject::Service { service_id }
    }
}

impl fmt::Display for PriceSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSubject::Utility {
                property_id,
                utility,
            } => write!(f, "{} on {}", utility, property_id),
            PriceSubject::Service { service_id } => write!(f, "service {}", service_id),
        }
    }
}

/// A single time-versioned unit price
///
/// Immutable once created. The record is "applicable" for a query date when
/// it has the greatest `effective_date` not after that date among its
/// subject's records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Unique identifier
    pub id: PriceRecordId,
    /// What this price applies to
    pub subject: PriceSubject,
    /// Price per consumption unit (or per billing period for services)
    pub unit_price: Money,
    /// First date this price applies
    pub effective_date: NaiveDate,
    /// Landlord who recorded the price
    pub recorded_by: LandlordId,
    /// When the record was created
    pub recorded_at: DateTime<Utc>,
}

impl PriceRecord {
    /// Creates a new price record
    pub fn new(
        subject: PriceSubject,
        unit_price: Money,
        effective_date: NaiveDate,
        recorded_by: LandlordId,
    ) -> Self {
        Self {
            id: PriceRecordId::new_v7(),
            subject,
            unit_price,
            effective_date,
            recorded_by,
            recorded_at: Utc::now(),
        }
    }
}
