//! Occupants attached to a contract

use serde::{Deserialize, Serialize};

use core_kernel::OccupantId;

/// A person living in the room under a contract
///
/// Exactly one occupant per contract carries `is_representative`; that
/// occupant is the billing contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occupant {
    pub id: OccupantId,
    pub full_name: String,
    pub phone: Option<String>,
    pub is_representative: bool,
}

impl Occupant {
    pub fn new(full_name: impl Into<String>, phone: Option<String>, is_representative: bool) -> Self {
        Self {
            id: OccupantId::new(),
            full_name: full_name.into(),
            phone,
            is_representative,
        }
    }

    /// The representative occupant is the billing contact
    pub fn representative(full_name: impl Into<String>, phone: Option<String>) -> Self {
        Self::new(full_name, phone, true)
    }

    pub fn resident(full_name: impl Into<String>, phone: Option<String>) -> Self {
        Self::new(full_name, phone, false)
    }
}
