//! Per-room meter ledgers
//!
//! A [`MeterLedger`] holds the reading chain for one room and one metered
//! utility, enforcing the continuity invariant: each new reading starts
//! exactly where the previous non-cancelled reading ended.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use core_kernel::{LandlordId, RoomId};
use domain_pricing::{PriceRecord, UtilityType};

use crate::error::MeteringError;
use crate::usage::{UsageRecord, UsageStatus};

/// The reading chain for one room and utility
#[derive(Debug, Clone)]
pub struct MeterLedger {
    room_id: RoomId,
    utility: UtilityType,
    /// In recording order; cancelled rows stay in place as tombstones
    records: Vec<UsageRecord>,
}

impl MeterLedger {
    /// Creates an empty ledger
    pub fn new(room_id: RoomId, utility: UtilityType) -> Self {
        Self {
            room_id,
            utility,
            records: Vec::new(),
        }
    }

    /// Rebuilds a ledger from stored records in recording order
    pub fn from_records(room_id: RoomId, utility: UtilityType, records: Vec<UsageRecord>) -> Self {
        Self {
            room_id,
            utility,
            records,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn utility(&self) -> UtilityType {
        self.utility
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    /// The end reading of the last non-cancelled record, if any
    pub fn last_end_reading(&self) -> Option<Decimal> {
        self.records
            .iter()
            .rev()
            .find(|r| r.status != UsageStatus::Cancelled)
            .and_then(|r| r.end_reading)
    }

    /// Records a new reading, enforcing continuity
    ///
    /// # Errors
    ///
    /// - `ReadingDiscontinuity` when `start_reading` differs from the
    ///   previous non-cancelled end reading
    /// - `InvalidReading` when `end < start`
    pub fn record_reading(
        &mut self,
        start_reading: Decimal,
        end_reading: Decimal,
        price: &PriceRecord,
        event_date: NaiveDate,
        recorded_by: LandlordId,
    ) -> Result<&UsageRecord, MeteringError> {
        if let Some(expected) = self.last_end_reading() {
            if start_reading != expected {
                return Err(MeteringError::ReadingDiscontinuity {
                    expected,
                    found: start_reading,
                });
            }
        }

        let record = UsageRecord::metered(
            self.room_id,
            self.utility,
            start_reading,
            end_reading,
            price,
            event_date,
            recorded_by,
        )?;
        debug!(
            room = %self.room_id,
            utility = %self.utility,
            %start_reading,
            %end_reading,
            amount = %record.amount,
            "reading recorded"
        );
        self.records.push(record);
        let last = self.records.len() - 1;
        Ok(&self.records[last])
    }

    /// Cancels a recorded reading by id, keeping the tombstone in the chain
    pub fn cancel(&mut self, id: core_kernel::UsageRecordId) -> Result<(), MeteringError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| MeteringError::NotFound(id.to_string()))?;
        record.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{InvoiceId, Money, PropertyId};
    use domain_pricing::PriceSubject;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn electricity_price(amount: Decimal) -> PriceRecord {
        PriceRecord::new(
            PriceSubject::utility(PropertyId::new(), UtilityType::Electricity),
            Money::vnd(amount),
            d(2025, 1, 1),
            LandlordId::new(),
        )
    }

    #[test]
    fn test_first_reading_needs_no_predecessor() {
        let mut ledger = MeterLedger::new(RoomId::new(), UtilityType::Electricity);
        let price = electricity_price(dec!(4000));

        let record = ledger
            .record_reading(dec!(100), dec!(150), &price, d(2025, 1, 15), LandlordId::new())
            .unwrap();
        assert_eq!(record.quantity, dec!(50));
        assert_eq!(record.amount.amount(), dec!(200000));
        assert_eq!(record.status, UsageStatus::Recorded);
    }

    #[test]
    fn test_discontinuity_rejected_and_nothing_recorded() {
        let mut ledger = MeterLedger::new(RoomId::new(), UtilityType::Electricity);
        let price = electricity_price(dec!(4000));
        let by = LandlordId::new();
        ledger
            .record_reading(dec!(0), dec!(50), &price, d(2025, 1, 1), by)
            .unwrap();

        let result = ledger.record_reading(dec!(40), dec!(90), &price, d(2025, 2, 1), by);
        match result {
            Err(MeteringError::ReadingDiscontinuity { expected, found }) => {
                assert_eq!(expected, dec!(50));
                assert_eq!(found, dec!(40));
            }
            other => panic!("expected discontinuity, got {:?}", other),
        }
        assert_eq!(ledger.records().len(), 1);
    }

    #[test]
    fn test_cancelled_reading_is_skipped_for_continuity() {
        let mut ledger = MeterLedger::new(RoomId::new(), UtilityType::Electricity);
        let price = electricity_price(dec!(4000));
        let by = LandlordId::new();
        ledger
            .record_reading(dec!(0), dec!(50), &price, d(2025, 1, 1), by)
            .unwrap();
        let bad_id = ledger
            .record_reading(dec!(50), dec!(999), &price, d(2025, 2, 1), by)
            .unwrap()
            .id;
        ledger.cancel(bad_id).unwrap();

        // Continuity resumes from the last non-cancelled end (50)
        let record = ledger
            .record_reading(dec!(50), dec!(95), &price, d(2025, 2, 2), by)
            .unwrap();
        assert_eq!(record.quantity, dec!(45));
    }

    #[test]
    fn test_billed_record_cannot_be_cancelled_or_amended() {
        let mut ledger = MeterLedger::new(RoomId::new(), UtilityType::Electricity);
        let price = electricity_price(dec!(4000));
        ledger
            .record_reading(dec!(0), dec!(50), &price, d(2025, 1, 1), LandlordId::new())
            .unwrap();

        let record = &mut ledger.records[0];
        record.mark_billed(InvoiceId::new()).unwrap();

        assert!(matches!(
            record.cancel(),
            Err(MeteringError::InvalidState { .. })
        ));
        assert!(matches!(
            record.amend_reading(dec!(0), dec!(60), &price),
            Err(MeteringError::InvalidState { .. })
        ));
        // And never billed twice
        assert!(matches!(
            record.mark_billed(InvoiceId::new()),
            Err(MeteringError::InvalidState { .. })
        ));
    }
}
