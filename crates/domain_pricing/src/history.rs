//! Price history per subject
//!
//! Keeps one subject's price records ordered by effective date and answers
//! the applicable-price lookup. All temporal price resolution in the system
//! goes through [`PriceHistory::applicable_at`] so the rule (latest
//! effective date on or before the query date) is defined exactly once.

use chrono::NaiveDate;
use core_kernel::{DateRange, LandlordId, Money, PriceRecordId};
use tracing::debug;

use crate::error::PricingError;
use crate::price::{PriceRecord, PriceSubject};

/// Ordered price history for one subject
#[derive(Debug, Clone)]
pub struct PriceHistory {
    subject: PriceSubject,
    /// Sorted ascending by effective_date; dates are unique
    records: Vec<PriceRecord>,
}

impl PriceHistory {
    /// Creates an empty history for a subject
    pub fn new(subject: PriceSubject) -> Self {
        Self {
            subject,
            records: Vec::new(),
        }
    }

    /// Rebuilds a history from stored records (e.g., loaded from the database)
    pub fn from_records(
        subject: PriceSubject,
        mut records: Vec<PriceRecord>,
    ) -> Result<Self, PricingError> {
        records.sort_by_key(|r| r.effective_date);
        for pair in records.windows(2) {
            if pair[0].effective_date == pair[1].effective_date {
                return Err(PricingError::DuplicateEffectiveDate {
                    subject,
                    effective_date: pair[0].effective_date,
                });
            }
        }
        Ok(Self { subject, records })
    }

    /// Returns the subject this history prices
    pub fn subject(&self) -> PriceSubject {
        self.subject
    }

    /// Returns all records, ascending by effective date
    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    /// Appends a new price record
    ///
    /// # Errors
    ///
    /// - `InvalidPrice` when the unit price is not strictly positive
    /// - `DuplicateEffectiveDate` when a record already exists for the date
    pub fn add(
        &mut self,
        unit_price: Money,
        effective_date: NaiveDate,
        recorded_by: LandlordId,
    ) -> Result<&PriceRecord, PricingError> {
        if !unit_price.is_positive() {
            return Err(PricingError::InvalidPrice {
                amount: unit_price.amount(),
            });
        }
        if self
            .records
            .iter()
            .any(|r| r.effective_date == effective_date)
        {
            return Err(PricingError::DuplicateEffectiveDate {
                subject: self.subject,
                effective_date,
            });
        }

        let record = PriceRecord::new(self.subject, unit_price, effective_date, recorded_by);
        debug!(subject = %self.subject, %effective_date, price = %unit_price, "price recorded");

        let pos = self
            .records
            .partition_point(|r| r.effective_date < effective_date);
        self.records.insert(pos, record);
        Ok(&self.records[pos])
    }

    /// Returns the record applicable on `as_of`: the one with the greatest
    /// effective date that is on or before `as_of`
    ///
    /// # Errors
    ///
    /// `NoPriceFound` when no record is effective yet. Callers must surface
    /// this as a rejection; defaulting to zero would silently misbill.
    pub fn applicable_at(&self, as_of: NaiveDate) -> Result<&PriceRecord, PricingError> {
        self.records
            .iter()
            .rev()
            .find(|r| r.effective_date <= as_of)
            .ok_or(PricingError::NoPriceFound {
                subject: self.subject,
                as_of,
            })
    }

    /// The window a record is applicable for: from its effective date until
    /// the day before the next record's effective date (open-ended for the
    /// latest record)
    pub fn applicability_window(&self, id: PriceRecordId) -> Option<(NaiveDate, Option<NaiveDate>)> {
        let idx = self.records.iter().position(|r| r.id == id)?;
        let start = self.records[idx].effective_date;
        let end = self
            .records
            .get(idx + 1)
            .map(|next| next.effective_date.pred_opt().unwrap_or(next.effective_date));
        Some((start, end))
    }

    /// Removes a price record, provided nothing billed references its window
    ///
    /// `invoiced_periods` are the billing periods of all invoices issued for
    /// rooms of the subject's property (or contracts using the service).
    ///
    /// # Errors
    ///
    /// - `NotFound` when the id is not in this history
    /// - `PriceInUse` when any invoiced period overlaps the record's window
    pub fn remove(
        &mut self,
        id: PriceRecordId,
        invoiced_periods: &[DateRange],
    ) -> Result<PriceRecord, PricingError> {
        let (start, end) = self
            .applicability_window(id)
            .ok_or_else(|| PricingError::NotFound(id.to_string()))?;

        let overlapping = invoiced_periods
            .iter()
            .filter(|p| p.end >= start && end.map_or(true, |e| p.start <= e))
            .count();
        if overlapping > 0 {
            return Err(PricingError::PriceInUse {
                effective_date: start,
                invoiced_periods: overlapping,
            });
        }

        let idx = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| PricingError::NotFound(id.to_string()))?;
        Ok(self.records.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::UtilityType;
    use core_kernel::PropertyId;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn electricity_history() -> PriceHistory {
        PriceHistory::new(PriceSubject::utility(
            PropertyId::new(),
            UtilityType::Electricity,
        ))
    }

    #[test]
    fn test_applicable_price_picks_latest_effective() {
        let mut history = electricity_history();
        let by = LandlordId::new();
        history.add(Money::vnd(dec!(3500)), d(2024, 6, 1), by).unwrap();
        history.add(Money::vnd(dec!(4000)), d(2025, 1, 1), by).unwrap();

        let price = history.applicable_at(d(2025, 1, 15)).unwrap();
        assert_eq!(price.unit_price.amount(), dec!(4000));

        let earlier = history.applicable_at(d(2024, 12, 31)).unwrap();
        assert_eq!(earlier.unit_price.amount(), dec!(3500));
    }

    #[test]
    fn test_no_price_before_first_effective_date() {
        let mut history = electricity_history();
        history
            .add(Money::vnd(dec!(4000)), d(2025, 1, 1), LandlordId::new())
            .unwrap();

        let result = history.applicable_at(d(2024, 12, 1));
        assert!(matches!(result, Err(PricingError::NoPriceFound { .. })));
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let mut history = electricity_history();
        history
            .add(Money::vnd(dec!(4000)), d(2025, 1, 1), LandlordId::new())
            .unwrap();

        let first = history.applicable_at(d(2025, 3, 1)).unwrap().id;
        let second = history.applicable_at(d(2025, 3, 1)).unwrap().id;
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_effective_date_rejected() {
        let mut history = electricity_history();
        let by = LandlordId::new();
        history.add(Money::vnd(dec!(4000)), d(2025, 1, 1), by).unwrap();

        let result = history.add(Money::vnd(dec!(4500)), d(2025, 1, 1), by);
        assert!(matches!(
            result,
            Err(PricingError::DuplicateEffectiveDate { .. })
        ));
        assert_eq!(history.records().len(), 1);
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let mut history = electricity_history();
        let result = history.add(Money::vnd(dec!(0)), d(2025, 1, 1), LandlordId::new());
        assert!(matches!(result, Err(PricingError::InvalidPrice { .. })));
    }

    #[test]
    fn test_remove_blocked_by_invoiced_period() {
        let mut history = electricity_history();
        let by = LandlordId::new();
        let id = history
            .add(Money::vnd(dec!(4000)), d(2025, 1, 1), by)
            .unwrap()
            .id;

        let invoiced = vec![DateRange::new(d(2025, 1, 1), d(2025, 1, 31)).unwrap()];
        let result = history.remove(id, &invoiced);
        assert!(matches!(result, Err(PricingError::PriceInUse { .. })));
        assert_eq!(history.records().len(), 1);
    }

    #[test]
    fn test_remove_allowed_when_window_superseded_before_any_invoice() {
        let mut history = electricity_history();
        let by = LandlordId::new();
        let old_id = history
            .add(Money::vnd(dec!(3500)), d(2024, 1, 1), by)
            .unwrap()
            .id;
        history.add(Money::vnd(dec!(4000)), d(2025, 1, 1), by).unwrap();

        // Only invoices after the old window closed
        let invoiced = vec![DateRange::new(d(2025, 1, 1), d(2025, 1, 31)).unwrap()];
        let removed = history.remove(old_id, &invoiced).unwrap();
        assert_eq!(removed.unit_price.amount(), dec!(3500));
        assert_eq!(history.records().len(), 1);
    }

    #[test]
    fn test_from_records_sorts_and_validates() {
        let subject = PriceSubject::utility(PropertyId::new(), UtilityType::Water);
        let by = LandlordId::new();
        let newer = PriceRecord::new(subject, Money::vnd(dec!(12000)), d(2025, 2, 1), by);
        let older = PriceRecord::new(subject, Money::vnd(dec!(10000)), d(2024, 2, 1), by);

        let history = PriceHistory::from_records(subject, vec![newer, older]).unwrap();
        assert_eq!(history.records()[0].effective_date, d(2024, 2, 1));
    }
}
