//! Civil-date ranges for billing periods and contract terms
//!
//! Billing in this system operates on whole civil dates: price effectivity,
//! meter reading dates, invoice periods, and contract terms. There is no
//! timezone handling at this layer; callers supply dates already resolved
//! to the property's local calendar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
}

/// An inclusive range of civil dates
///
/// Used for invoice billing periods (`[period_start, period_end]`) and for
/// the applicability windows of price records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Start of the range (inclusive)
    pub start: NaiveDate,
    /// End of the range (inclusive)
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start > end {
            return Err(TemporalError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns true if this range contains the given date
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Returns true if this range overlaps with another
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of days covered, endpoints included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_range_creation() {
        let range = DateRange::new(d(2025, 1, 1), d(2025, 1, 31)).unwrap();
        assert!(range.contains(d(2025, 1, 15)));
        assert!(range.contains(d(2025, 1, 1)));
        assert!(range.contains(d(2025, 1, 31)));
        assert!(!range.contains(d(2025, 2, 1)));
        assert_eq!(range.days(), 31);
    }

    #[test]
    fn test_rejects_inverted_range() {
        let result = DateRange::new(d(2025, 2, 1), d(2025, 1, 1));
        assert!(matches!(result, Err(TemporalError::InvalidPeriod { .. })));
    }

    #[test]
    fn test_overlap() {
        let jan = DateRange::new(d(2025, 1, 1), d(2025, 1, 31)).unwrap();
        let mid = DateRange::new(d(2025, 1, 20), d(2025, 2, 10)).unwrap();
        let feb = DateRange::new(d(2025, 2, 1), d(2025, 2, 28)).unwrap();

        assert!(jan.overlaps(&mid));
        assert!(mid.overlaps(&feb));
        assert!(!jan.overlaps(&feb));
    }

    #[test]
    fn test_single_day_range() {
        let day = DateRange::new(d(2025, 3, 5), d(2025, 3, 5)).unwrap();
        assert!(day.contains(d(2025, 3, 5)));
        assert_eq!(day.days(), 1);
    }
}
