//! Common types used across the platform

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// GPS coordinates in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A named farm location as submitted by the farmer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

impl Location {
    pub fn coordinates(&self) -> GpsCoordinates {
        GpsCoordinates::new(self.latitude, self.longitude)
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// `days` consecutive days beginning at `start`; at least one day
    pub fn following(start: NaiveDate, days: u32) -> Self {
        let span = Duration::days(i64::from(days.saturating_sub(1)));
        Self::new(start, start.checked_add_signed(span).unwrap_or(NaiveDate::MAX))
    }

    pub fn intersects(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Days shared by both ranges
    pub fn overlap(&self, other: &DateRange) -> Option<DateRange> {
        self.intersects(other)
            .then(|| DateRange::new(self.start.max(other.start), self.end.min(other.end)))
    }

    /// Number of days covered, counting both ends
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_range_intersection() {
        let q2 = DateRange::new(date(2025, 4, 1), date(2025, 6, 30));
        let horizon = DateRange::new(date(2025, 6, 25), date(2025, 7, 10));
        let later = DateRange::new(date(2025, 7, 1), date(2025, 7, 16));

        assert!(q2.intersects(&horizon));
        assert!(!q2.intersects(&later));
        assert_eq!(q2.len_days(), 91);

        let shared_days = q2.overlap(&horizon).unwrap();
        assert_eq!(shared_days, DateRange::new(date(2025, 6, 25), date(2025, 6, 30)));
        assert!(q2.overlap(&later).is_none());
    }

    #[test]
    fn test_following_range() {
        let horizon = DateRange::following(date(2025, 6, 25), 16);
        assert_eq!(horizon.end, date(2025, 7, 10));
        assert_eq!(horizon.len_days(), 16);
        assert_eq!(DateRange::following(date(2025, 6, 25), 0).len_days(), 1);
    }

    #[test]
    fn test_location_ranges() {
        let manila = Location {
            latitude: 14.5995,
            longitude: 120.9842,
            name: "Manila".to_string(),
        };
        assert!(manila.validate().is_ok());

        let off_globe = Location {
            latitude: 91.0,
            longitude: 120.0,
            name: "Nowhere".to_string(),
        };
        assert!(off_globe.validate().is_err());

        let unnamed = Location {
            name: String::new(),
            ..manila
        };
        assert!(unnamed.validate().is_err());
    }
}
