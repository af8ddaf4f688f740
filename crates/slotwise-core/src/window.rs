//! Basic weekly availability windows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::time::{DayOfWeek, TimeOfDay};

/// The hours a resource is bookable on one day of the week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityWindow {
    pub id: String,
    pub resource_id: String,
    pub day_of_week: DayOfWeek,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl AvailabilityWindow {
    /// Creates an active window after validating day and times.
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        day_of_week: i64,
        start_time: &str,
        end_time: &str,
    ) -> ValidationResult<Self> {
        let window = Self {
            id: id.into(),
            resource_id: resource_id.into(),
            day_of_week: DayOfWeek::new(day_of_week)?,
            start_time: TimeOfDay::parse(start_time)?,
            end_time: TimeOfDay::parse(end_time)?,
            is_active: true,
        };
        window.validate()?;
        Ok(window)
    }

    /// Re-checks invariants, e.g. after deserialization.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.resource_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("resourceId"));
        }
        if self.start_time >= self.end_time {
            return Err(ValidationError::range(
                "availability window",
                self.start_time,
                self.end_time,
            ));
        }
        Ok(())
    }

    /// Builder method to set the active flag.
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Returns true if the window applies to the given date.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.is_active && DayOfWeek::of(date) == self.day_of_week
    }

    /// The concrete `[start, end)` of this window on a date.
    pub fn bounds_on(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start_time.on(date), self.end_time.on(date))
    }

    /// Returns true if the wall-clock ranges of two windows on the same day overlap.
    pub fn overlaps(&self, other: &AvailabilityWindow) -> bool {
        self.resource_id == other.resource_id
            && self.day_of_week == other.day_of_week
            && self.start_time < other.end_time
            && self.end_time > other.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_window() {
        let w = AvailabilityWindow::new("w1", "room-a", 1, "08:00", "18:00").unwrap();
        assert_eq!(w.day_of_week, DayOfWeek::MONDAY);
        assert!(w.is_active);
    }

    #[test]
    fn rejects_inverted_or_empty_times() {
        assert!(matches!(
            AvailabilityWindow::new("w1", "room-a", 1, "18:00", "08:00"),
            Err(ValidationError::InvalidRange { .. })
        ));
        assert!(AvailabilityWindow::new("w1", "room-a", 1, "09:00", "09:00").is_err());
    }

    #[test]
    fn rejects_bad_day_and_format() {
        assert_eq!(
            AvailabilityWindow::new("w1", "room-a", 7, "08:00", "18:00"),
            Err(ValidationError::InvalidDayOfWeek(7))
        );
        assert!(matches!(
            AvailabilityWindow::new("w1", "room-a", 1, "8:00", "18:00"),
            Err(ValidationError::InvalidTimeOfDay(_))
        ));
    }

    #[test]
    fn overlap_requires_same_day_and_resource() {
        let a = AvailabilityWindow::new("a", "room-a", 1, "08:00", "12:00").unwrap();
        let b = AvailabilityWindow::new("b", "room-a", 1, "11:00", "14:00").unwrap();
        let c = AvailabilityWindow::new("c", "room-a", 2, "11:00", "14:00").unwrap();
        let d = AvailabilityWindow::new("d", "room-a", 1, "12:00", "14:00").unwrap();
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn deserialize_then_validate() {
        let json = r#"{"id":"w","resourceId":"r","dayOfWeek":3,"startTime":"12:00","endTime":"10:00"}"#;
        let w: AvailabilityWindow = serde_json::from_str(json).unwrap();
        assert!(w.is_active);
        assert!(w.validate().is_err());
    }
}
