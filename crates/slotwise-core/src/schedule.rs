//! Institutional schedules and their precedence rules.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::recurrence::{self, Occurrence, Recurrence};
use crate::time::{TimeWindow, overlaps};

/// The kind of a schedule, which decides what it may overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleType {
    Regular,
    Restricted,
    Exception,
    Maintenance,
    AcademicEvent,
}

impl ScheduleType {
    /// Returns true if a new schedule of this type may overlap an existing
    /// schedule of type `existing`.
    ///
    /// Exceptions and maintenance may sit on top of regular schedules only;
    /// academic events may sit on top of regular schedules or exceptions.
    /// Regular and restricted schedules may never overlap anything.
    pub fn may_overlap(self, existing: ScheduleType) -> bool {
        match self {
            Self::Exception | Self::Maintenance => existing == Self::Regular,
            Self::AcademicEvent => matches!(existing, Self::Regular | Self::Exception),
            Self::Regular | Self::Restricted => false,
        }
    }

    /// Returns the wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "REGULAR",
            Self::Restricted => "RESTRICTED",
            Self::Exception => "EXCEPTION",
            Self::Maintenance => "MAINTENANCE",
            Self::AcademicEvent => "ACADEMIC_EVENT",
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking restrictions carried by a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Restrictions {
    /// User types allowed to book; empty means everyone.
    pub allowed_user_types: Vec<String>,
    /// Minimum lead time between now and a slot start.
    pub min_advance_notice_hours: Option<u32>,
    pub priority: i32,
}

impl Restrictions {
    /// Returns true if the user type may book under these restrictions.
    pub fn allows_user_type(&self, user_type: &str) -> bool {
        self.allowed_user_types.is_empty()
            || self
                .allowed_user_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(user_type))
    }
}

/// A (possibly recurring) institutional schedule on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub resource_id: String,
    #[serde(rename = "type")]
    pub schedule_type: ScheduleType,
    #[serde(default)]
    pub title: String,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub restrictions: Restrictions,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Schedule {
    /// Creates an active, non-recurring schedule.
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        schedule_type: ScheduleType,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> ValidationResult<Self> {
        let schedule = Self {
            id: id.into(),
            resource_id: resource_id.into(),
            schedule_type,
            title: String::new(),
            start_date,
            end_date,
            recurrence: None,
            restrictions: Restrictions::default(),
            is_active: true,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Re-checks invariants.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.resource_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("resourceId"));
        }
        if let Some(end) = self.end_date
            && self.start_date >= end
        {
            return Err(ValidationError::range("schedule", self.start_date, end));
        }
        if let Some(ref recurrence) = self.recurrence {
            recurrence.validate()?;
        }
        Ok(())
    }

    /// Builder method to set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder method to attach a recurrence.
    pub fn with_recurrence(mut self, recurrence: Recurrence) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    /// Builder method to set restrictions.
    pub fn with_restrictions(mut self, restrictions: Restrictions) -> Self {
        self.restrictions = restrictions;
        self
    }

    /// Builder method to set the active flag.
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Returns the title, falling back to the schedule type.
    pub fn display_title(&self) -> String {
        if self.title.trim().is_empty() {
            self.schedule_type.to_string()
        } else {
            self.title.clone()
        }
    }

    /// Returns true if the schedule's active date range overlaps `[start, end)`.
    ///
    /// An open-ended schedule runs forever.
    pub fn date_range_overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        match self.end_date {
            Some(schedule_end) => overlaps(self.start_date, schedule_end, start, end),
            None => self.start_date < end,
        }
    }

    /// Returns true if the two schedules' date ranges overlap on the same resource.
    pub fn conflicts_with(&self, other: &Schedule) -> bool {
        if self.resource_id != other.resource_id {
            return false;
        }
        let other_end = other.end_date.unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.date_range_overlaps(other.start_date, other_end)
    }

    /// Returns true if `[start, end)` lies within the schedule's date range.
    pub fn covers(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start >= self.start_date && self.end_date.is_none_or(|schedule_end| end <= schedule_end)
    }

    /// Expands the schedule into concrete occurrences over a window.
    pub fn expand(&self, window: &TimeWindow) -> Vec<Occurrence> {
        recurrence::expand(
            self.start_date,
            self.end_date,
            self.recurrence.as_ref(),
            window,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::Frequency;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn precedence_table() {
        use ScheduleType::*;
        assert!(Exception.may_overlap(Regular));
        assert!(Maintenance.may_overlap(Regular));
        assert!(!Exception.may_overlap(Exception));
        assert!(!Maintenance.may_overlap(AcademicEvent));
        assert!(AcademicEvent.may_overlap(Regular));
        assert!(AcademicEvent.may_overlap(Exception));
        assert!(!AcademicEvent.may_overlap(Maintenance));
        for existing in [Regular, Restricted, Exception, Maintenance, AcademicEvent] {
            assert!(!Regular.may_overlap(existing));
        }
    }

    #[test]
    fn rejects_inverted_dates() {
        let err = Schedule::new(
            "s1",
            "room-a",
            ScheduleType::Regular,
            utc(2025, 3, 10),
            Some(utc(2025, 3, 1)),
        );
        assert!(matches!(err, Err(ValidationError::InvalidRange { .. })));
    }

    #[test]
    fn open_ended_schedules_conflict_with_later_ones() {
        let a = Schedule::new("a", "room-a", ScheduleType::Regular, utc(2025, 1, 1), None).unwrap();
        let b = Schedule::new(
            "b",
            "room-a",
            ScheduleType::Regular,
            utc(2030, 1, 1),
            Some(utc(2030, 2, 1)),
        )
        .unwrap();
        assert!(a.conflicts_with(&b));
        assert!(b.conflicts_with(&a));
    }

    #[test]
    fn other_resources_never_conflict() {
        let a = Schedule::new("a", "room-a", ScheduleType::Regular, utc(2025, 1, 1), None).unwrap();
        let b = Schedule::new("b", "room-b", ScheduleType::Regular, utc(2025, 1, 1), None).unwrap();
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn covers_respects_bounds() {
        let s = Schedule::new(
            "s",
            "room-a",
            ScheduleType::Exception,
            utc(2025, 3, 1),
            Some(utc(2025, 3, 31)),
        )
        .unwrap();
        assert!(s.covers(utc(2025, 3, 5), utc(2025, 3, 6)));
        assert!(!s.covers(utc(2025, 2, 28), utc(2025, 3, 2)));
        assert!(!s.covers(utc(2025, 3, 30), utc(2025, 4, 1)));
    }

    #[test]
    fn deserializes_wire_shape() {
        let json = r#"{
            "id": "s1",
            "resourceId": "room-a",
            "type": "ACADEMIC_EVENT",
            "startDate": "2025-03-01T00:00:00Z",
            "recurrence": {"frequency": "weekly", "interval": 1, "startTime": "09:00", "endTime": "11:00"},
            "restrictions": {"allowedUserTypes": ["staff"], "minAdvanceNoticeHours": 24}
        }"#;
        let s: Schedule = serde_json::from_str(json).unwrap();
        assert_eq!(s.schedule_type, ScheduleType::AcademicEvent);
        assert_eq!(s.recurrence.as_ref().unwrap().frequency, Frequency::Weekly);
        assert!(s.restrictions.allows_user_type("Staff"));
        assert!(!s.restrictions.allows_user_type("student"));
        assert!(s.is_active);
        assert_eq!(s.display_title(), "ACADEMIC_EVENT");
    }
}
