//! Time primitives.
//!
//! This module provides [`TimeWindow`] for query ranges, the [`overlaps`]
//! predicate every conflict check is built on, and the validated wall-clock
//! types [`TimeOfDay`] and [`DayOfWeek`] used by availability windows and
//! schedules.
//!
//! All wall-clock values are interpreted in the organizational timezone,
//! which is UTC for this engine.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Zero-padded 24-hour `HH:mm`.
static TIME_OF_DAY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9])$").expect("invalid time-of-day regex")
});

/// Returns true if `[start1, end1)` and `[start2, end2)` overlap.
///
/// Adjacent ranges (one ends exactly when the other starts) do not overlap.
pub fn overlaps(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && end1 > start2
}

/// Midnight (UTC) at the start of the given date.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Returns true if the datetime is exactly midnight.
pub fn is_midnight(dt: DateTime<Utc>) -> bool {
    dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0
}

/// A query range, half-open `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window, rejecting empty or inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ValidationResult<Self> {
        if start >= end {
            return Err(ValidationError::range("time window", start, end));
        }
        Ok(Self { start, end })
    }

    /// Creates a time window from a start time and a positive duration.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> ValidationResult<Self> {
        Self::new(start, start + duration)
    }

    /// The whole calendar day containing `date`.
    pub fn for_date(date: NaiveDate) -> Self {
        let start = start_of_day(date);
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Checks if `[start, end)` lies entirely inside this window.
    pub fn encloses(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start <= start && end <= self.end
    }

    /// Checks if `[start, end)` overlaps this window.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        overlaps(self.start, self.end, start, end)
    }

    /// Clips `[start, end)` to this window, or `None` if they do not overlap.
    pub fn clip(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        let start = start.max(self.start);
        let end = end.min(self.end);
        (start < end).then_some(Self { start, end })
    }

    /// Every calendar date the window touches, in order.
    ///
    /// The end date is excluded when the window ends exactly at midnight.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let first = self.start.date_naive();
        let last = (self.end - Duration::nanoseconds(1)).date_naive();
        first.iter_days().take_while(|d| *d <= last).collect()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

/// A wall-clock time with minute precision, written as `HH:mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Midnight, `00:00`.
    pub const MIDNIGHT: Self = Self(NaiveTime::MIN);

    /// Const constructor for literal times. Out-of-range input fails const
    /// evaluation, so use [`TimeOfDay::new`] for runtime values.
    pub const fn constant(hour: u32, minute: u32) -> Self {
        match NaiveTime::from_hms_opt(hour, minute, 0) {
            Some(time) => Self(time),
            None => panic!("hour or minute out of range"),
        }
    }

    /// Creates a time of day from hour and minute.
    pub fn new(hour: u32, minute: u32) -> ValidationResult<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidTimeOfDay(format!("{hour}:{minute}")))
    }

    /// Parses a strict zero-padded `HH:mm` string.
    pub fn parse(s: &str) -> ValidationResult<Self> {
        let caps = TIME_OF_DAY_REGEX
            .captures(s)
            .ok_or_else(|| ValidationError::InvalidTimeOfDay(s.to_string()))?;
        let hour = caps[1]
            .parse()
            .map_err(|_| ValidationError::InvalidTimeOfDay(s.to_string()))?;
        let minute = caps[2]
            .parse()
            .map_err(|_| ValidationError::InvalidTimeOfDay(s.to_string()))?;
        Self::new(hour, minute)
    }

    /// Returns the underlying naive time.
    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }

    /// Combines this time of day with a date.
    pub fn on(&self, date: NaiveDate) -> DateTime<Utc> {
        date.and_time(self.0).and_utc()
    }

    /// Returns the time of day of a datetime, truncated to minutes.
    pub fn of(dt: DateTime<Utc>) -> Self {
        Self(NaiveTime::from_hms_opt(dt.hour(), dt.minute(), 0).unwrap_or(NaiveTime::MIN))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Day of week, 0 (Sunday) through 6 (Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    /// Sunday (0).
    pub const SUNDAY: Self = Self(0);
    /// Monday (1).
    pub const MONDAY: Self = Self(1);
    /// Saturday (6).
    pub const SATURDAY: Self = Self(6);

    /// Validates a raw day number.
    pub fn new(day: i64) -> ValidationResult<Self> {
        if (0..=6).contains(&day) {
            Ok(Self(day as u8))
        } else {
            Err(ValidationError::InvalidDayOfWeek(day))
        }
    }

    /// The day of week a date falls on.
    pub fn of(date: NaiveDate) -> Self {
        Self::from(date.weekday())
    }

    /// Returns the numeric value (0 = Sunday).
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Returns true for Saturday and Sunday.
    pub fn is_weekend(&self) -> bool {
        self.0 == 0 || self.0 == 6
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        Self(day.num_days_from_sunday() as u8)
    }
}

impl TryFrom<i64> for DayOfWeek {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DayOfWeek> for u8 {
    fn from(value: DayOfWeek) -> Self {
        value.0
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        f.write_str(NAMES[self.0 as usize])
    }
}
