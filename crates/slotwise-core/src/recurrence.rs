//! Bounded recurrence expansion.
//!
//! A [`Recurrence`] describes a daily, weekly or monthly series with a fixed
//! interval and optional wall-clock start/end times. [`expand`] turns a series
//! into concrete [`Occurrence`]s over a query window.
//!
//! Expansion walks a day-granularity cursor from the later of the series start
//! and the window start, up to the earlier of the window end and the series
//! end. It never emits more than [`MAX_OCCURRENCES`] occurrences.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::time::{TimeOfDay, TimeWindow, start_of_day};

/// Upper bound on occurrences emitted by a single expansion.
pub const MAX_OCCURRENCES: usize = 100;

/// How often a series repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Returns the lowercase name used in payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(ValidationError::UnknownFrequency(s.to_string())),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.as_str().to_string()
    }
}

/// A recurrence descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    pub frequency: Frequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(default)]
    pub start_time: Option<TimeOfDay>,
    #[serde(default)]
    pub end_time: Option<TimeOfDay>,
}

fn default_interval() -> u32 {
    1
}

impl Recurrence {
    /// Creates a full-day recurrence.
    pub fn new(frequency: Frequency, interval: u32) -> ValidationResult<Self> {
        let recurrence = Self {
            frequency,
            interval,
            start_time: None,
            end_time: None,
        };
        recurrence.validate()?;
        Ok(recurrence)
    }

    /// Builder method to set wall-clock bounds for each occurrence.
    pub fn with_times(mut self, start: &str, end: &str) -> ValidationResult<Self> {
        self.start_time = Some(TimeOfDay::parse(start)?);
        self.end_time = Some(TimeOfDay::parse(end)?);
        self.validate()?;
        Ok(self)
    }

    /// Re-checks invariants.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.interval == 0 {
            return Err(ValidationError::InvalidRecurrenceInterval);
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time)
            && start >= end
        {
            return Err(ValidationError::range("recurrence", start, end));
        }
        Ok(())
    }

    /// The date of the `n`th step after `anchor`.
    fn nth_date(&self, anchor: NaiveDate, n: u64) -> Option<NaiveDate> {
        let steps = n.checked_mul(u64::from(self.interval))?;
        match self.frequency {
            Frequency::Daily => anchor.checked_add_days(Days::new(steps)),
            Frequency::Weekly => anchor.checked_add_days(Days::new(steps.checked_mul(7)?)),
            Frequency::Monthly => {
                let months = u32::try_from(steps).ok()?;
                anchor.checked_add_months(Months::new(months))
            }
        }
    }

    /// The first step index whose date is on or after `from`.
    fn first_step_on_or_after(&self, anchor: NaiveDate, from: NaiveDate) -> u64 {
        if from <= anchor {
            return 0;
        }
        let interval = u64::from(self.interval);
        let guess = match self.frequency {
            Frequency::Daily => ((from - anchor).num_days() as u64).div_ceil(interval),
            Frequency::Weekly => ((from - anchor).num_days() as u64).div_ceil(7 * interval),
            Frequency::Monthly => {
                let months = (i64::from(from.year()) - i64::from(anchor.year())) * 12
                    + i64::from(from.month0())
                    - i64::from(anchor.month0());
                (months.max(0) as u64).div_ceil(interval)
            }
        };
        match self.nth_date(anchor, guess) {
            Some(date) if date < from => guess + 1,
            _ => guess,
        }
    }

    /// Concrete bounds of the occurrence on a date.
    fn occurrence_on(&self, date: NaiveDate) -> Occurrence {
        let start = self.start_time.unwrap_or(TimeOfDay::MIDNIGHT).on(date);
        let next_midnight = start_of_day(date) + Duration::days(1);
        let end = match self.end_time {
            Some(end) if end.on(date) > start => end.on(date),
            _ => next_midnight,
        };
        Occurrence { start, end }
    }
}

/// One concrete instance of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Occurrence {
    /// Returns true if the occurrence overlaps `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        crate::time::overlaps(self.start, self.end, start, end)
    }
}

/// Expands a series over a window.
///
/// Occurrence dates run from the later of the series start and the window
/// start through the day containing the earlier of the series end and the
/// window end. That bound is exclusive as an instant: an end at exactly
/// midnight stops on the previous day, since an occurrence starting at the
/// bound could not overlap the half-open window. An end any time after
/// midnight keeps that day's occurrence.
///
/// Without a recurrence the series is a single occurrence
/// `[series_start, series_end)` (one day when the end is open), emitted only
/// when it overlaps the window.
pub fn expand(
    series_start: DateTime<Utc>,
    series_end: Option<DateTime<Utc>>,
    recurrence: Option<&Recurrence>,
    window: &TimeWindow,
) -> Vec<Occurrence> {
    let Some(recurrence) = recurrence else {
        let end = series_end.unwrap_or(series_start + Duration::days(1));
        return if window.overlaps(series_start, end) {
            vec![Occurrence {
                start: series_start,
                end,
            }]
        } else {
            Vec::new()
        };
    };

    let limit = series_end.map_or(window.end, |end| end.min(window.end));
    let cursor_start = series_start.max(window.start);
    if cursor_start >= limit {
        return Vec::new();
    }

    let anchor = series_start.date_naive();
    let from = cursor_start.date_naive();
    let last = (limit - Duration::nanoseconds(1)).date_naive();

    let mut occurrences = Vec::new();
    let mut step = recurrence.first_step_on_or_after(anchor, from);
    while occurrences.len() < MAX_OCCURRENCES {
        let Some(date) = recurrence.nth_date(anchor, step) else {
            break;
        };
        if date > last {
            break;
        }
        occurrences.push(recurrence.occurrence_on(date));
        step += 1;
    }

    if occurrences.len() == MAX_OCCURRENCES {
        tracing::debug!(
            frequency = %recurrence.frequency,
            interval = recurrence.interval,
            "recurrence expansion hit the occurrence cap"
        );
    }

    occurrences
}
