//! Provider events before normalization.
//!
//! A [`RawEvent`] keeps what the provider said, including its own status
//! vocabulary, so that mapping to the canonical model happens in one place
//! ([`crate::normalize`]).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A start or end as the provider reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RawEventTime {
    DateTime(DateTime<Utc>),
    /// Date without a time-of-day component.
    Date(NaiveDate),
}

impl RawEventTime {
    /// Returns true if the source had no time-of-day component.
    pub fn is_date_only(&self) -> bool {
        matches!(self, Self::Date(_))
    }
}

/// A provider event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Provider-assigned identifier; becomes the canonical `external_id`.
    pub id: String,
    pub start: RawEventTime,
    pub end: RawEventTime,
    pub summary: Option<String>,
    /// Provider status word (`busy`, `tentative`, `oof`, `cancelled`, ...).
    pub status: Option<String>,
    /// Explicit all-day flag when the provider has one.
    pub all_day: Option<bool>,
    pub calendar_id: String,
}

impl RawEvent {
    pub fn new(
        id: impl Into<String>,
        start: RawEventTime,
        end: RawEventTime,
        calendar_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            summary: None,
            status: None,
            all_day: None,
            calendar_id: calendar_id.into(),
        }
    }

    /// Title, falling back to "(No title)" when blank.
    pub fn effective_title(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("(No title)")
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = Some(all_day);
        self
    }
}
