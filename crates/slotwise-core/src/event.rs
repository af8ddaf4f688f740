//! Canonical calendar events imported from providers.
//!
//! Every provider adapter normalizes its payloads into a [`CalendarEvent`].
//! Events are unique per `(integration_id, external_id)`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::overlaps;

/// The canonical four-state event status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// The time is taken.
    #[default]
    Confirmed,
    /// The time is probably taken.
    Tentative,
    /// The event was cancelled at the source.
    Cancelled,
    /// The event was removed at the source.
    Deleted,
}

impl EventStatus {
    /// Cancelled and deleted events never block a slot.
    pub fn blocks(self) -> bool {
        matches!(self, Self::Confirmed | Self::Tentative)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Tentative => "TENTATIVE",
            Self::Cancelled => "CANCELLED",
            Self::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider event in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    /// Identifier assigned by the provider.
    pub external_id: String,
    pub integration_id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub status: EventStatus,
    pub last_sync: DateTime<Utc>,
}

impl CalendarEvent {
    /// Returns true if the event blocks `[start, end)`.
    pub fn blocks(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.status.blocks() && overlaps(self.start, self.end, start, end)
    }

    /// Returns the `(integration_id, external_id)` identity.
    pub fn key(&self) -> (&str, &str) {
        (&self.integration_id, &self.external_id)
    }

    /// Copies provider-owned fields from a freshly fetched version,
    /// keeping the stored id.
    pub fn absorb(&mut self, fresh: CalendarEvent) {
        self.title = fresh.title;
        self.start = fresh.start;
        self.end = fresh.end;
        self.is_all_day = fresh.is_all_day;
        self.status = fresh.status;
        self.last_sync = fresh.last_sync;
    }
}
