//! Internal reservations.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::time::overlaps;

/// Shortest allowed reservation.
pub const MIN_DURATION: Duration = Duration::minutes(15);
/// Longest allowed reservation.
pub const MAX_DURATION: Duration = Duration::hours(24);

/// Lifecycle state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    /// Only pending and approved reservations hold a slot.
    pub fn blocks(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's booking of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub resource_id: String,
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: ReservationStatus,
}

impl Reservation {
    /// Creates a pending reservation.
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        user_id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ValidationResult<Self> {
        let reservation = Self {
            id: id.into(),
            resource_id: resource_id.into(),
            user_id: user_id.into(),
            title: String::new(),
            start,
            end,
            status: ReservationStatus::Pending,
        };
        reservation.validate()?;
        Ok(reservation)
    }

    /// Re-checks invariants.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.resource_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("resourceId"));
        }
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("userId"));
        }
        if self.start >= self.end {
            return Err(ValidationError::range("reservation", self.start, self.end));
        }
        let duration = self.duration();
        if duration < MIN_DURATION || duration > MAX_DURATION {
            return Err(ValidationError::InvalidDuration {
                minutes: duration.num_minutes(),
            });
        }
        Ok(())
    }

    /// Builder method to set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: ReservationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns true if this reservation currently holds `[start, end)`.
    pub fn blocks(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.status.blocks() && overlaps(self.start, self.end, start, end)
    }

    /// Title for display, falling back to a generic label.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Reservation"
        } else {
            &self.title
        }
    }
}
