//! Validation errors for core types.
//!
//! Every constructor in this crate validates its input and returns a
//! [`ValidationError`] before anything reaches persistence.

use thiserror::Error;

/// Result type for core validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A malformed value rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Time-of-day string is not zero-padded 24-hour `HH:mm`.
    #[error("invalid time of day '{0}', expected HH:mm")]
    InvalidTimeOfDay(String),

    /// Day of week outside 0 (Sunday) ..= 6 (Saturday).
    #[error("invalid day of week {0}, expected 0-6")]
    InvalidDayOfWeek(i64),

    /// Start is not strictly before end.
    #[error("{field}: start {start} must be before end {end}")]
    InvalidRange {
        field: &'static str,
        start: String,
        end: String,
    },

    /// Reservation duration outside the allowed bounds.
    #[error("reservation duration of {minutes} minutes is outside 15 minutes to 24 hours")]
    InvalidDuration { minutes: i64 },

    /// Sync interval outside 5..=1440 minutes.
    #[error("sync interval {0} minutes is outside 5-1440")]
    InvalidSyncInterval(u32),

    /// Query range longer than the configured maximum.
    #[error("query range of {days} days exceeds the {max_days}-day limit")]
    RangeTooLong { days: i64, max_days: u32 },

    /// Recurrence interval below 1.
    #[error("recurrence interval must be at least 1")]
    InvalidRecurrenceInterval,

    /// Frequency string not in the supported set.
    #[error("unknown recurrence frequency '{0}'")]
    UnknownFrequency(String),

    /// Credentials do not have the shape the provider expects.
    #[error("credentials for {provider} must be {expected}")]
    CredentialShape {
        provider: &'static str,
        expected: &'static str,
    },

    /// A required text field is empty.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Any other malformed value.
    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    /// Creates a range error for the given field.
    pub fn range(
        field: &'static str,
        start: impl std::fmt::Display,
        end: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidRange {
            field,
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    /// Creates a generic invalid-field error.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            ValidationError::InvalidDayOfWeek(9).to_string(),
            "invalid day of week 9, expected 0-6"
        );
        assert_eq!(
            ValidationError::range("window", "10:00", "09:00").to_string(),
            "window: start 10:00 must be before end 09:00"
        );
        assert_eq!(
            ValidationError::RangeTooLong {
                days: 400,
                max_days: 31
            }
            .to_string(),
            "query range of 400 days exceeds the 31-day limit"
        );
        assert!(
            ValidationError::InvalidDuration { minutes: 5 }
                .to_string()
                .contains("5 minutes")
        );
    }
}
