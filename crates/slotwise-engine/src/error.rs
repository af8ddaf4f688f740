//! Engine error types.

use slotwise_core::{ScheduleType, ValidationError};
use slotwise_providers::ProviderError;
use thiserror::Error;

use crate::availability::{ConflictSource, Restriction};
use crate::repository::RepositoryError;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// A creation-time overlap the booking rules do not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("availability window overlaps active window {existing_id}")]
    AvailabilityWindow { existing_id: String },

    #[error("{new_type} schedule may not overlap {existing_type} schedule {existing_id}")]
    Schedule {
        existing_id: String,
        existing_type: ScheduleType,
        new_type: ScheduleType,
    },

    #[error("slot overlaps reservation(s) {}", .existing_ids.join(", "))]
    Reservation { existing_ids: Vec<String> },

    #[error("slot overlaps {} external event(s)", .sources.len())]
    External { sources: Vec<ConflictSource> },
}

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// Advisory restrictions turned into a rejection at creation time.
    #[error("restriction violated: {}", join_restrictions(.0))]
    RestrictionViolation(Vec<Restriction>),

    #[error("configuration error: {message}")]
    Config { message: String },
}

fn join_restrictions(restrictions: &[Restriction]) -> String {
    restrictions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true for errors a caller could fix by changing the request.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Conflict(_) | Self::RestrictionViolation(_)
        )
    }
}
