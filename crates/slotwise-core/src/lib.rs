//! Core types: time, availability windows, schedules, reservations,
//! integrations, canonical events and recurrence expansion.

pub mod error;
pub mod event;
pub mod integration;
pub mod recurrence;
pub mod reservation;
pub mod schedule;
pub mod time;
pub mod tracing;
pub mod window;

pub use error::{ValidationError, ValidationResult};
pub use event::{CalendarEvent, EventStatus};
pub use integration::{CalendarIntegration, Credentials, ProviderKind};
pub use recurrence::{Frequency, MAX_OCCURRENCES, Occurrence, Recurrence};
pub use reservation::{Reservation, ReservationStatus};
pub use schedule::{Restrictions, Schedule, ScheduleType};
pub use time::{DayOfWeek, TimeOfDay, TimeWindow, overlaps};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use window::AvailabilityWindow;

/// Generates a fresh entity id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
