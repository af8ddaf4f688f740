//! Persistence contracts.
//!
//! One trait per entity with create, lookup by id, lookup by range, update
//! and delete. [`Store`] bundles them so the engine components can share a
//! single `Arc<dyn Store>`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use slotwise_core::{
    AvailabilityWindow, CalendarEvent, CalendarIntegration, Reservation, Schedule, ScheduleType,
    TimeWindow,
};
use slotwise_providers::{BoxFuture, InternalSource, ProviderError, ProviderResult};
use thiserror::Error;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} {id} already exists")]
    Duplicate { entity: &'static str, id: String },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn duplicate(entity: &'static str, id: impl Into<String>) -> Self {
        Self::Duplicate {
            entity,
            id: id.into(),
        }
    }
}

pub trait AvailabilityRepository: Send + Sync {
    fn create_window<'a>(&'a self, window: AvailabilityWindow)
    -> BoxFuture<'a, RepositoryResult<()>>;

    fn window_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Option<AvailabilityWindow>>>;

    /// All windows of a resource, active or not.
    fn windows_for_resource<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Vec<AvailabilityWindow>>>;

    fn update_window<'a>(&'a self, window: AvailabilityWindow)
    -> BoxFuture<'a, RepositoryResult<()>>;

    fn delete_window<'a>(&'a self, id: &'a str) -> BoxFuture<'a, RepositoryResult<()>>;
}

pub trait ScheduleRepository: Send + Sync {
    fn create_schedule<'a>(&'a self, schedule: Schedule) -> BoxFuture<'a, RepositoryResult<()>>;

    fn schedule_by_id<'a>(&'a self, id: &'a str)
    -> BoxFuture<'a, RepositoryResult<Option<Schedule>>>;

    /// Schedules of a resource whose date range overlaps the window.
    fn schedules_overlapping<'a>(
        &'a self,
        resource_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, RepositoryResult<Vec<Schedule>>>;

    fn schedules_of_type<'a>(
        &'a self,
        resource_id: &'a str,
        schedule_type: ScheduleType,
    ) -> BoxFuture<'a, RepositoryResult<Vec<Schedule>>>;

    fn update_schedule<'a>(&'a self, schedule: Schedule) -> BoxFuture<'a, RepositoryResult<()>>;

    fn delete_schedule<'a>(&'a self, id: &'a str) -> BoxFuture<'a, RepositoryResult<()>>;
}

pub trait ReservationRepository: Send + Sync {
    fn create_reservation<'a>(
        &'a self,
        reservation: Reservation,
    ) -> BoxFuture<'a, RepositoryResult<()>>;

    fn reservation_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Option<Reservation>>>;

    /// Reservations of a resource overlapping the window, any status.
    fn reservations_overlapping<'a>(
        &'a self,
        resource_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, RepositoryResult<Vec<Reservation>>>;

    fn update_reservation<'a>(
        &'a self,
        reservation: Reservation,
    ) -> BoxFuture<'a, RepositoryResult<()>>;

    fn delete_reservation<'a>(&'a self, id: &'a str) -> BoxFuture<'a, RepositoryResult<()>>;
}

pub trait IntegrationRepository: Send + Sync {
    fn create_integration<'a>(
        &'a self,
        integration: CalendarIntegration,
    ) -> BoxFuture<'a, RepositoryResult<()>>;

    fn integration_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Option<CalendarIntegration>>>;

    fn active_integrations(&self) -> BoxFuture<'_, RepositoryResult<Vec<CalendarIntegration>>>;

    fn integrations_for_resource<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Vec<CalendarIntegration>>>;

    fn update_integration<'a>(
        &'a self,
        integration: CalendarIntegration,
    ) -> BoxFuture<'a, RepositoryResult<()>>;

    /// Narrow write used by the sync orchestrator.
    fn set_last_sync<'a>(
        &'a self,
        id: &'a str,
        at: DateTime<Utc>,
    ) -> BoxFuture<'a, RepositoryResult<()>>;

    fn delete_integration<'a>(&'a self, id: &'a str) -> BoxFuture<'a, RepositoryResult<()>>;
}

pub trait EventRepository: Send + Sync {
    /// Fails with `Duplicate` when `(integration_id, external_id)` exists.
    fn insert_event<'a>(&'a self, event: CalendarEvent) -> BoxFuture<'a, RepositoryResult<()>>;

    fn event_by_id<'a>(&'a self, id: &'a str)
    -> BoxFuture<'a, RepositoryResult<Option<CalendarEvent>>>;

    fn find_event<'a>(
        &'a self,
        integration_id: &'a str,
        external_id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Option<CalendarEvent>>>;

    fn events_for_integration<'a>(
        &'a self,
        integration_id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Vec<CalendarEvent>>>;

    /// Events of the given integrations overlapping the window, any status.
    fn events_overlapping<'a>(
        &'a self,
        integration_ids: &'a [String],
        window: TimeWindow,
    ) -> BoxFuture<'a, RepositoryResult<Vec<CalendarEvent>>>;

    fn update_event<'a>(&'a self, event: CalendarEvent) -> BoxFuture<'a, RepositoryResult<()>>;

    fn delete_event<'a>(&'a self, id: &'a str) -> BoxFuture<'a, RepositoryResult<()>>;
}

/// Everything the engine persists.
pub trait Store:
    AvailabilityRepository
    + ScheduleRepository
    + ReservationRepository
    + IntegrationRepository
    + EventRepository
{
}

impl<T> Store for T where
    T: AvailabilityRepository
        + ScheduleRepository
        + ReservationRepository
        + IntegrationRepository
        + EventRepository
{
}

/// Feeds the internal calendar provider from a [`Store`].
pub struct StoreSource {
    store: Arc<dyn Store>,
}

impl StoreSource {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

fn internal_error(e: RepositoryError) -> ProviderError {
    ProviderError::internal(e.to_string())
        .with_provider("INTERNAL")
        .with_source(e)
}

impl InternalSource for StoreSource {
    fn reservations<'a>(
        &'a self,
        resource_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<Reservation>>> {
        Box::pin(async move {
            self.store
                .reservations_overlapping(resource_id, window)
                .await
                .map_err(internal_error)
        })
    }

    fn maintenance_schedules<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<Schedule>>> {
        Box::pin(async move {
            self.store
                .schedules_of_type(resource_id, ScheduleType::Maintenance)
                .await
                .map_err(internal_error)
        })
    }
}
