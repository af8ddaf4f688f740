//! Creation-time enforcement.
//!
//! Queries treat restrictions as advisory; the guard turns them into hard
//! rejections and re-checks reservation overlaps right before inserting.
//! Check and insert run under one write lock, so two writes through the same
//! guard cannot both pass the overlap check.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use slotwise_core::{AvailabilityWindow, Reservation, Schedule, TimeWindow};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::availability::{AvailabilityResolver, ConflictSource, ExternalMode, SlotQuery};
use crate::error::{ConflictError, EngineError, EngineResult};
use crate::publisher::{DomainEvent, EventPublisher};
use crate::repository::Store;

pub struct BookingGuard {
    store: Arc<dyn Store>,
    resolver: AvailabilityResolver,
    publisher: Arc<dyn EventPublisher>,
    external: ExternalMode,
    writes: Mutex<()>,
}

impl BookingGuard {
    pub fn new(
        store: Arc<dyn Store>,
        resolver: AvailabilityResolver,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            resolver,
            publisher,
            external: ExternalMode::Exclude,
            writes: Mutex::new(()),
        }
    }

    /// Whether synced external events block reservations.
    pub fn with_external_mode(mut self, external: ExternalMode) -> Self {
        self.external = external;
        self
    }

    pub async fn create_availability_window(
        &self,
        window: AvailabilityWindow,
    ) -> EngineResult<AvailabilityWindow> {
        window.validate()?;
        let _writes = self.writes.lock().await;
        if window.is_active
            && let Some(existing) = self
                .store
                .windows_for_resource(&window.resource_id)
                .await?
                .into_iter()
                .find(|w| w.is_active && w.id != window.id && w.overlaps(&window))
        {
            return Err(ConflictError::AvailabilityWindow {
                existing_id: existing.id,
            }
            .into());
        }

        self.store.create_window(window.clone()).await?;
        info!(window_id = %window.id, resource_id = %window.resource_id, "Availability window created");

        let event = DomainEvent::AvailabilityCreated {
            window_id: window.id.clone(),
            resource_id: window.resource_id.clone(),
        };
        if let Err(e) = self.publisher.publish(event).await {
            warn!(error = %e, "Failed to publish availability.created");
        }
        Ok(window)
    }

    pub async fn create_schedule(&self, schedule: Schedule) -> EngineResult<Schedule> {
        schedule.validate()?;
        let _writes = self.writes.lock().await;
        if schedule.is_active {
            let range = TimeWindow {
                start: schedule.start_date,
                end: schedule.end_date.unwrap_or(DateTime::<Utc>::MAX_UTC),
            };
            let blocking = self
                .store
                .schedules_overlapping(&schedule.resource_id, range)
                .await?
                .into_iter()
                .filter(|s| s.is_active && s.id != schedule.id)
                .find(|s| !schedule.schedule_type.may_overlap(s.schedule_type));
            if let Some(existing) = blocking {
                return Err(ConflictError::Schedule {
                    existing_id: existing.id,
                    existing_type: existing.schedule_type,
                    new_type: schedule.schedule_type,
                }
                .into());
            }
        }

        self.store.create_schedule(schedule.clone()).await?;
        info!(
            schedule_id = %schedule.id,
            schedule_type = %schedule.schedule_type,
            "Schedule created"
        );
        Ok(schedule)
    }

    /// Blocking reservations on `resource_id` overlapping `[start, end)`.
    pub async fn conflicting_reservations(
        &self,
        resource_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<Reservation>> {
        let window = TimeWindow::new(start, end)?;
        let mut found = self
            .store
            .reservations_overlapping(resource_id, window)
            .await?;
        found.retain(|r| r.blocks(start, end));
        Ok(found)
    }

    /// Re-checks overlaps and restrictions, then inserts.
    pub async fn create_reservation(
        &self,
        reservation: Reservation,
        now: DateTime<Utc>,
        user_type: Option<&str>,
    ) -> EngineResult<Reservation> {
        reservation.validate()?;
        let _writes = self.writes.lock().await;

        let overlapping: Vec<String> = self
            .conflicting_reservations(
                &reservation.resource_id,
                reservation.start,
                reservation.end,
            )
            .await?
            .into_iter()
            .filter(|r| r.id != reservation.id)
            .map(|r| r.id)
            .collect();
        if !overlapping.is_empty() {
            return Err(ConflictError::Reservation {
                existing_ids: overlapping,
            }
            .into());
        }

        let mut query = SlotQuery::new(
            reservation.resource_id.clone(),
            reservation.start,
            reservation.end,
            now,
        )
        .with_external(self.external);
        if let Some(user_type) = user_type {
            query = query.with_user_type(user_type);
        }
        let check = self.resolver.check_slot(&query).await?;

        let external: Vec<ConflictSource> = check
            .conflicts
            .into_iter()
            .filter(|c| matches!(c, ConflictSource::External { .. }))
            .collect();
        if !external.is_empty() {
            return Err(ConflictError::External { sources: external }.into());
        }
        if !check.restrictions.is_empty() {
            return Err(EngineError::RestrictionViolation(check.restrictions));
        }

        self.store.create_reservation(reservation.clone()).await?;
        info!(
            reservation_id = %reservation.id,
            resource_id = %reservation.resource_id,
            "Reservation created"
        );
        Ok(reservation)
    }
}
