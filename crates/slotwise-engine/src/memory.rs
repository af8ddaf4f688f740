//! In-memory [`Store`](crate::repository::Store) and JSON fixtures.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotwise_core::{
    AvailabilityWindow, CalendarEvent, CalendarIntegration, Reservation, Schedule, ScheduleType,
    TimeWindow,
};
use slotwise_providers::BoxFuture;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::repository::{
    AvailabilityRepository, EventRepository, IntegrationRepository, RepositoryError,
    RepositoryResult, ReservationRepository, ScheduleRepository,
};

/// Seed data for a [`MemoryStore`], usually read from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Fixture {
    pub availability_windows: Vec<AvailabilityWindow>,
    pub schedules: Vec<Schedule>,
    pub reservations: Vec<Reservation>,
    pub integrations: Vec<CalendarIntegration>,
    pub events: Vec<CalendarEvent>,
}

impl Fixture {
    /// Reads a fixture and validates every entity.
    pub fn load_from(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::config(format!("failed to read fixture {}: {e}", path.display()))
        })?;
        let fixture: Fixture = serde_json::from_str(&content).map_err(|e| {
            EngineError::config(format!("failed to parse fixture {}: {e}", path.display()))
        })?;
        fixture.validate()?;
        Ok(fixture)
    }

    pub fn validate(&self) -> EngineResult<()> {
        for window in &self.availability_windows {
            window.validate()?;
        }
        for schedule in &self.schedules {
            schedule.validate()?;
        }
        for reservation in &self.reservations {
            reservation.validate()?;
        }
        for integration in &self.integrations {
            integration.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Tables {
    windows: HashMap<String, AvailabilityWindow>,
    schedules: HashMap<String, Schedule>,
    reservations: HashMap<String, Reservation>,
    integrations: HashMap<String, CalendarIntegration>,
    events: HashMap<String, CalendarEvent>,
    /// `(integration_id, external_id)` to event id.
    event_keys: HashMap<(String, String), String>,
}

impl Tables {
    fn put_event(&mut self, event: CalendarEvent) {
        self.event_keys.insert(
            (event.integration_id.clone(), event.external_id.clone()),
            event.id.clone(),
        );
        self.events.insert(event.id.clone(), event);
    }
}

/// A [`Store`](crate::repository::Store) kept behind a single lock.
///
/// Range lookups return results sorted by start (then id), so callers see a
/// stable order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    /// Makes event range reads fail, to exercise error paths.
    #[cfg(test)]
    events_offline: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let mut tables = Tables::default();
        for w in fixture.availability_windows {
            tables.windows.insert(w.id.clone(), w);
        }
        for s in fixture.schedules {
            tables.schedules.insert(s.id.clone(), s);
        }
        for r in fixture.reservations {
            tables.reservations.insert(r.id.clone(), r);
        }
        for i in fixture.integrations {
            tables.integrations.insert(i.id.clone(), i);
        }
        for e in fixture.events {
            tables.put_event(e);
        }
        debug!(
            windows = tables.windows.len(),
            schedules = tables.schedules.len(),
            reservations = tables.reservations.len(),
            integrations = tables.integrations.len(),
            events = tables.events.len(),
            "loaded fixture"
        );
        let mut store = Self::default();
        *store.tables.get_mut() = tables;
        store
    }

    #[cfg(test)]
    pub(crate) fn with_events_offline(mut self) -> Self {
        self.events_offline = true;
        self
    }

    pub async fn event_count(&self) -> usize {
        self.tables.read().await.events.len()
    }
}

fn insert_new<T>(
    map: &mut HashMap<String, T>,
    entity: &'static str,
    id: String,
    value: T,
) -> RepositoryResult<()> {
    if map.contains_key(&id) {
        return Err(RepositoryError::duplicate(entity, id));
    }
    map.insert(id, value);
    Ok(())
}

fn replace<T>(
    map: &mut HashMap<String, T>,
    entity: &'static str,
    id: String,
    value: T,
) -> RepositoryResult<()> {
    match map.get_mut(&id) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(RepositoryError::not_found(entity, id)),
    }
}

fn remove<T>(map: &mut HashMap<String, T>, entity: &'static str, id: &str) -> RepositoryResult<T> {
    map.remove(id)
        .ok_or_else(|| RepositoryError::not_found(entity, id))
}

impl AvailabilityRepository for MemoryStore {
    fn create_window<'a>(
        &'a self,
        window: AvailabilityWindow,
    ) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            insert_new(&mut tables.windows, "availability window", window.id.clone(), window)
        })
    }

    fn window_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Option<AvailabilityWindow>>> {
        Box::pin(async move { Ok(self.tables.read().await.windows.get(id).cloned()) })
    }

    fn windows_for_resource<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Vec<AvailabilityWindow>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let mut found: Vec<_> = tables
                .windows
                .values()
                .filter(|w| w.resource_id == resource_id)
                .cloned()
                .collect();
            found.sort_by(|a, b| {
                (a.day_of_week, a.start_time, &a.id).cmp(&(b.day_of_week, b.start_time, &b.id))
            });
            Ok(found)
        })
    }

    fn update_window<'a>(
        &'a self,
        window: AvailabilityWindow,
    ) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            replace(&mut tables.windows, "availability window", window.id.clone(), window)
        })
    }

    fn delete_window<'a>(&'a self, id: &'a str) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            remove(&mut self.tables.write().await.windows, "availability window", id).map(drop)
        })
    }
}

impl ScheduleRepository for MemoryStore {
    fn create_schedule<'a>(&'a self, schedule: Schedule) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            insert_new(&mut tables.schedules, "schedule", schedule.id.clone(), schedule)
        })
    }

    fn schedule_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Option<Schedule>>> {
        Box::pin(async move { Ok(self.tables.read().await.schedules.get(id).cloned()) })
    }

    fn schedules_overlapping<'a>(
        &'a self,
        resource_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, RepositoryResult<Vec<Schedule>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let mut found: Vec<_> = tables
                .schedules
                .values()
                .filter(|s| {
                    s.resource_id == resource_id && s.date_range_overlaps(window.start, window.end)
                })
                .cloned()
                .collect();
            found.sort_by(|a, b| (a.start_date, &a.id).cmp(&(b.start_date, &b.id)));
            Ok(found)
        })
    }

    fn schedules_of_type<'a>(
        &'a self,
        resource_id: &'a str,
        schedule_type: ScheduleType,
    ) -> BoxFuture<'a, RepositoryResult<Vec<Schedule>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let mut found: Vec<_> = tables
                .schedules
                .values()
                .filter(|s| s.resource_id == resource_id && s.schedule_type == schedule_type)
                .cloned()
                .collect();
            found.sort_by(|a, b| (a.start_date, &a.id).cmp(&(b.start_date, &b.id)));
            Ok(found)
        })
    }

    fn update_schedule<'a>(&'a self, schedule: Schedule) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            replace(&mut tables.schedules, "schedule", schedule.id.clone(), schedule)
        })
    }

    fn delete_schedule<'a>(&'a self, id: &'a str) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            remove(&mut self.tables.write().await.schedules, "schedule", id).map(drop)
        })
    }
}

impl ReservationRepository for MemoryStore {
    fn create_reservation<'a>(
        &'a self,
        reservation: Reservation,
    ) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            insert_new(
                &mut tables.reservations,
                "reservation",
                reservation.id.clone(),
                reservation,
            )
        })
    }

    fn reservation_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Option<Reservation>>> {
        Box::pin(async move { Ok(self.tables.read().await.reservations.get(id).cloned()) })
    }

    fn reservations_overlapping<'a>(
        &'a self,
        resource_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, RepositoryResult<Vec<Reservation>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let mut found: Vec<_> = tables
                .reservations
                .values()
                .filter(|r| r.resource_id == resource_id && window.overlaps(r.start, r.end))
                .cloned()
                .collect();
            found.sort_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));
            Ok(found)
        })
    }

    fn update_reservation<'a>(
        &'a self,
        reservation: Reservation,
    ) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            replace(
                &mut tables.reservations,
                "reservation",
                reservation.id.clone(),
                reservation,
            )
        })
    }

    fn delete_reservation<'a>(&'a self, id: &'a str) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            remove(&mut self.tables.write().await.reservations, "reservation", id).map(drop)
        })
    }
}

impl IntegrationRepository for MemoryStore {
    fn create_integration<'a>(
        &'a self,
        integration: CalendarIntegration,
    ) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            insert_new(
                &mut tables.integrations,
                "integration",
                integration.id.clone(),
                integration,
            )
        })
    }

    fn integration_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Option<CalendarIntegration>>> {
        Box::pin(async move { Ok(self.tables.read().await.integrations.get(id).cloned()) })
    }

    fn active_integrations(&self) -> BoxFuture<'_, RepositoryResult<Vec<CalendarIntegration>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let mut found: Vec<_> = tables
                .integrations
                .values()
                .filter(|i| i.is_active)
                .cloned()
                .collect();
            found.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(found)
        })
    }

    fn integrations_for_resource<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Vec<CalendarIntegration>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let mut found: Vec<_> = tables
                .integrations
                .values()
                .filter(|i| i.resource_id.as_deref() == Some(resource_id))
                .cloned()
                .collect();
            found.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(found)
        })
    }

    fn update_integration<'a>(
        &'a self,
        integration: CalendarIntegration,
    ) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            replace(
                &mut tables.integrations,
                "integration",
                integration.id.clone(),
                integration,
            )
        })
    }

    fn set_last_sync<'a>(
        &'a self,
        id: &'a str,
        at: DateTime<Utc>,
    ) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let integration = tables
                .integrations
                .get_mut(id)
                .ok_or_else(|| RepositoryError::not_found("integration", id))?;
            integration.last_sync = Some(at);
            Ok(())
        })
    }

    fn delete_integration<'a>(&'a self, id: &'a str) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            remove(&mut self.tables.write().await.integrations, "integration", id).map(drop)
        })
    }
}

impl EventRepository for MemoryStore {
    fn insert_event<'a>(&'a self, event: CalendarEvent) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let key = (event.integration_id.clone(), event.external_id.clone());
            if tables.event_keys.contains_key(&key) || tables.events.contains_key(&event.id) {
                return Err(RepositoryError::duplicate(
                    "calendar event",
                    format!("{}/{}", key.0, key.1),
                ));
            }
            tables.put_event(event);
            Ok(())
        })
    }

    fn event_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Option<CalendarEvent>>> {
        Box::pin(async move { Ok(self.tables.read().await.events.get(id).cloned()) })
    }

    fn find_event<'a>(
        &'a self,
        integration_id: &'a str,
        external_id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Option<CalendarEvent>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let key = (integration_id.to_string(), external_id.to_string());
            Ok(tables
                .event_keys
                .get(&key)
                .and_then(|id| tables.events.get(id))
                .cloned())
        })
    }

    fn events_for_integration<'a>(
        &'a self,
        integration_id: &'a str,
    ) -> BoxFuture<'a, RepositoryResult<Vec<CalendarEvent>>> {
        Box::pin(async move {
            let tables = self.tables.read().await;
            let mut found: Vec<_> = tables
                .events
                .values()
                .filter(|e| e.integration_id == integration_id)
                .cloned()
                .collect();
            found.sort_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));
            Ok(found)
        })
    }

    fn events_overlapping<'a>(
        &'a self,
        integration_ids: &'a [String],
        window: TimeWindow,
    ) -> BoxFuture<'a, RepositoryResult<Vec<CalendarEvent>>> {
        Box::pin(async move {
            #[cfg(test)]
            if self.events_offline {
                return Err(RepositoryError::Backend("event table offline".into()));
            }
            let tables = self.tables.read().await;
            let mut found: Vec<_> = tables
                .events
                .values()
                .filter(|e| {
                    integration_ids.contains(&e.integration_id) && window.overlaps(e.start, e.end)
                })
                .cloned()
                .collect();
            found.sort_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));
            Ok(found)
        })
    }

    fn update_event<'a>(&'a self, event: CalendarEvent) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let Some(stored) = tables.events.get(&event.id) else {
                return Err(RepositoryError::not_found("calendar event", event.id));
            };
            if stored.key() != event.key() {
                return Err(RepositoryError::Backend(format!(
                    "calendar event {} may not change its external identity",
                    event.id
                )));
            }
            tables.put_event(event);
            Ok(())
        })
    }

    fn delete_event<'a>(&'a self, id: &'a str) -> BoxFuture<'a, RepositoryResult<()>> {
        Box::pin(async move {
            let mut tables = self.tables.write().await;
            let event = remove(&mut tables.events, "calendar event", id)?;
            tables
                .event_keys
                .remove(&(event.integration_id, event.external_id));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use slotwise_core::EventStatus;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, h, 0, 0).unwrap()
    }

    fn event(id: &str, external_id: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.into(),
            external_id: external_id.into(),
            integration_id: "int-1".into(),
            title: "Busy".into(),
            start: at(10),
            end: at(11),
            is_all_day: false,
            status: EventStatus::Confirmed,
            last_sync: at(0),
        }
    }

    #[tokio::test]
    async fn event_key_is_unique() {
        let store = MemoryStore::new();
        store.insert_event(event("e1", "x")).await.unwrap();
        let err = store.insert_event(event("e2", "x")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate { .. }));
        assert_eq!(store.event_count().await, 1);

        let found = store.find_event("int-1", "x").await.unwrap().unwrap();
        assert_eq!(found.id, "e1");
        store.delete_event("e1").await.unwrap();
        assert!(store.find_event("int-1", "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn range_queries_are_half_open() {
        let store = MemoryStore::new();
        let r = Reservation::new("r1", "room", "u", at(10), at(11)).unwrap();
        store.create_reservation(r).await.unwrap();

        let touching = TimeWindow::new(at(11), at(12)).unwrap();
        assert!(store
            .reservations_overlapping("room", touching)
            .await
            .unwrap()
            .is_empty());

        let inside = TimeWindow::new(at(10) + Duration::minutes(30), at(12)).unwrap();
        assert_eq!(
            store.reservations_overlapping("room", inside).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn last_sync_on_unknown_integration() {
        let store = MemoryStore::new();
        let err = store.set_last_sync("nope", at(9)).await.unwrap_err();
        assert_eq!(err, RepositoryError::not_found("integration", "nope"));
    }

    #[test]
    fn fixture_rejects_invalid_entities() {
        let json = r#"{"availabilityWindows":[{"id":"w","resourceId":"room","dayOfWeek":1,"startTime":"18:00","endTime":"08:00"}]}"#;
        let fixture: Fixture = serde_json::from_str(json).unwrap();
        assert!(matches!(
            fixture.validate(),
            Err(EngineError::Validation(_))
        ));
    }
}
