//! Calendar views.
//!
//! A view merges reservations, expanded schedules and synced external events
//! for one resource, optionally padded with synthetic free slots carved out
//! of business hours.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use slotwise_core::{DayOfWeek, ScheduleType, TimeOfDay, TimeWindow, overlaps};
use slotwise_providers::MAINTENANCE_ID_PREFIX;
use tracing::debug;

use crate::availability::{AvailabilityResolver, ExternalMode};
use crate::error::{EngineError, EngineResult};
use crate::repository::Store;

/// Source of a view event. The order breaks ties when sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewEventKind {
    Reservation,
    Schedule,
    Maintenance,
    External,
    Free,
}

impl ViewEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reservation => "reservation",
            Self::Schedule => "schedule",
            Self::Maintenance => "maintenance",
            Self::External => "external",
            Self::Free => "free",
        }
    }
}

impl fmt::Display for ViewEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEvent {
    pub id: String,
    pub kind: ViewEventKind,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub resource_id: String,
    /// Whether the viewer may change this event.
    pub editable: bool,
}

impl ViewEvent {
    fn overlaps(&self, other: &ViewEvent) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    pub resource_id: String,
    pub range: TimeWindow,
    pub events: Vec<ViewEvent>,
    /// Overlapping pairs among non-free events.
    pub conflict_count: usize,
}

impl CalendarView {
    /// One line per event, followed by the conflict count.
    pub fn render_agenda(&self) -> String {
        let mut lines: Vec<String> = self
            .events
            .iter()
            .map(|e| {
                format!(
                    "{} {}-{} [{}] {}{}",
                    e.start.format("%Y-%m-%d"),
                    e.start.format("%H:%M"),
                    e.end.format("%H:%M"),
                    e.kind,
                    e.title,
                    if e.editable { " (editable)" } else { "" }
                )
            })
            .collect();
        if lines.is_empty() {
            lines.push("(no events)".to_string());
        }
        lines.push(format!("conflicts: {}", self.conflict_count));
        lines.join("\n")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    pub include_free: bool,
    /// User id of the viewer; reservations they own are editable.
    pub viewer: Option<String>,
    pub external: ExternalMode,
}

impl ViewOptions {
    pub fn with_free(mut self, include_free: bool) -> Self {
        self.include_free = include_free;
        self
    }

    pub fn with_viewer(mut self, viewer: impl Into<String>) -> Self {
        self.viewer = Some(viewer.into());
        self
    }

    pub fn with_external(mut self, external: ExternalMode) -> Self {
        self.external = external;
        self
    }
}

pub struct CalendarViewComposer {
    store: Arc<dyn Store>,
    resolver: AvailabilityResolver,
    business_start: TimeOfDay,
    business_end: TimeOfDay,
}

impl CalendarViewComposer {
    pub fn new(store: Arc<dyn Store>, resolver: AvailabilityResolver) -> Self {
        Self {
            store,
            resolver,
            business_start: DEFAULT_BUSINESS_START,
            business_end: DEFAULT_BUSINESS_END,
        }
    }

    pub fn with_business_hours(mut self, start: TimeOfDay, end: TimeOfDay) -> EngineResult<Self> {
        if start >= end {
            return Err(EngineError::config(format!(
                "business hours {start}-{end} are inverted"
            )));
        }
        self.business_start = start;
        self.business_end = end;
        Ok(self)
    }

    pub async fn compose(
        &self,
        resource_id: &str,
        range: TimeWindow,
        options: &ViewOptions,
    ) -> EngineResult<CalendarView> {
        self.resolver.check_range(&range)?;
        let mut events = Vec::new();

        for reservation in self
            .store
            .reservations_overlapping(resource_id, range)
            .await?
            .into_iter()
            .filter(|r| r.status.blocks())
        {
            events.push(ViewEvent {
                id: reservation.id.clone(),
                kind: ViewEventKind::Reservation,
                title: reservation.display_title().to_string(),
                start: reservation.start,
                end: reservation.end,
                resource_id: reservation.resource_id.clone(),
                editable: options.viewer.as_deref() == Some(reservation.user_id.as_str()),
            });
        }

        for schedule in self
            .store
            .schedules_overlapping(resource_id, range)
            .await?
            .into_iter()
            .filter(|s| s.is_active)
        {
            let kind = match schedule.schedule_type {
                ScheduleType::Maintenance => ViewEventKind::Maintenance,
                _ => ViewEventKind::Schedule,
            };
            let title = schedule.display_title();
            for occurrence in schedule.expand(&range) {
                events.push(ViewEvent {
                    id: format!("{}:{}", schedule.id, occurrence.start.format("%Y%m%dT%H%M")),
                    kind,
                    title: title.clone(),
                    start: occurrence.start,
                    end: occurrence.end,
                    resource_id: schedule.resource_id.clone(),
                    editable: false,
                });
            }
        }

        // Maintenance is drawn from the schedules above, not from its mirror.
        for event in self
            .resolver
            .external_conflicts(resource_id, range, options.external)
            .await?
            .into_iter()
            .filter(|e| !e.external_id.starts_with(MAINTENANCE_ID_PREFIX))
        {
            events.push(ViewEvent {
                id: event.id,
                kind: ViewEventKind::External,
                title: event.title,
                start: event.start,
                end: event.end,
                resource_id: resource_id.to_string(),
                editable: false,
            });
        }

        if options.include_free {
            let free = self.free_slots(resource_id, &range, &events);
            events.extend(free);
        }

        events.sort_by(|a, b| (a.start, a.end, a.kind).cmp(&(b.start, b.end, b.kind)));
        let conflict_count = count_conflicts(&events);
        debug!(resource_id, events = events.len(), conflict_count, "Composed calendar view");

        Ok(CalendarView {
            resource_id: resource_id.to_string(),
            range,
            events,
            conflict_count,
        })
    }

    /// Business hours on weekdays minus every busy event.
    fn free_slots(&self, resource_id: &str, range: &TimeWindow, busy: &[ViewEvent]) -> Vec<ViewEvent> {
        let mut free = Vec::new();
        for date in range.dates() {
            if DayOfWeek::of(date).is_weekend() {
                continue;
            }
            let Some(hours) = range.clip(self.business_start.on(date), self.business_end.on(date))
            else {
                continue;
            };

            let mut blocked: Vec<(DateTime<Utc>, DateTime<Utc>)> = busy
                .iter()
                .filter(|e| hours.overlaps(e.start, e.end))
                .map(|e| (e.start, e.end))
                .collect();
            blocked.sort();

            let mut cursor = hours.start;
            for (start, end) in blocked {
                if start > cursor {
                    free.push(free_event(resource_id, cursor, start.min(hours.end)));
                }
                cursor = cursor.max(end);
                if cursor >= hours.end {
                    break;
                }
            }
            if cursor < hours.end {
                free.push(free_event(resource_id, cursor, hours.end));
            }
        }
        free
    }
}

pub const DEFAULT_BUSINESS_START: TimeOfDay = TimeOfDay::constant(8, 0);
pub const DEFAULT_BUSINESS_END: TimeOfDay = TimeOfDay::constant(18, 0);

fn free_event(resource_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> ViewEvent {
    ViewEvent {
        id: format!("free:{}", start.format("%Y%m%dT%H%M")),
        kind: ViewEventKind::Free,
        title: "Free".to_string(),
        start,
        end,
        resource_id: resource_id.to_string(),
        editable: true,
    }
}

fn count_conflicts(events: &[ViewEvent]) -> usize {
    let busy: Vec<&ViewEvent> = events
        .iter()
        .filter(|e| e.kind != ViewEventKind::Free)
        .collect();
    let mut count = 0;
    for (i, a) in busy.iter().enumerate() {
        count += busy[i + 1..]
            .iter()
            .filter(|b| a.resource_id == b.resource_id && a.overlaps(b))
            .count();
    }
    count
}
