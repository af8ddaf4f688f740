//! Availability resolution.
//!
//! Candidate slots come from the weekly availability windows of a resource,
//! cut into `slot_minutes` pieces. Each slot is then tested against blocking
//! reservations and, depending on [`ExternalMode`], synced external events.
//! Overlapping schedules never remove a slot; their restrictions ride along
//! as [`ScheduleNote`]s and are only enforced by [`AvailabilityResolver::check_slot`].

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use slotwise_core::{
    AvailabilityWindow, CalendarEvent, Occurrence, ProviderKind, Reservation, ReservationStatus,
    Schedule, ScheduleType, TimeWindow, ValidationError,
};
use slotwise_providers::RESERVATION_ID_PREFIX;
use tracing::{debug, instrument, warn};

use crate::error::EngineResult;
use crate::repository::Store;

/// Whether synced external events take part in conflict detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalMode {
    #[default]
    Exclude,
    /// Include them; a failure to load them is logged and ignored.
    Optional,
    /// Include them; a failure to load them fails the query.
    Required,
}

impl FromStr for ExternalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exclude" => Ok(Self::Exclude),
            "optional" => Ok(Self::Optional),
            "required" => Ok(Self::Required),
            other => Err(format!("unknown external mode: {other}")),
        }
    }
}

/// Why a slot is conflicting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ConflictSource {
    Reservation {
        reservation_id: String,
        title: String,
        status: ReservationStatus,
    },
    External {
        event_id: String,
        integration_id: String,
        title: String,
    },
}

impl ConflictSource {
    fn reservation(reservation: &Reservation) -> Self {
        Self::Reservation {
            reservation_id: reservation.id.clone(),
            title: reservation.display_title().to_string(),
            status: reservation.status,
        }
    }

    fn external(event: &CalendarEvent) -> Self {
        Self::External {
            event_id: event.id.clone(),
            integration_id: event.integration_id.clone(),
            title: event.title.clone(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Reservation { title, .. } | Self::External { title, .. } => title,
        }
    }
}

/// Restriction metadata of a schedule overlapping a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleNote {
    pub schedule_id: String,
    pub schedule_type: ScheduleType,
    pub title: String,
    pub min_advance_notice_hours: Option<u32>,
    pub allowed_user_types: Vec<String>,
}

impl From<&Schedule> for ScheduleNote {
    fn from(schedule: &Schedule) -> Self {
        Self {
            schedule_id: schedule.id.clone(),
            schedule_type: schedule.schedule_type,
            title: schedule.display_title(),
            min_advance_notice_hours: schedule.restrictions.min_advance_notice_hours,
            allowed_user_types: schedule.restrictions.allowed_user_types.clone(),
        }
    }
}

/// One bookable piece of an availability window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub window_id: String,
    pub schedules: Vec<ScheduleNote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictingSlot {
    #[serde(flatten)]
    pub slot: Slot,
    pub conflicts: Vec<ConflictSource>,
}

/// The partition of a resource's candidate slots over a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub resource_id: String,
    pub range: TimeWindow,
    pub available: Vec<Slot>,
    pub conflicting: Vec<ConflictingSlot>,
}

impl Availability {
    pub fn slot_count(&self) -> usize {
        self.available.len() + self.conflicting.len()
    }
}

/// A rule a slot breaks. Advisory on queries, fatal on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Restriction {
    OutsideAvailability,
    AdvanceNotice {
        schedule_id: String,
        required_hours: u32,
        notice_hours: i64,
    },
    OutsideScheduleRange {
        schedule_id: String,
    },
    UserTypeNotAllowed {
        schedule_id: String,
        user_type: String,
    },
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutsideAvailability => f.write_str("outside basic availability hours"),
            Self::AdvanceNotice {
                schedule_id,
                required_hours,
                notice_hours,
            } => write!(
                f,
                "schedule {schedule_id} requires {required_hours}h advance notice, got {notice_hours}h"
            ),
            Self::OutsideScheduleRange { schedule_id } => {
                write!(f, "outside the active date range of schedule {schedule_id}")
            }
            Self::UserTypeNotAllowed {
                schedule_id,
                user_type,
            } => write!(f, "user type {user_type} not allowed by schedule {schedule_id}"),
        }
    }
}

/// A detailed single-slot check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotCheck {
    pub available: bool,
    pub conflicts: Vec<ConflictSource>,
    pub restrictions: Vec<Restriction>,
}

/// Input of [`AvailabilityResolver::check_slot`].
#[derive(Debug, Clone)]
pub struct SlotQuery {
    pub resource_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Reference time for advance-notice checks.
    pub now: DateTime<Utc>,
    pub user_type: Option<String>,
    pub external: ExternalMode,
}

impl SlotQuery {
    pub fn new(
        resource_id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            start,
            end,
            now,
            user_type: None,
            external: ExternalMode::Exclude,
        }
    }

    pub fn with_user_type(mut self, user_type: impl Into<String>) -> Self {
        self.user_type = Some(user_type.into());
        self
    }

    pub fn with_external(mut self, external: ExternalMode) -> Self {
        self.external = external;
        self
    }
}

/// Computes availability on demand; nothing is cached between calls.
#[derive(Clone)]
pub struct AvailabilityResolver {
    store: Arc<dyn Store>,
    slot_length: Duration,
    max_range_days: u32,
}

impl AvailabilityResolver {
    pub const DEFAULT_SLOT_MINUTES: u32 = 60;
    pub const DEFAULT_MAX_RANGE_DAYS: u32 = 31;

    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            slot_length: Duration::minutes(i64::from(Self::DEFAULT_SLOT_MINUTES)),
            max_range_days: Self::DEFAULT_MAX_RANGE_DAYS,
        }
    }

    pub fn with_slot_minutes(mut self, minutes: u32) -> Self {
        self.slot_length = Duration::minutes(i64::from(minutes.max(1)));
        self
    }

    /// Longest range `resolve` and the composer accept.
    pub fn with_max_range_days(mut self, days: u32) -> Self {
        self.max_range_days = days.max(1);
        self
    }

    /// Rejects ranges longer than the configured maximum.
    pub fn check_range(&self, range: &TimeWindow) -> EngineResult<()> {
        let limit = Duration::days(i64::from(self.max_range_days));
        if range.duration() > limit {
            let days = (range.duration() + Duration::days(1) - Duration::nanoseconds(1)).num_days();
            return Err(ValidationError::RangeTooLong {
                days,
                max_days: self.max_range_days,
            }
            .into());
        }
        Ok(())
    }

    async fn active_windows(&self, resource_id: &str) -> EngineResult<Vec<AvailabilityWindow>> {
        let mut windows = self.store.windows_for_resource(resource_id).await?;
        windows.retain(|w| w.is_active);
        Ok(windows)
    }

    async fn blocking_reservations(
        &self,
        resource_id: &str,
        range: TimeWindow,
    ) -> EngineResult<Vec<Reservation>> {
        let mut reservations = self
            .store
            .reservations_overlapping(resource_id, range)
            .await?;
        reservations.retain(|r| r.status.blocks());
        Ok(reservations)
    }

    async fn active_schedules(
        &self,
        resource_id: &str,
        range: TimeWindow,
    ) -> EngineResult<Vec<Schedule>> {
        let mut schedules = self.store.schedules_overlapping(resource_id, range).await?;
        schedules.retain(|s| s.is_active);
        Ok(schedules)
    }

    /// Blocking events synced for the resource. Mirrored reservations of an
    /// internal integration are skipped since reservations are checked
    /// directly; its maintenance occurrences are kept.
    async fn load_external(
        &self,
        resource_id: &str,
        range: TimeWindow,
    ) -> EngineResult<Vec<CalendarEvent>> {
        let integrations: Vec<_> = self
            .store
            .integrations_for_resource(resource_id)
            .await?
            .into_iter()
            .filter(|i| i.is_active)
            .collect();
        if integrations.is_empty() {
            return Ok(Vec::new());
        }
        let internal: HashSet<&str> = integrations
            .iter()
            .filter(|i| i.provider == ProviderKind::Internal)
            .map(|i| i.id.as_str())
            .collect();
        let ids: Vec<String> = integrations.iter().map(|i| i.id.clone()).collect();

        let mut events = self.store.events_overlapping(&ids, range).await?;
        events.retain(|e| {
            let mirrored = internal.contains(e.integration_id.as_str())
                && e.external_id.starts_with(RESERVATION_ID_PREFIX);
            e.status.blocks() && !mirrored
        });
        Ok(events)
    }

    /// External events that count as conflicts under `mode`.
    pub async fn external_conflicts(
        &self,
        resource_id: &str,
        range: TimeWindow,
        mode: ExternalMode,
    ) -> EngineResult<Vec<CalendarEvent>> {
        match mode {
            ExternalMode::Exclude => Ok(Vec::new()),
            ExternalMode::Required => self.load_external(resource_id, range).await,
            ExternalMode::Optional => match self.load_external(resource_id, range).await {
                Ok(events) => Ok(events),
                Err(e) => {
                    warn!(resource_id, error = %e, "external conflicts unavailable, ignoring");
                    Ok(Vec::new())
                }
            },
        }
    }

    fn candidate_slots(&self, windows: &[AvailabilityWindow], range: &TimeWindow) -> Vec<Slot> {
        let mut slots = Vec::new();
        for date in range.dates() {
            for window in windows.iter().filter(|w| w.applies_on(date)) {
                let (start, end) = window.bounds_on(date);
                let Some(clipped) = range.clip(start, end) else {
                    continue;
                };
                let mut cursor = clipped.start;
                while cursor < clipped.end {
                    let slot_end = (cursor + self.slot_length).min(clipped.end);
                    slots.push(Slot {
                        start: cursor,
                        end: slot_end,
                        window_id: window.id.clone(),
                        schedules: Vec::new(),
                    });
                    cursor = slot_end;
                }
            }
        }
        slots.sort_by(|a, b| (a.start, &a.window_id).cmp(&(b.start, &b.window_id)));
        slots
    }

    /// Partitions the candidate slots of `[range.start, range.end)`.
    #[instrument(skip(self), fields(range = %range))]
    pub async fn resolve(
        &self,
        resource_id: &str,
        range: TimeWindow,
        mode: ExternalMode,
    ) -> EngineResult<Availability> {
        self.check_range(&range)?;
        let windows = self.active_windows(resource_id).await?;
        let reservations = self.blocking_reservations(resource_id, range).await?;
        let schedules: Vec<(ScheduleNote, Vec<Occurrence>)> = self
            .active_schedules(resource_id, range)
            .await?
            .iter()
            .map(|s| (ScheduleNote::from(s), s.expand(&range)))
            .collect();
        let external = self.external_conflicts(resource_id, range, mode).await?;

        let mut available = Vec::new();
        let mut conflicting = Vec::new();
        for mut slot in self.candidate_slots(&windows, &range) {
            slot.schedules = schedules
                .iter()
                .filter(|(_, occurrences)| {
                    occurrences.iter().any(|o| o.overlaps(slot.start, slot.end))
                })
                .map(|(note, _)| note.clone())
                .collect();

            let conflicts: Vec<ConflictSource> = reservations
                .iter()
                .filter(|r| r.blocks(slot.start, slot.end))
                .map(ConflictSource::reservation)
                .chain(
                    external
                        .iter()
                        .filter(|e| e.blocks(slot.start, slot.end))
                        .map(ConflictSource::external),
                )
                .collect();

            if conflicts.is_empty() {
                available.push(slot);
            } else {
                conflicting.push(ConflictingSlot { slot, conflicts });
            }
        }

        debug!(
            available = available.len(),
            conflicting = conflicting.len(),
            "resolved availability"
        );
        Ok(Availability {
            resource_id: resource_id.to_string(),
            range,
            available,
            conflicting,
        })
    }

    /// Checks one slot against hours, reservations, external events and the
    /// restrictions of every overlapping schedule.
    #[instrument(skip(self, query), fields(resource_id = %query.resource_id))]
    pub async fn check_slot(&self, query: &SlotQuery) -> EngineResult<SlotCheck> {
        let slot = TimeWindow::new(query.start, query.end)?;
        let mut restrictions = Vec::new();

        let date = slot.start.date_naive();
        let inside_hours = self
            .active_windows(&query.resource_id)
            .await?
            .iter()
            .filter(|w| w.applies_on(date))
            .any(|w| {
                let (start, end) = w.bounds_on(date);
                TimeWindow { start, end }.encloses(slot.start, slot.end)
            });
        if !inside_hours {
            restrictions.push(Restriction::OutsideAvailability);
        }

        let mut conflicts: Vec<ConflictSource> = self
            .blocking_reservations(&query.resource_id, slot)
            .await?
            .iter()
            .map(ConflictSource::reservation)
            .collect();
        conflicts.extend(
            self.external_conflicts(&query.resource_id, slot, query.external)
                .await?
                .iter()
                .map(ConflictSource::external),
        );

        for schedule in self.active_schedules(&query.resource_id, slot).await? {
            if !schedule
                .expand(&slot)
                .iter()
                .any(|o| o.overlaps(slot.start, slot.end))
            {
                continue;
            }
            if !schedule.covers(slot.start, slot.end) {
                restrictions.push(Restriction::OutsideScheduleRange {
                    schedule_id: schedule.id.clone(),
                });
            }
            if let Some(required) = schedule.restrictions.min_advance_notice_hours {
                let notice = slot.start - query.now;
                if notice < Duration::hours(i64::from(required)) {
                    restrictions.push(Restriction::AdvanceNotice {
                        schedule_id: schedule.id.clone(),
                        required_hours: required,
                        notice_hours: notice.num_hours(),
                    });
                }
            }
            if let Some(ref user_type) = query.user_type
                && !schedule.restrictions.allows_user_type(user_type)
            {
                restrictions.push(Restriction::UserTypeNotAllowed {
                    schedule_id: schedule.id.clone(),
                    user_type: user_type.clone(),
                });
            }
        }

        Ok(SlotCheck {
            available: conflicts.is_empty() && restrictions.is_empty(),
            conflicts,
            restrictions,
        })
    }
}
