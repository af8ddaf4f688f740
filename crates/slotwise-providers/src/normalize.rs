//! RawEvent to CalendarEvent conversion.
//!
//! Providers speak different status vocabularies. Everything is folded into
//! the four canonical states here; unknown words count as confirmed so that
//! unrecognized external time still blocks a slot.

use chrono::{DateTime, Duration, Utc};
use slotwise_core::time::{is_midnight, start_of_day};
use slotwise_core::{CalendarEvent, EventStatus, new_id};

use crate::raw_event::{RawEvent, RawEventTime};

/// Maps a provider status word to the canonical status.
pub fn map_status(status: Option<&str>) -> EventStatus {
    let Some(status) = status else {
        return EventStatus::Confirmed;
    };
    match status.trim().to_ascii_lowercase().as_str() {
        "confirmed" | "busy" | "oof" | "outofoffice" | "out-of-office" | "workingelsewhere" => {
            EventStatus::Confirmed
        }
        "tentative" | "free" | "transparent" | "unknown" => EventStatus::Tentative,
        "cancelled" | "canceled" | "declined" => EventStatus::Cancelled,
        "deleted" | "removed" => EventStatus::Deleted,
        _ => EventStatus::Confirmed,
    }
}

fn to_utc(time: RawEventTime) -> DateTime<Utc> {
    match time {
        RawEventTime::DateTime(dt) => dt,
        RawEventTime::Date(date) => start_of_day(date),
    }
}

/// Returns true if the event covers whole days.
///
/// Date-only sources are all-day. Otherwise the provider's flag wins, and
/// failing that a midnight-to-midnight 24 hour span counts.
pub fn is_all_day(raw: &RawEvent) -> bool {
    if raw.start.is_date_only() {
        return true;
    }
    if let Some(flag) = raw.all_day {
        return flag;
    }
    let start = to_utc(raw.start);
    let end = to_utc(raw.end);
    end - start == Duration::hours(24) && is_midnight(start)
}

/// UTC start and end of a provider event.
///
/// A missing or inverted end becomes one day for all-day events and a zero
/// length span otherwise.
pub fn event_bounds(raw: &RawEvent) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = to_utc(raw.start);
    let end = to_utc(raw.end);
    if end > start {
        (start, end)
    } else if is_all_day(raw) {
        (start, start + Duration::days(1))
    } else {
        (start, start)
    }
}

/// Converts a provider event into a fresh canonical event.
///
/// The returned event has a new id; the sync upsert keeps the stored id when
/// the `(integration_id, external_id)` pair already exists.
pub fn normalize_event(
    raw: &RawEvent,
    integration_id: &str,
    synced_at: DateTime<Utc>,
) -> CalendarEvent {
    let all_day = is_all_day(raw);
    let (start, end) = event_bounds(raw);

    CalendarEvent {
        id: new_id(),
        external_id: raw.id.clone(),
        integration_id: integration_id.to_string(),
        title: raw.effective_title().to_string(),
        start,
        end,
        is_all_day: all_day,
        status: map_status(raw.status.as_deref()),
        last_sync: synced_at,
    }
}

/// Normalizes a batch.
pub fn normalize_events(
    raw_events: &[RawEvent],
    integration_id: &str,
    synced_at: DateTime<Utc>,
) -> Vec<CalendarEvent> {
    raw_events
        .iter()
        .map(|raw| normalize_event(raw, integration_id, synced_at))
        .collect()
}
