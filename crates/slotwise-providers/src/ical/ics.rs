//! RFC 5545 parsing into [`RawEvent`]s.

use chrono::{TimeZone, Utc};
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::{RawEvent, RawEventTime};

/// Parses a VCALENDAR body.
///
/// # Errors
///
/// `InvalidResponse` when the body is not an iCalendar document.
pub fn parse_ics_content(ics: &str, calendar_id: &str) -> ProviderResult<Vec<RawEvent>> {
    let body = ics.trim_start_matches('\u{feff}').trim_start();
    if !body
        .get(..15)
        .is_some_and(|head| head.eq_ignore_ascii_case("BEGIN:VCALENDAR"))
    {
        return Err(ProviderError::invalid_response(
            "feed is not an iCalendar document",
        ));
    }

    let calendar: Calendar = body.parse().map_err(|e| {
        warn!(error = %e, "failed to parse iCalendar feed");
        ProviderError::invalid_response(format!("malformed iCalendar feed: {e}"))
    })?;

    Ok(calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => parse_event(event, calendar_id),
            _ => None,
        })
        .collect())
}

fn parse_event(event: &Event, calendar_id: &str) -> Option<RawEvent> {
    let Some(uid) = event.get_uid() else {
        debug!("skipping VEVENT without UID");
        return None;
    };
    let start = convert_time(event.get_start()?);
    // No DTEND: normalization stretches date-only starts to a full day.
    let end = event.get_end().map(convert_time).unwrap_or(start);

    let cancelled = event
        .property_value("STATUS")
        .is_some_and(|s| s.eq_ignore_ascii_case("CANCELLED"));
    let transparent = event
        .property_value("TRANSP")
        .is_some_and(|t| t.eq_ignore_ascii_case("TRANSPARENT"));
    let status = match event.property_value("STATUS") {
        _ if cancelled => "cancelled",
        _ if transparent => "free",
        Some(status) => status,
        None => "confirmed",
    };

    let mut raw = RawEvent::new(uid, start, end, calendar_id).with_status(status);
    raw.summary = event.get_summary().map(str::to_string);
    Some(raw)
}

/// Zoned times are read as UTC; floating times too.
fn convert_time(time: DatePerhapsTime) -> RawEventTime {
    match time {
        DatePerhapsTime::Date(date) => RawEventTime::Date(date),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => RawEventTime::DateTime(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            RawEventTime::DateTime(Utc.from_utc_datetime(&naive))
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            debug!(tzid = %tzid, "reading zoned iCalendar time as UTC");
            RawEventTime::DateTime(Utc.from_utc_datetime(&date_time))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FEED: &str = "BEGIN:VCALENDAR\r\n\
        VERSION:2.0\r\n\
        PRODID:-//Facilities//Rooms//EN\r\n\
        BEGIN:VEVENT\r\n\
        UID:lecture-1@campus.example\r\n\
        DTSTART:20250303T090000Z\r\n\
        DTEND:20250303T103000Z\r\n\
        SUMMARY:Thermodynamics\r\n\
        STATUS:CONFIRMED\r\n\
        END:VEVENT\r\n\
        BEGIN:VEVENT\r\n\
        UID:holiday-1@campus.example\r\n\
        DTSTART;VALUE=DATE:20250310\r\n\
        DTEND;VALUE=DATE:20250311\r\n\
        SUMMARY:Closed\r\n\
        TRANSP:TRANSPARENT\r\n\
        END:VEVENT\r\n\
        BEGIN:VEVENT\r\n\
        UID:dropped-1@campus.example\r\n\
        DTSTART:20250304T090000Z\r\n\
        DTEND:20250304T100000Z\r\n\
        STATUS:CANCELLED\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";

    #[test]
    fn parses_timed_and_all_day_events() {
        let events = parse_ics_content(FEED, "rooms").unwrap();
        assert_eq!(events.len(), 3);

        let lecture = &events[0];
        assert_eq!(lecture.id, "lecture-1@campus.example");
        assert_eq!(lecture.effective_title(), "Thermodynamics");
        assert_eq!(
            lecture.start,
            RawEventTime::DateTime("2025-03-03T09:00:00Z".parse().unwrap())
        );
        assert_eq!(lecture.status.as_deref(), Some("CONFIRMED"));

        let holiday = &events[1];
        assert_eq!(
            holiday.start,
            RawEventTime::Date(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
        );
        assert_eq!(holiday.status.as_deref(), Some("free"));

        assert_eq!(events[2].status.as_deref(), Some("cancelled"));
        assert_eq!(events[2].effective_title(), "(No title)");
    }

    #[test]
    fn rejects_non_calendar_body() {
        let err = parse_ics_content("<html>login required</html>", "x").unwrap_err();
        assert_eq!(err.code(), crate::error::ProviderErrorCode::InvalidResponse);
    }

    #[test]
    fn missing_end_reuses_start() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:a\r\n\
                   DTSTART;VALUE=DATE:20250310\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let events = parse_ics_content(ics, "x").unwrap();
        assert_eq!(events[0].start, events[0].end);
    }
}
