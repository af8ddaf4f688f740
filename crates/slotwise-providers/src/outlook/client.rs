//! Microsoft Graph calendar client.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ProviderResult;
use crate::http::{check_status, read_json, send_error};
use crate::provider::EventDraft;
use crate::raw_event::{RawEvent, RawEventTime};

const OUTLOOK_TIMEZONE_HEADER: &str = r#"outlook.timezone="UTC""#;

/// Graph calendar client. The caller supplies a fresh access token.
#[derive(Debug, Clone)]
pub struct OutlookCalendarClient {
    http: Client,
    api_base: String,
}

impl OutlookCalendarClient {
    pub fn new(http: Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
        }
    }

    fn is_default_calendar(calendar_id: &str) -> bool {
        calendar_id.is_empty() || calendar_id.eq_ignore_ascii_case("primary")
    }

    fn calendar_url(&self, calendar_id: &str, suffix: &str) -> String {
        if Self::is_default_calendar(calendar_id) {
            format!("{}/me/{suffix}", self.api_base)
        } else {
            format!(
                "{}/me/calendars/{}/{suffix}",
                self.api_base,
                urlencoding::encode(calendar_id)
            )
        }
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/me/events/{}", self.api_base, urlencoding::encode(event_id))
    }

    fn authorized(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request
            .bearer_auth(access_token)
            .header("Prefer", OUTLOOK_TIMEZONE_HEADER)
    }

    /// Lists the calendar view for `[start, end)`, following `@odata.nextLink`.
    pub async fn calendar_view(
        &self,
        access_token: &str,
        calendar_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ProviderResult<Vec<RawEvent>> {
        let first = self
            .http
            .get(self.calendar_url(calendar_id, "calendarView"))
            .query(&[
                ("startDateTime", start.to_rfc3339()),
                ("endDateTime", end.to_rfc3339()),
            ]);

        let mut events = Vec::new();
        let mut request = Some(first);
        while let Some(next) = request.take() {
            let response = self
                .authorized(next, access_token)
                .send()
                .await
                .map_err(send_error)?;
            let page: CalendarViewResponse = read_json(check_status(response).await?).await?;

            events.extend(
                page.value
                    .into_iter()
                    .filter_map(|event| convert_event(event, calendar_id)),
            );
            request = page.next_link.map(|link| self.http.get(link));
        }

        debug!(count = events.len(), calendar_id, "fetched Outlook events");
        Ok(events)
    }

    pub async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        draft: &EventDraft,
    ) -> ProviderResult<String> {
        let request = self
            .http
            .post(self.calendar_url(calendar_id, "events"))
            .json(&GraphEventBody::from(draft));
        let response = self
            .authorized(request, access_token)
            .send()
            .await
            .map_err(send_error)?;
        let created: CreatedEvent = read_json(check_status(response).await?).await?;
        Ok(created.id)
    }

    pub async fn update_event(
        &self,
        access_token: &str,
        event_id: &str,
        draft: &EventDraft,
    ) -> ProviderResult<()> {
        let request = self
            .http
            .patch(self.event_url(event_id))
            .json(&GraphEventBody::from(draft));
        let response = self
            .authorized(request, access_token)
            .send()
            .await
            .map_err(send_error)?;
        check_status(response).await?;
        Ok(())
    }

    pub async fn delete_event(&self, access_token: &str, event_id: &str) -> ProviderResult<()> {
        let request = self.http.delete(self.event_url(event_id));
        let response = self
            .authorized(request, access_token)
            .send()
            .await
            .map_err(send_error)?;
        check_status(response).await?;
        Ok(())
    }
}

/// Parses a Graph `dateTime`, which carries no offset when UTC was requested.
fn parse_graph_time(time: &GraphDateTime) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&time.date_time) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Some(ref zone) = time.time_zone
        && !zone.eq_ignore_ascii_case("UTC")
    {
        debug!(zone = %zone, "Graph returned a non-UTC zone, reading as UTC");
    }
    NaiveDateTime::parse_from_str(&time.date_time, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| warn!(error = %e, value = %time.date_time, "unparseable Graph dateTime"))
        .ok()
}

fn convert_event(event: GraphEvent, calendar_id: &str) -> Option<RawEvent> {
    let start = parse_graph_time(&event.start)?;
    let end = parse_graph_time(&event.end)?;

    let status = if event.is_cancelled {
        "cancelled".to_string()
    } else {
        event.show_as.unwrap_or_else(|| "busy".to_string())
    };

    let mut raw = RawEvent::new(
        event.id,
        RawEventTime::DateTime(start),
        RawEventTime::DateTime(end),
        calendar_id,
    )
    .with_status(status)
    .with_all_day(event.is_all_day);
    raw.summary = event.subject;
    Some(raw)
}

#[derive(Debug, Deserialize)]
struct CalendarViewResponse {
    #[serde(default)]
    value: Vec<GraphEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    id: String,
    subject: Option<String>,
    start: GraphDateTime,
    end: GraphDateTime,
    #[serde(default)]
    is_all_day: bool,
    #[serde(default)]
    is_cancelled: bool,
    show_as: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTime {
    date_time: String,
    time_zone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphEventBody {
    subject: String,
    start: GraphDateTime,
    end: GraphDateTime,
    is_all_day: bool,
}

impl From<&EventDraft> for GraphEventBody {
    fn from(draft: &EventDraft) -> Self {
        let time = |dt: DateTime<Utc>| GraphDateTime {
            date_time: dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            time_zone: Some("UTC".to_string()),
        };
        Self {
            subject: draft.title.clone(),
            start: time(draft.start),
            end: time(draft.end),
            is_all_day: draft.is_all_day,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(json: serde_json::Value) -> GraphEvent {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn parses_offsetless_graph_times() {
        let raw = convert_event(
            event(serde_json::json!({
                "id": "AAMk",
                "subject": "Budget",
                "start": {"dateTime": "2025-03-03T10:00:00.0000000", "timeZone": "UTC"},
                "end": {"dateTime": "2025-03-03T11:30:00.0000000", "timeZone": "UTC"},
                "showAs": "oof"
            })),
            "primary",
        )
        .unwrap();
        assert_eq!(
            raw.start,
            RawEventTime::DateTime("2025-03-03T10:00:00Z".parse().unwrap())
        );
        assert_eq!(raw.status.as_deref(), Some("oof"));
        assert_eq!(raw.all_day, Some(false));
    }

    #[test]
    fn cancelled_flag_wins_over_show_as() {
        let raw = convert_event(
            event(serde_json::json!({
                "id": "x",
                "start": {"dateTime": "2025-03-03T00:00:00.0000000"},
                "end": {"dateTime": "2025-03-04T00:00:00.0000000"},
                "isAllDay": true,
                "isCancelled": true,
                "showAs": "busy"
            })),
            "primary",
        )
        .unwrap();
        assert_eq!(raw.status.as_deref(), Some("cancelled"));
        assert_eq!(raw.all_day, Some(true));
    }

    #[test]
    fn default_calendar_routes() {
        let client = OutlookCalendarClient::new(Client::new(), "https://graph");
        assert_eq!(
            client.calendar_url("", "calendarView"),
            "https://graph/me/calendarView"
        );
        assert_eq!(
            client.calendar_url("AQMk=", "events"),
            "https://graph/me/calendars/AQMk%3D/events"
        );
    }
}
