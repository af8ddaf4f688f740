//! Google Calendar API client.
//!
//! Low-level calls against the Calendar API v3: list with pagination,
//! insert, patch and delete. The caller supplies a fresh access token.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ProviderResult;
use crate::http::{check_status, read_json, send_error};
use crate::provider::EventDraft;
use crate::raw_event::{RawEvent, RawEventTime};

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http: Client,
    api_base: String,
}

impl GoogleCalendarClient {
    pub fn new(http: Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        )
    }

    /// Lists events overlapping `[time_min, time_max)`, all pages.
    ///
    /// Recurring series are expanded server-side and deleted instances are
    /// included so their cancellation reaches the store.
    pub async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> ProviderResult<Vec<RawEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(
                    access_token,
                    calendar_id,
                    time_min,
                    time_max,
                    page_token.as_deref(),
                )
                .await?;

            events.extend(
                page.items
                    .into_iter()
                    .filter_map(|event| convert_event(event, calendar_id)),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = events.len(), calendar_id, "fetched Google events");
        Ok(events)
    }

    async fn list_events_page(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> ProviderResult<EventListResponse> {
        let mut request = self
            .http
            .get(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("showDeleted", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]);

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(send_error)?;
        let response = check_status(response).await?;
        read_json(response).await
    }

    /// Inserts an event and returns its id.
    pub async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        draft: &EventDraft,
    ) -> ProviderResult<String> {
        let response = self
            .http
            .post(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .json(&ApiEventBody::from(draft))
            .send()
            .await
            .map_err(send_error)?;
        let created: CreatedEvent = read_json(check_status(response).await?).await?;
        Ok(created.id)
    }

    pub async fn patch_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        draft: &EventDraft,
    ) -> ProviderResult<()> {
        let url = format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        );
        let response = self
            .http
            .patch(url)
            .bearer_auth(access_token)
            .json(&ApiEventBody::from(draft))
            .send()
            .await
            .map_err(send_error)?;
        check_status(response).await?;
        Ok(())
    }

    pub async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> ProviderResult<()> {
        let url = format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        );
        let response = self
            .http
            .delete(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(send_error)?;
        check_status(response).await?;
        Ok(())
    }
}

fn parse_time(time: &ApiEventTime) -> Option<RawEventTime> {
    match (&time.date_time, &time.date) {
        (Some(dt), _) => DateTime::parse_from_rfc3339(dt)
            .map(|parsed| RawEventTime::DateTime(parsed.with_timezone(&Utc)))
            .map_err(|e| warn!(error = %e, value = %dt, "unparseable Google dateTime"))
            .ok(),
        (None, Some(date)) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(RawEventTime::Date)
            .map_err(|e| warn!(error = %e, value = %date, "unparseable Google date"))
            .ok(),
        (None, None) => None,
    }
}

/// Converts an API event. Events without usable times are skipped.
fn convert_event(event: ApiEvent, calendar_id: &str) -> Option<RawEvent> {
    let id = event.id?;
    let (Some(start), Some(end)) = (
        event.start.as_ref().and_then(parse_time),
        event.end.as_ref().and_then(parse_time),
    ) else {
        debug!(event_id = %id, "skipping Google event without start/end");
        return None;
    };

    // A transparent event does not block the attendee's time.
    let status = match (event.status.as_deref(), event.transparency.as_deref()) {
        (Some("cancelled"), _) => "cancelled".to_string(),
        (_, Some("transparent")) => "free".to_string(),
        (Some(status), _) => status.to_string(),
        (None, _) => "confirmed".to_string(),
    };

    let mut raw = RawEvent::new(id, start, end, calendar_id).with_status(status);
    raw.summary = event.summary;
    Some(raw)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: Option<String>,
    summary: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
    status: Option<String>,
    transparency: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
}

#[derive(Debug, Serialize)]
struct ApiEventBody {
    summary: String,
    start: ApiEventTime,
    end: ApiEventTime,
}

impl From<&EventDraft> for ApiEventBody {
    fn from(draft: &EventDraft) -> Self {
        let time = |dt: DateTime<Utc>| {
            if draft.is_all_day {
                ApiEventTime {
                    date: Some(dt.date_naive().format("%Y-%m-%d").to_string()),
                    date_time: None,
                }
            } else {
                ApiEventTime {
                    date: None,
                    date_time: Some(dt.to_rfc3339()),
                }
            }
        };
        Self {
            summary: draft.title.clone(),
            start: time(draft.start),
            end: time(draft.end),
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

    #[test]
    fn transparent_events_become_free() {
        let json = r#"{
            "id": "event1",
            "summary": "Focus",
            "start": {"dateTime": "2024-03-15T10:00:00Z"},
            "end": {"dateTime": "2024-03-15T11:00:00Z"},
            "status": "confirmed",
            "transparency": "transparent"
        }"#;
        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let raw = convert_event(event, "primary").unwrap();
        assert_eq!(raw.status.as_deref(), Some("free"));
        assert_eq!(raw.effective_title(), "Focus");
    }

    #[test]
    fn all_day_event_uses_date() {
        let json = r#"{
            "id": "event1",
            "start": {"date": "2024-03-15"},
            "end": {"date": "2024-03-16"}
        }"#;
        let event: ApiEvent = serde_json::from_str(json).unwrap();
        let raw = convert_event(event, "primary").unwrap();
        assert!(raw.start.is_date_only());
        assert_eq!(raw.status.as_deref(), Some("confirmed"));
    }

    #[test]
    fn deleted_instance_without_times_is_skipped() {
        let json = r#"{"id": "gone", "status": "cancelled"}"#;
        let event: ApiEvent = serde_json::from_str(json).unwrap();
        assert!(convert_event(event, "primary").is_none());
    }

    #[test]
    fn draft_body_shape() {
        let start: DateTime<Utc> = "2024-03-15T10:00:00Z".parse().unwrap();
        let draft = EventDraft::new("Hold", start, start + chrono::Duration::hours(1));
        let body = serde_json::to_value(ApiEventBody::from(&draft)).unwrap();
        assert_eq!(body["summary"], "Hold");
        assert!(body["start"]["dateTime"].is_string());
        assert!(body["start"].get("date").is_none());

        let all_day = serde_json::to_value(ApiEventBody::from(&draft.with_all_day(true))).unwrap();
        assert_eq!(all_day["start"]["date"], "2024-03-15");
    }
}
