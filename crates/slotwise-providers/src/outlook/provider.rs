//! Outlook (Microsoft Graph) provider implementation.

use chrono::Utc;
use reqwest::Client;
use slotwise_core::{Credentials, ProviderKind};

use crate::error::{ProviderError, ProviderResult};
use crate::http::build_client;
use crate::oauth::{OAuthParts, refresh_access_token};
use crate::provider::{BoxFuture, CalendarProvider, EventDraft, lookahead_window};
use crate::raw_event::RawEvent;

use super::client::OutlookCalendarClient;
use super::config::OutlookConfig;

fn tag(e: ProviderError) -> ProviderError {
    e.with_provider("OUTLOOK")
}

/// Outlook calendar provider backed by the Graph `calendarView` endpoint.
pub struct OutlookProvider {
    config: OutlookConfig,
    http: Client,
    client: OutlookCalendarClient,
}

impl OutlookProvider {
    pub fn new(config: OutlookConfig) -> ProviderResult<Self> {
        let http = build_client(config.timeout, &config.user_agent)?;
        let client = OutlookCalendarClient::new(http.clone(), &config.api_base);
        Ok(Self {
            config,
            http,
            client,
        })
    }

    async fn access_token(&self, credentials: &Credentials) -> ProviderResult<String> {
        let parts = OAuthParts::from_credentials(credentials, ProviderKind::Outlook).map_err(tag)?;
        let token_url = self.config.token_url_for(parts.tenant);
        refresh_access_token(&self.http, &token_url, parts, Some(&self.config.scope))
            .await
            .map_err(tag)
    }
}

impl CalendarProvider for OutlookProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Outlook
    }

    fn validate_credentials<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.access_token(credentials).await.map(drop) })
    }

    fn fetch_events<'a>(
        &'a self,
        credentials: &'a Credentials,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            let token = self.access_token(credentials).await?;
            let window = lookahead_window(Utc::now());
            self.client
                .calendar_view(&token, calendar_id, window.start, window.end)
                .await
                .map_err(tag)
        })
    }

    fn create_event<'a>(
        &'a self,
        credentials: &'a Credentials,
        calendar_id: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            let token = self.access_token(credentials).await?;
            self.client
                .create_event(&token, calendar_id, draft)
                .await
                .map_err(tag)
        })
    }

    // Graph addresses events by id alone.
    fn update_event<'a>(
        &'a self,
        credentials: &'a Credentials,
        _calendar_id: &'a str,
        event_id: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let token = self.access_token(credentials).await?;
            self.client
                .update_event(&token, event_id, draft)
                .await
                .map_err(tag)
        })
    }

    fn delete_event<'a>(
        &'a self,
        credentials: &'a Credentials,
        _calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let token = self.access_token(credentials).await?;
            self.client.delete_event(&token, event_id).await.map_err(tag)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::normalize::map_status;
    use slotwise_core::EventStatus;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds(tenant: Option<&str>) -> Credentials {
        Credentials::OAuth {
            client_id: "app-id".into(),
            client_secret: "secret".into(),
            refresh_token: "refresh".into(),
            tenant: tenant.map(String::from),
        }
    }

    async fn provider_for(server: &MockServer) -> OutlookProvider {
        Mock::given(method("POST"))
            .and(path("/contoso/token"))
            .and(body_string_contains("offline_access"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "graph-tok"})),
            )
            .mount(server)
            .await;
        OutlookProvider::new(
            OutlookConfig::new()
                .with_api_base(server.uri())
                .with_token_url(format!("{}/{{tenant}}/token", server.uri())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn calendar_view_follows_next_link() {
        let server = MockServer::start().await;
        let provider = provider_for(&server).await;

        Mock::given(method("GET"))
            .and(path("/me/calendarView/page2"))
            .and(header("Prefer", r#"outlook.timezone="UTC""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{
                    "id": "b",
                    "subject": "Away",
                    "start": {"dateTime": "2030-01-02T09:00:00.0000000", "timeZone": "UTC"},
                    "end": {"dateTime": "2030-01-02T17:00:00.0000000", "timeZone": "UTC"},
                    "showAs": "oof"
                }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/me/calendarView"))
            .and(header("Authorization", "Bearer graph-tok"))
            .and(header("Prefer", r#"outlook.timezone="UTC""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{
                    "id": "a",
                    "subject": "Maybe",
                    "start": {"dateTime": "2030-01-01T09:00:00.0000000", "timeZone": "UTC"},
                    "end": {"dateTime": "2030-01-01T10:00:00.0000000", "timeZone": "UTC"},
                    "showAs": "tentative"
                }],
                "@odata.nextLink": format!("{}/me/calendarView/page2", server.uri())
            })))
            .mount(&server)
            .await;

        let events = provider
            .fetch_events(&creds(Some("contoso")), "primary")
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            map_status(events[0].status.as_deref()),
            EventStatus::Tentative
        );
        assert_eq!(
            map_status(events[1].status.as_deref()),
            EventStatus::Confirmed
        );
    }

    #[tokio::test]
    async fn named_calendar_uses_calendar_path() {
        let server = MockServer::start().await;
        let provider = provider_for(&server).await;
        Mock::given(method("GET"))
            .and(path("/me/calendars/room-42/calendarView"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": []})))
            .mount(&server)
            .await;

        let events = provider
            .fetch_events(&creds(Some("contoso")), "room-42")
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn throttling_is_transient() {
        let server = MockServer::start().await;
        let provider = provider_for(&server).await;
        Mock::given(method("GET"))
            .and(path("/me/calendarView"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;

        let err = provider
            .fetch_events(&creds(Some("contoso")), "")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::RateLimited);
        assert!(err.is_transient());
        assert_eq!(err.provider(), Some("OUTLOOK"));
    }

    #[tokio::test]
    async fn delete_addresses_event_directly() {
        let server = MockServer::start().await;
        let provider = provider_for(&server).await;
        Mock::given(method("DELETE"))
            .and(path("/me/events/evt-9"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        provider
            .delete_event(&creds(Some("contoso")), "room-42", "evt-9")
            .await
            .unwrap();
    }
}
