//! Google Calendar provider implementation.

use chrono::Utc;
use reqwest::Client;
use slotwise_core::{Credentials, ProviderKind};
use tracing::debug;

use crate::error::ProviderResult;
use crate::http::build_client;
use crate::oauth::{OAuthParts, refresh_access_token};
use crate::provider::{BoxFuture, CalendarProvider, EventDraft, lookahead_window};
use crate::raw_event::RawEvent;

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;

/// Google Calendar provider.
///
/// Stateless across integrations: the refresh token travels with each call
/// and is exchanged for an access token every time.
pub struct GoogleProvider {
    config: GoogleConfig,
    http: Client,
    client: GoogleCalendarClient,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        let http = build_client(config.timeout, &config.user_agent)?;
        let client = GoogleCalendarClient::new(http.clone(), &config.api_base);
        Ok(Self {
            config,
            http,
            client,
        })
    }

    async fn access_token(&self, credentials: &Credentials) -> ProviderResult<String> {
        let parts = OAuthParts::from_credentials(credentials, ProviderKind::Google)
            .map_err(|e| e.with_provider("GOOGLE"))?;
        refresh_access_token(
            &self.http,
            &self.config.token_url,
            parts,
            self.config.scope.as_deref(),
        )
        .await
        .map_err(|e| e.with_provider("GOOGLE"))
    }
}

/// An unset calendar id means the account's primary calendar.
fn calendar_or_primary(calendar_id: &str) -> &str {
    if calendar_id.is_empty() {
        "primary"
    } else {
        calendar_id
    }
}

impl CalendarProvider for GoogleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn validate_credentials<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.access_token(credentials).await?;
            Ok(())
        })
    }

    fn fetch_events<'a>(
        &'a self,
        credentials: &'a Credentials,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            let token = self.access_token(credentials).await?;
            let window = lookahead_window(Utc::now());
            let calendar = calendar_or_primary(calendar_id);
            debug!(calendar, "listing events");
            self.client
                .list_events(&token, calendar, window.start, window.end)
                .await
                .map_err(|e| e.with_provider("GOOGLE"))
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
                .insert_event(&token, calendar_or_primary(calendar_id), draft)
                .await
                .map_err(|e| e.with_provider("GOOGLE"))
        })
    }

    fn update_event<'a>(
        &'a self,
        credentials: &'a Credentials,
        calendar_id: &'a str,
        event_id: &'a str,
        draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let token = self.access_token(credentials).await?;
            self.client
                .patch_event(&token, calendar_or_primary(calendar_id), event_id, draft)
                .await
                .map_err(|e| e.with_provider("GOOGLE"))
        })
    }

    fn delete_event<'a>(
        &'a self,
        credentials: &'a Credentials,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let token = self.access_token(credentials).await?;
            self.client
                .delete_event(&token, calendar_or_primary(calendar_id), event_id)
                .await
                .map_err(|e| e.with_provider("GOOGLE"))
        })
    }
}
