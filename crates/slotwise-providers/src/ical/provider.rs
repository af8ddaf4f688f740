//! iCal feed provider implementation.

use chrono::Utc;
use reqwest::Client;
use slotwise_core::{Credentials, ProviderKind};
use tracing::debug;
use url::Url;

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::http::{build_client, check_status, read_text, send_error};
use crate::normalize::event_bounds;
use crate::provider::{BoxFuture, CalendarProvider, lookahead_window};
use crate::raw_event::RawEvent;

use super::config::IcalConfig;
use super::ics::parse_ics_content;

fn tag(e: ProviderError) -> ProviderError {
    e.with_provider("ICAL")
}

/// Read-only provider for published iCalendar feeds.
pub struct IcalProvider {
    http: Client,
}

impl IcalProvider {
    pub fn new(config: IcalConfig) -> ProviderResult<Self> {
        Ok(Self {
            http: build_client(config.timeout, &config.user_agent)?,
        })
    }

    fn feed_url(credentials: &Credentials) -> ProviderResult<Url> {
        credentials
            .check_shape(ProviderKind::Ical)
            .map_err(|e| ProviderError::invalid_credentials(e.to_string()))?;
        let Credentials::Feed { url } = credentials else {
            return Err(ProviderError::invalid_credentials(
                "ICAL requires a feed URL",
            ));
        };
        let url = url.trim();
        let fetchable = match url.get(..9) {
            Some(scheme) if scheme.eq_ignore_ascii_case("webcal://") => {
                format!("https://{}", &url[9..])
            }
            _ => url.to_string(),
        };
        Url::parse(&fetchable)
            .map_err(|e| ProviderError::invalid_credentials(format!("invalid feed URL: {e}")))
    }

    async fn download(&self, url: Url, calendar_id: &str) -> ProviderResult<Vec<RawEvent>> {
        debug!(url = %url, "downloading iCalendar feed");
        let response = self.http.get(url).send().await.map_err(send_error)?;
        let body = read_text(check_status(response).await?).await?;
        parse_ics_content(&body, calendar_id)
    }
}

impl CalendarProvider for IcalProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ical
    }

    /// Downloads the feed once; an unreachable or unparseable feed is
    /// reported as invalid credentials.
    fn validate_credentials<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let url = Self::feed_url(credentials).map_err(tag)?;
            match self.download(url, "").await {
                Ok(_) => Ok(()),
                Err(e) if e.is_transient() => Err(tag(e)),
                Err(e) => Err(tag(ProviderError::new(
                    ProviderErrorCode::InvalidCredentials,
                    format!("feed rejected: {}", e.message()),
                ))),
            }
        })
    }

    fn fetch_events<'a>(
        &'a self,
        credentials: &'a Credentials,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            let url = Self::feed_url(credentials).map_err(tag)?;
            let window = lookahead_window(Utc::now());
            let events = self.download(url, calendar_id).await.map_err(tag)?;
            let total = events.len();
            let kept: Vec<RawEvent> = events
                .into_iter()
                .filter(|raw| {
                    let (start, end) = event_bounds(raw);
                    // Zero-length events still count when they start inside.
                    window.overlaps(start, end) || window.contains(start)
                })
                .collect();
            debug!(total, kept = kept.len(), "filtered feed to look-ahead window");
            Ok(kept)
        })
    }
}
