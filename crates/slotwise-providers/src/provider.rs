//! CalendarProvider trait definition.
//!
//! Every calendar backend (Google, Outlook, iCal feeds, the internal
//! synthetic provider) implements [`CalendarProvider`]. Adapters:
//! - validate credentials against the backend
//! - fetch events inside a fixed look-ahead window
//! - optionally create, update and delete events

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use slotwise_core::{Credentials, ProviderKind, TimeWindow};

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::RawEvent;

/// Days ahead of "now" that a fetch covers.
pub const LOOKAHEAD_DAYS: i64 = 30;

/// The `[now, now + LOOKAHEAD_DAYS)` fetch window.
pub fn lookahead_window(now: DateTime<Utc>) -> TimeWindow {
    TimeWindow {
        start: now,
        end: now + Duration::days(LOOKAHEAD_DAYS),
    }
}

/// Fields needed to create or replace an external event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub is_all_day: bool,
}

impl EventDraft {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            start,
            end,
            is_all_day: false,
        }
    }

    pub fn with_all_day(mut self, is_all_day: bool) -> Self {
        self.is_all_day = is_all_day;
        self
    }
}

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so adapters can live behind
/// `Arc<dyn CalendarProvider>` in the registry.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The contract every calendar backend implements.
///
/// Mutations default to [`ProviderErrorCode::UnsupportedOperation`]; read-only
/// adapters simply do not override them.
///
/// [`ProviderErrorCode::UnsupportedOperation`]: crate::ProviderErrorCode::UnsupportedOperation
pub trait CalendarProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Checks that the credentials are well-formed and accepted by the backend.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` when malformed or rejected.
    fn validate_credentials<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Fetches events in the look-ahead window, following pagination.
    fn fetch_events<'a>(
        &'a self,
        credentials: &'a Credentials,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>>;

    /// Creates an event and returns its external id.
    fn create_event<'a>(
        &'a self,
        _credentials: &'a Credentials,
        _calendar_id: &'a str,
        _draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        let err = self.unsupported("create");
        Box::pin(async move { Err(err) })
    }

    fn update_event<'a>(
        &'a self,
        _credentials: &'a Credentials,
        _calendar_id: &'a str,
        _event_id: &'a str,
        _draft: &'a EventDraft,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        let err = self.unsupported("update");
        Box::pin(async move { Err(err) })
    }

    fn delete_event<'a>(
        &'a self,
        _credentials: &'a Credentials,
        _calendar_id: &'a str,
        _event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        let err = self.unsupported("delete");
        Box::pin(async move { Err(err) })
    }

    #[doc(hidden)]
    fn unsupported(&self, operation: &str) -> ProviderError {
        ProviderError::unsupported(format!(
            "{operation} is not supported by the {} provider",
            self.kind()
        ))
        .with_provider(self.kind().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;

    struct ReadOnly;

    impl CalendarProvider for ReadOnly {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Ical
        }

        fn validate_credentials<'a>(
            &'a self,
            _credentials: &'a Credentials,
        ) -> BoxFuture<'a, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn fetch_events<'a>(
            &'a self,
            _credentials: &'a Credentials,
            _calendar_id: &'a str,
        ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    #[test]
    fn lookahead_is_thirty_days() {
        let now = Utc::now();
        let window = lookahead_window(now);
        assert_eq!(window.start, now);
        assert_eq!(window.duration(), Duration::days(30));
    }

    #[tokio::test]
    async fn mutations_default_to_unsupported() {
        let provider = ReadOnly;
        let now = Utc::now();
        let draft = EventDraft::new("x", now, now + Duration::hours(1));
        let creds = Credentials::None;

        let err = provider.create_event(&creds, "c", &draft).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::UnsupportedOperation);
        assert_eq!(err.provider(), Some("ICAL"));

        let err = provider
            .update_event(&creds, "c", "e", &draft)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::UnsupportedOperation);

        let err = provider.delete_event(&creds, "c", "e").await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::UnsupportedOperation);
    }
}
