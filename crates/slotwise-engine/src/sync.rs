//! Sync orchestration.
//!
//! Each cycle polls every due integration through its adapter, upserts the
//! normalized events by `(integration_id, external_id)` and marks events that
//! vanished from the look-ahead window as deleted. A failing integration is
//! logged and skipped; its `last_sync` stays put so the next cycle retries it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use slotwise_core::{CalendarEvent, CalendarIntegration, EventStatus, ProviderKind};
use slotwise_providers::{ProviderRegistry, lookahead_window, normalize_events};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::EngineResult;
use crate::publisher::{DomainEvent, EventPublisher};
use crate::repository::Store;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Syncing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Success,
    Failed,
}

/// Observable state of one integration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub last_outcome: Option<SyncOutcome>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_upserted: usize,
}

/// What a successful pull changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub upserted: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationOutcome {
    pub integration_id: String,
    pub provider: ProviderKind,
    pub result: Result<SyncCounts, String>,
}

/// Summary of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Integrations that were not due.
    pub skipped: Vec<String>,
    /// One entry per attempted integration, ordered by id.
    pub outcomes: Vec<IntegrationOutcome>,
}

impl SyncReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &IntegrationOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &IntegrationOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn upserted(&self) -> usize {
        self.succeeded()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|c| c.upserted)
            .sum()
    }
}

pub struct SyncOrchestrator {
    store: Arc<dyn Store>,
    registry: Arc<ProviderRegistry>,
    publisher: Arc<dyn EventPublisher>,
    statuses: RwLock<HashMap<String, SyncStatus>>,
    max_concurrency: usize,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<ProviderRegistry>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            registry,
            publisher,
            statuses: RwLock::new(HashMap::new()),
            max_concurrency: 1,
        }
    }

    /// Number of integrations pulled at once. 1 keeps cycles sequential.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub async fn status(&self, integration_id: &str) -> Option<SyncStatus> {
        self.statuses.read().await.get(integration_id).cloned()
    }

    /// Loads the active integrations and runs one cycle over them.
    pub async fn tick(&self, now: DateTime<Utc>) -> EngineResult<SyncReport> {
        let integrations = self.store.active_integrations().await?;
        Ok(self.run_cycle(&integrations, now).await)
    }

    /// Syncs every integration in `integrations` that is due at `now`.
    pub async fn run_cycle(
        &self,
        integrations: &[CalendarIntegration],
        now: DateTime<Utc>,
    ) -> SyncReport {
        let (due, not_due): (Vec<_>, Vec<_>) =
            integrations.iter().partition(|i| i.is_sync_due(now));

        let mut skipped: Vec<String> = not_due.into_iter().map(|i| i.id.clone()).collect();
        skipped.sort();
        debug!(due = due.len(), skipped = skipped.len(), "Starting sync cycle");

        let pending: Vec<_> = due
            .into_iter()
            .map(|integration| self.sync_one(integration, now))
            .collect();
        let mut outcomes: Vec<IntegrationOutcome> = stream::iter(pending)
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;
        outcomes.sort_by(|a, b| a.integration_id.cmp(&b.integration_id));

        SyncReport { skipped, outcomes }
    }

    async fn set_status(&self, integration_id: &str, update: impl FnOnce(&mut SyncStatus)) {
        let mut statuses = self.statuses.write().await;
        update(statuses.entry(integration_id.to_string()).or_default());
    }

    async fn publish(&self, event: DomainEvent) {
        let topic = event.topic();
        if let Err(e) = self.publisher.publish(event).await {
            warn!(topic, error = %e, "Failed to publish domain event");
        }
    }

    async fn sync_one(
        &self,
        integration: &CalendarIntegration,
        now: DateTime<Utc>,
    ) -> IntegrationOutcome {
        self.set_status(&integration.id, |s| {
            s.phase = SyncPhase::Syncing;
            s.last_attempt = Some(now);
        })
        .await;

        let result = self.pull(integration, now).await;

        match &result {
            Ok(counts) => {
                info!(
                    integration_id = %integration.id,
                    provider = %integration.provider,
                    upserted = counts.upserted,
                    removed = counts.removed,
                    "Integration synced"
                );
                self.set_status(&integration.id, |s| {
                    s.phase = SyncPhase::Idle;
                    s.last_outcome = Some(SyncOutcome::Success);
                    s.last_error = None;
                    s.last_upserted = counts.upserted;
                })
                .await;
                self.publish(DomainEvent::SyncCompleted {
                    integration_id: integration.id.clone(),
                    provider: integration.provider,
                    upserted: counts.upserted,
                    removed: counts.removed,
                    at: now,
                })
                .await;
            }
            Err(e) => {
                warn!(
                    integration_id = %integration.id,
                    provider = %integration.provider,
                    error = %e,
                    "Integration sync failed"
                );
                self.set_status(&integration.id, |s| {
                    s.phase = SyncPhase::Idle;
                    s.last_outcome = Some(SyncOutcome::Failed);
                    s.last_error = Some(e.to_string());
                })
                .await;
                self.publish(DomainEvent::SyncFailed {
                    integration_id: integration.id.clone(),
                    provider: integration.provider,
                    error: e.to_string(),
                    at: now,
                })
                .await;
            }
        }

        IntegrationOutcome {
            integration_id: integration.id.clone(),
            provider: integration.provider,
            result: result.map_err(|e| e.to_string()),
        }
    }

    async fn pull(
        &self,
        integration: &CalendarIntegration,
        now: DateTime<Utc>,
    ) -> EngineResult<SyncCounts> {
        let provider = self.registry.get(integration.provider)?;
        let raw = provider
            .fetch_events(&integration.credentials, integration.target_calendar())
            .await?;
        let fresh = normalize_events(&raw, &integration.id, now);

        let seen: HashSet<String> = fresh.iter().map(|e| e.external_id.clone()).collect();
        let mut counts = SyncCounts::default();
        for event in fresh {
            self.upsert(event).await?;
            counts.upserted += 1;
        }
        counts.removed = self.mark_vanished(&integration.id, &seen, now).await?;

        self.store.set_last_sync(&integration.id, now).await?;
        Ok(counts)
    }

    async fn upsert(&self, event: CalendarEvent) -> EngineResult<()> {
        let (integration_id, external_id) = event.key();
        let existing = self.store.find_event(integration_id, external_id).await?;
        match existing {
            Some(mut existing) => {
                existing.absorb(event);
                self.store.update_event(existing).await?;
            }
            None => self.store.insert_event(event).await?,
        }
        Ok(())
    }

    /// Stored events inside the look-ahead window that the provider no
    /// longer returns.
    async fn mark_vanished(
        &self,
        integration_id: &str,
        seen: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> EngineResult<usize> {
        let window = lookahead_window(now);
        let mut removed = 0;
        for mut event in self.store.events_for_integration(integration_id).await? {
            let in_window = window.overlaps(event.start, event.end) || window.contains(event.start);
            if event.status == EventStatus::Deleted || !in_window || seen.contains(&event.external_id)
            {
                continue;
            }
            event.status = EventStatus::Deleted;
            event.last_sync = now;
            self.store.update_event(event).await?;
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Fixture, MemoryStore};
    use crate::publisher::ChannelPublisher;
    use crate::repository::{EventRepository, IntegrationRepository};
    use chrono::{Duration, TimeZone};
    use slotwise_core::Credentials;
    use slotwise_providers::{
        BoxFuture, CalendarProvider, ProviderError, ProviderResult, RawEvent, RawEventTime,
    };
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
    }

    fn raw(id: &str, hour: u32) -> RawEvent {
        let start = now().date_naive().and_hms_opt(hour, 0, 0).unwrap().and_utc() + Duration::days(1);
        let mut event = RawEvent::new(
            id,
            RawEventTime::DateTime(start),
            RawEventTime::DateTime(start + Duration::hours(1)),
            "cal",
        );
        event.summary = Some(format!("Event {id}"));
        event
    }

    /// Serves whatever it currently holds, or fails.
    struct ScriptedProvider {
        kind: ProviderKind,
        events: Mutex<ProviderResult<Vec<RawEvent>>>,
    }

    impl ScriptedProvider {
        fn serving(kind: ProviderKind, events: Vec<RawEvent>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                events: Mutex::new(Ok(events)),
            })
        }

        fn failing(kind: ProviderKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                events: Mutex::new(Err(ProviderError::server("upstream 503"))),
            })
        }

        fn replace(&self, events: Vec<RawEvent>) {
            *self.events.lock().unwrap() = Ok(events);
        }
    }

    impl CalendarProvider for ScriptedProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
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
            let events = match &*self.events.lock().unwrap() {
                Ok(events) => Ok(events.clone()),
                Err(e) => Err(ProviderError::new(e.code(), e.message())),
            };
            Box::pin(async move { events })
        }
    }

    fn feed(id: &str) -> CalendarIntegration {
        CalendarIntegration::new(
            id,
            Some("room-1".into()),
            ProviderKind::Ical,
            Credentials::Feed {
                url: format!("https://example.com/{id}.ics"),
            },
            "",
            30,
        )
        .unwrap()
    }

    fn oauth(id: &str) -> CalendarIntegration {
        CalendarIntegration::new(
            id,
            Some("room-1".into()),
            ProviderKind::Google,
            Credentials::OAuth {
                client_id: "cid".into(),
                client_secret: "secret".into(),
                refresh_token: "refresh".into(),
                tenant: None,
            },
            "primary",
            30,
        )
        .unwrap()
    }

    struct Harness {
        store: Arc<MemoryStore>,
        orchestrator: SyncOrchestrator,
        events: tokio::sync::mpsc::UnboundedReceiver<DomainEvent>,
    }

    fn harness(integrations: Vec<CalendarIntegration>, providers: Vec<Arc<dyn CalendarProvider>>) -> Harness {
        let store = Arc::new(MemoryStore::from_fixture(Fixture {
            integrations,
            ..Fixture::default()
        }));
        let mut registry = ProviderRegistry::new();
        for provider in providers {
            registry.register(provider);
        }
        let (publisher, events) = ChannelPublisher::new();
        let orchestrator =
            SyncOrchestrator::new(store.clone(), Arc::new(registry), Arc::new(publisher));
        Harness {
            store,
            orchestrator,
            events,
        }
    }

    #[tokio::test]
    async fn skips_integrations_that_are_not_due() {
        let fresh = feed("fresh").with_last_sync(now() - Duration::minutes(10));
        let stale = feed("stale").with_last_sync(now() - Duration::minutes(45));
        let mut h = harness(
            vec![fresh.clone(), stale.clone()],
            vec![ScriptedProvider::serving(ProviderKind::Ical, vec![raw("a", 10)])],
        );

        let report = h.orchestrator.run_cycle(&[fresh, stale], now()).await;
        assert_eq!(report.skipped, ["fresh"]);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].integration_id, "stale");

        let stored = h.store.integration_by_id("stale").await.unwrap().unwrap();
        assert_eq!(stored.last_sync, Some(now()));
        assert!(matches!(
            h.events.recv().await.unwrap(),
            DomainEvent::SyncCompleted { upserted: 1, .. }
        ));
    }

    #[tokio::test]
    async fn failure_is_isolated_and_keeps_last_sync() {
        let before = now() - Duration::hours(2);
        let broken = oauth("broken").with_last_sync(before);
        let healthy = feed("healthy");
        let mut h = harness(
            vec![broken.clone(), healthy.clone()],
            vec![
                ScriptedProvider::failing(ProviderKind::Google),
                ScriptedProvider::serving(ProviderKind::Ical, vec![raw("a", 10), raw("b", 12)]),
            ],
        );

        let report = h.orchestrator.run_cycle(&[broken, healthy], now()).await;
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.succeeded().count(), 1);
        assert_eq!(report.upserted(), 2);

        let broken = h.store.integration_by_id("broken").await.unwrap().unwrap();
        assert_eq!(broken.last_sync, Some(before));
        let healthy = h.store.integration_by_id("healthy").await.unwrap().unwrap();
        assert_eq!(healthy.last_sync, Some(now()));

        let status = h.orchestrator.status("broken").await.unwrap();
        assert_eq!(status.phase, SyncPhase::Idle);
        assert_eq!(status.last_outcome, Some(SyncOutcome::Failed));
        assert!(status.last_error.unwrap().contains("upstream 503"));

        let mut topics = vec![
            h.events.recv().await.unwrap().topic(),
            h.events.recv().await.unwrap().topic(),
        ];
        topics.sort();
        assert_eq!(topics, ["calendar.sync.completed", "calendar.sync.failed"]);
    }

    #[tokio::test]
    async fn upsert_keeps_one_record_per_external_id() {
        let provider = ScriptedProvider::serving(ProviderKind::Ical, vec![raw("a", 10)]);
        let integration = feed("ics");
        let h = harness(vec![integration.clone()], vec![provider.clone()]);

        h.orchestrator.run_cycle(&[integration.clone()], now()).await;
        let first = h.store.find_event("ics", "a").await.unwrap().unwrap();

        let mut moved = raw("a", 14);
        moved.summary = Some("Moved".into());
        provider.replace(vec![moved]);
        let later = now() + Duration::minutes(31);
        let synced = integration.with_last_sync(now());
        h.orchestrator.run_cycle(&[synced], later).await;

        assert_eq!(h.store.event_count().await, 1);
        let second = h.store.find_event("ics", "a").await.unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.title, "Moved");
        assert_eq!(second.last_sync, later);
    }

    #[tokio::test]
    async fn vanished_events_are_marked_deleted() {
        let provider =
            ScriptedProvider::serving(ProviderKind::Ical, vec![raw("a", 10), raw("b", 11)]);
        let integration = feed("ics");
        let h = harness(vec![integration.clone()], vec![provider.clone()]);
        h.orchestrator.run_cycle(&[integration.clone()], now()).await;

        provider.replace(vec![raw("a", 10)]);
        let later = now() + Duration::hours(1);
        let report = h
            .orchestrator
            .run_cycle(&[integration.with_last_sync(now())], later)
            .await;

        assert_eq!(
            report.outcomes[0].result,
            Ok(SyncCounts {
                upserted: 1,
                removed: 1
            })
        );
        let gone = h.store.find_event("ics", "b").await.unwrap().unwrap();
        assert_eq!(gone.status, EventStatus::Deleted);
    }

    #[tokio::test]
    async fn missing_adapter_fails_that_integration_only() {
        let h = harness(vec![oauth("g"), feed("f")], vec![ScriptedProvider::serving(
            ProviderKind::Ical,
            vec![],
        )]);
        let report = h.orchestrator.tick(now()).await.unwrap();
        let failed: Vec<_> = report.failed().map(|o| o.integration_id.as_str()).collect();
        assert_eq!(failed, ["g"]);
        assert_eq!(report.succeeded().count(), 1);
    }

    #[tokio::test]
    async fn concurrent_cycle_reports_every_integration() {
        let integrations: Vec<_> = (0..5).map(|n| feed(&format!("feed-{n}"))).collect();
        let h = harness(
            integrations.clone(),
            vec![ScriptedProvider::serving(ProviderKind::Ical, vec![raw("a", 10)])],
        );
        let orchestrator = h.orchestrator.with_max_concurrency(3);

        let report = orchestrator.run_cycle(&integrations, now()).await;
        let ids: Vec<_> = report.outcomes.iter().map(|o| o.integration_id.as_str()).collect();
        assert_eq!(ids, ["feed-0", "feed-1", "feed-2", "feed-3", "feed-4"]);
        assert_eq!(h.store.event_count().await, 5);
    }
}
