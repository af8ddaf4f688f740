//! Sync, resolve and compose over the in-memory store, with iCal feeds
//! served by a mock HTTP server.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use slotwise_core::{
    AvailabilityWindow, CalendarIntegration, Credentials, DayOfWeek, ProviderKind, Reservation,
    ReservationStatus, Schedule, ScheduleType, TimeWindow,
};
use slotwise_engine::repository::{EventRepository, IntegrationRepository};
use slotwise_engine::{
    ChannelPublisher, ConflictError, ConflictSource, DomainEvent, Engine, EngineConfig,
    EngineError, ExternalMode, Fixture, MemoryStore, ViewEventKind, ViewOptions,
};
use slotwise_providers::{EventDraft, ProviderErrorCode, ProviderRegistry, ProviderSettings};
use tokio::sync::mpsc::UnboundedReceiver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A weekday two to four days ahead, so feed events fall in the look-ahead window.
fn upcoming_weekday() -> NaiveDate {
    let mut day = (Utc::now() + Duration::days(2)).date_naive();
    while DayOfWeek::of(day).is_weekend() {
        day = day.succ_opt().unwrap();
    }
    day
}

fn at(day: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
    day.and_hms_opt(h, m, 0).unwrap().and_utc()
}

fn ics(day: NaiveDate) -> String {
    let stamp = |dt: DateTime<Utc>| dt.format("%Y%m%dT%H%M%SZ").to_string();
    format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//slotwise//flow//EN\r\n\
         BEGIN:VEVENT\r\nUID:dept-1@example.com\r\nDTSTART:{}\r\nDTEND:{}\r\nSUMMARY:Department meeting\r\nEND:VEVENT\r\n\
         BEGIN:VEVENT\r\nUID:dept-2@example.com\r\nDTSTART:{}\r\nDTEND:{}\r\nSUMMARY:Cancelled seminar\r\nSTATUS:CANCELLED\r\nEND:VEVENT\r\n\
         END:VCALENDAR\r\n",
        stamp(at(day, 14, 0)),
        stamp(at(day, 15, 0)),
        stamp(at(day, 16, 0)),
        stamp(at(day, 17, 0)),
    )
}

async fn feed_server(day: NaiveDate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dept.ics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ics(day)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone.ics"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

fn feed(id: &str, url: String) -> CalendarIntegration {
    CalendarIntegration::new(
        id,
        Some("room-1".into()),
        ProviderKind::Ical,
        Credentials::Feed { url },
        "",
        30,
    )
    .unwrap()
}

struct Setup {
    store: Arc<MemoryStore>,
    engine: Engine,
    events: UnboundedReceiver<DomainEvent>,
    day: NaiveDate,
}

fn setup(day: NaiveDate, mut fixture: Fixture) -> Setup {
    let weekday = i64::from(DayOfWeek::of(day).number());
    fixture
        .availability_windows
        .push(AvailabilityWindow::new("hours", "room-1", weekday, "08:00", "18:00").unwrap());
    let store = Arc::new(MemoryStore::from_fixture(fixture));
    let (publisher, events) = ChannelPublisher::new();
    let engine = Engine::new(&EngineConfig::default(), store.clone(), Arc::new(publisher)).unwrap();
    Setup {
        store,
        engine,
        events,
        day,
    }
}

#[tokio::test]
async fn approved_reservation_conflicts_only_its_slot() {
    let day = upcoming_weekday();
    let reservation = Reservation::new("r1", "room-1", "alice", at(day, 10, 0), at(day, 11, 0))
        .unwrap()
        .with_status(ReservationStatus::Approved)
        .with_title("Lab meeting");
    let s = setup(
        day,
        Fixture {
            reservations: vec![reservation],
            ..Fixture::default()
        },
    );

    let availability = s
        .engine
        .resolver
        .resolve("room-1", TimeWindow::for_date(s.day), ExternalMode::Exclude)
        .await
        .unwrap();

    assert_eq!(availability.available.len(), 9);
    assert_eq!(availability.conflicting.len(), 1);
    let conflict = &availability.conflicting[0];
    assert_eq!(
        (conflict.slot.start, conflict.slot.end),
        (at(day, 10, 0), at(day, 11, 0))
    );
    assert!(matches!(
        &conflict.conflicts[..],
        [ConflictSource::Reservation { reservation_id, .. }] if reservation_id == "r1"
    ));
}

#[tokio::test]
async fn feed_events_flow_into_availability_and_views() {
    let day = upcoming_weekday();
    let server = feed_server(day).await;
    let integration = feed("dept", format!("{}/dept.ics", server.uri()));
    let mut s = setup(
        day,
        Fixture {
            integrations: vec![integration],
            ..Fixture::default()
        },
    );

    let report = s.engine.sync.tick(Utc::now()).await.unwrap();
    assert_eq!(report.upserted(), 2);
    assert!(matches!(
        s.events.recv().await.unwrap(),
        DomainEvent::SyncCompleted { upserted: 2, .. }
    ));

    let range = TimeWindow::for_date(s.day);
    let availability = s
        .engine
        .resolver
        .resolve("room-1", range, ExternalMode::Required)
        .await
        .unwrap();
    let conflicting: Vec<_> = availability
        .conflicting
        .iter()
        .map(|c| (c.slot.start, c.conflicts[0].title().to_string()))
        .collect();
    assert_eq!(
        conflicting,
        [(at(day, 14, 0), "Department meeting".to_string())]
    );

    let view = s
        .engine
        .composer
        .compose(
            "room-1",
            range,
            &ViewOptions::default()
                .with_free(true)
                .with_external(ExternalMode::Optional),
        )
        .await
        .unwrap();
    let external: Vec<_> = view
        .events
        .iter()
        .filter(|e| e.kind == ViewEventKind::External)
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(external, ["Department meeting"]);
    let free_minutes: i64 = view
        .events
        .iter()
        .filter(|e| e.kind == ViewEventKind::Free)
        .map(|e| (e.end - e.start).num_minutes())
        .sum();
    assert_eq!(free_minutes, 9 * 60);
}

#[tokio::test]
async fn failing_feed_does_not_stop_the_cycle() {
    let day = upcoming_weekday();
    let server = feed_server(day).await;
    let s = setup(
        day,
        Fixture {
            integrations: vec![
                feed("dept", format!("{}/dept.ics", server.uri())),
                feed("gone", format!("{}/gone.ics", server.uri())),
            ],
            ..Fixture::default()
        },
    );

    let now = Utc::now();
    let report = s.engine.sync.tick(now).await.unwrap();
    let failed: Vec<_> = report.failed().map(|o| o.integration_id.as_str()).collect();
    assert_eq!(failed, ["gone"]);

    let gone = s.store.integration_by_id("gone").await.unwrap().unwrap();
    assert_eq!(gone.last_sync, None);
    let dept = s.store.integration_by_id("dept").await.unwrap().unwrap();
    assert_eq!(dept.last_sync, Some(now));

    let status = s.engine.sync.status("gone").await.unwrap();
    assert!(status.last_error.unwrap().contains("gone.ics not found"));
}

#[tokio::test]
async fn repeated_sync_is_idempotent_and_respects_the_interval() {
    let day = upcoming_weekday();
    let server = feed_server(day).await;
    let s = setup(
        day,
        Fixture {
            integrations: vec![feed("dept", format!("{}/dept.ics", server.uri()))],
            ..Fixture::default()
        },
    );

    let first = Utc::now();
    s.engine.sync.tick(first).await.unwrap();
    let original = s
        .store
        .find_event("dept", "dept-1@example.com")
        .await
        .unwrap()
        .unwrap();

    let too_soon = s.engine.sync.tick(first + Duration::minutes(10)).await.unwrap();
    assert_eq!(too_soon.skipped, ["dept"]);
    assert!(too_soon.outcomes.is_empty());

    let due = s.engine.sync.tick(first + Duration::minutes(45)).await.unwrap();
    assert_eq!(due.succeeded().count(), 1);

    assert_eq!(s.store.event_count().await, 2);
    let again = s
        .store
        .find_event("dept", "dept-1@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.id, original.id);
}

#[tokio::test]
async fn exception_over_regular_but_not_regular_over_regular() {
    let day = upcoming_weekday();
    let s = setup(day, Fixture::default());
    let start = at(day, 0, 0);

    s.engine
        .booking
        .create_schedule(
            Schedule::new("term", "room-1", ScheduleType::Regular, start, Some(start + Duration::days(30)))
                .unwrap(),
        )
        .await
        .unwrap();
    s.engine
        .booking
        .create_schedule(
            Schedule::new("closure", "room-1", ScheduleType::Exception, start, Some(start + Duration::days(1)))
                .unwrap(),
        )
        .await
        .unwrap();

    let err = s
        .engine
        .booking
        .create_schedule(
            Schedule::new("summer", "room-1", ScheduleType::Regular, start + Duration::days(7), None)
                .unwrap(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(ConflictError::Schedule { .. })));
}

#[tokio::test]
async fn ical_adapter_refuses_writes() {
    let settings = ProviderSettings::default();
    let store = Arc::new(MemoryStore::new());
    let registry =
        ProviderRegistry::with_defaults(&settings, Arc::new(slotwise_engine::StoreSource::new(store)))
            .unwrap();
    let ical = registry.get(ProviderKind::Ical).unwrap();

    let now = Utc::now();
    let draft = EventDraft::new("Anything", now, now + Duration::hours(1));
    let credentials = Credentials::Feed {
        url: "https://example.com/any.ics".into(),
    };
    let err = ical.create_event(&credentials, "", &draft).await.unwrap_err();
    assert_eq!(err.code(), ProviderErrorCode::UnsupportedOperation);
}
