//! Synthetic provider over the booking system's own data.
//!
//! Exposes reservations and maintenance schedules of a resource as external
//! events, so that internal usage can be mirrored like any other calendar.

use std::sync::Arc;

use chrono::Utc;
use slotwise_core::{Credentials, ProviderKind, Reservation, ReservationStatus, Schedule, TimeWindow};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, lookahead_window};
use crate::raw_event::{RawEvent, RawEventTime};

/// External id prefix of mirrored reservations, `reservation:{id}`.
pub const RESERVATION_ID_PREFIX: &str = "reservation:";
/// External id prefix of maintenance occurrences, `maintenance:{schedule}:{YYYYMMDD}`.
pub const MAINTENANCE_ID_PREFIX: &str = "maintenance:";

/// Read access to the booking system's own records.
pub trait InternalSource: Send + Sync {
    /// Reservations of the resource overlapping the window.
    fn reservations<'a>(
        &'a self,
        resource_id: &'a str,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<Reservation>>>;

    /// MAINTENANCE schedules of the resource, active or not.
    fn maintenance_schedules<'a>(
        &'a self,
        resource_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<Schedule>>>;
}

/// Provider that reads from an [`InternalSource`].
///
/// The `calendar_id` of the integration names the resource.
pub struct InternalProvider {
    source: Arc<dyn InternalSource>,
}

impl InternalProvider {
    pub fn new(source: Arc<dyn InternalSource>) -> Self {
        Self { source }
    }

    fn reservation_event(reservation: &Reservation, calendar_id: &str) -> RawEvent {
        let status = match reservation.status {
            ReservationStatus::Pending => "tentative",
            ReservationStatus::Approved | ReservationStatus::Completed => "confirmed",
            ReservationStatus::Rejected | ReservationStatus::Cancelled => "cancelled",
        };
        RawEvent::new(
            format!("{RESERVATION_ID_PREFIX}{}", reservation.id),
            RawEventTime::DateTime(reservation.start),
            RawEventTime::DateTime(reservation.end),
            calendar_id,
        )
        .with_summary(reservation.display_title())
        .with_status(status)
        .with_all_day(false)
    }

    fn maintenance_events(
        schedule: &Schedule,
        window: &TimeWindow,
        calendar_id: &str,
    ) -> Vec<RawEvent> {
        let status = if schedule.is_active {
            "confirmed"
        } else {
            "cancelled"
        };
        schedule
            .expand(window)
            .into_iter()
            .map(|occurrence| {
                RawEvent::new(
                    format!(
                        "{MAINTENANCE_ID_PREFIX}{}:{}",
                        schedule.id,
                        occurrence.start.format("%Y%m%d")
                    ),
                    RawEventTime::DateTime(occurrence.start),
                    RawEventTime::DateTime(occurrence.end),
                    calendar_id,
                )
                .with_summary(schedule.display_title())
                .with_status(status)
                .with_all_day(false)
            })
            .collect()
    }
}

impl CalendarProvider for InternalProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Internal
    }

    fn validate_credentials<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        let checked = credentials
            .check_shape(ProviderKind::Internal)
            .map_err(|e| ProviderError::invalid_credentials(e.to_string()).with_provider("INTERNAL"));
        Box::pin(async move { checked })
    }

    fn fetch_events<'a>(
        &'a self,
        credentials: &'a Credentials,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            self.validate_credentials(credentials).await?;
            let window = lookahead_window(Utc::now());

            let mut events: Vec<RawEvent> = self
                .source
                .reservations(calendar_id, window)
                .await?
                .iter()
                .map(|r| Self::reservation_event(r, calendar_id))
                .collect();

            for schedule in self.source.maintenance_schedules(calendar_id).await? {
                events.extend(Self::maintenance_events(&schedule, &window, calendar_id));
            }

            debug!(resource_id = calendar_id, count = events.len(), "internal events");
            Ok(events)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{Duration, DurationRound};
    use slotwise_core::ScheduleType;

    struct Fixed {
        reservations: Vec<Reservation>,
        schedules: Vec<Schedule>,
    }

    impl InternalSource for Fixed {
        fn reservations<'a>(
            &'a self,
            resource_id: &'a str,
            window: TimeWindow,
        ) -> BoxFuture<'a, ProviderResult<Vec<Reservation>>> {
            let found: Vec<_> = self
                .reservations
                .iter()
                .filter(|r| r.resource_id == resource_id && window.overlaps(r.start, r.end))
                .cloned()
                .collect();
            Box::pin(async move { Ok(found) })
        }

        fn maintenance_schedules<'a>(
            &'a self,
            resource_id: &'a str,
        ) -> BoxFuture<'a, ProviderResult<Vec<Schedule>>> {
            let found: Vec<_> = self
                .schedules
                .iter()
                .filter(|s| s.resource_id == resource_id)
                .cloned()
                .collect();
            Box::pin(async move { Ok(found) })
        }
    }

    #[tokio::test]
    async fn mirrors_reservations_and_maintenance() {
        let base = Utc::now().duration_trunc(Duration::hours(1)).unwrap() + Duration::days(1);
        let pending = Reservation::new("r1", "lab-1", "u1", base, base + Duration::hours(1)).unwrap();
        let rejected = Reservation::new("r2", "lab-1", "u2", base, base + Duration::hours(2))
            .unwrap()
            .with_status(ReservationStatus::Rejected);
        let maintenance = Schedule::new(
            "m1",
            "lab-1",
            ScheduleType::Maintenance,
            base + Duration::days(2),
            Some(base + Duration::days(2) + Duration::hours(3)),
        )
        .unwrap()
        .with_title("Calibration");

        let provider = InternalProvider::new(Arc::new(Fixed {
            reservations: vec![pending, rejected],
            schedules: vec![maintenance],
        }));
        let events = provider
            .fetch_events(&Credentials::None, "lab-1")
            .await
            .unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].id, "reservation:r1");
        assert_eq!(events[0].status.as_deref(), Some("tentative"));
        assert_eq!(events[0].effective_title(), "Reservation");
        assert_eq!(events[1].status.as_deref(), Some("cancelled"));
        assert!(events[2].id.starts_with("maintenance:m1:"));
        assert_eq!(events[2].effective_title(), "Calibration");
    }

    #[tokio::test]
    async fn rejects_feed_credentials() {
        let provider = InternalProvider::new(Arc::new(Fixed {
            reservations: Vec::new(),
            schedules: Vec::new(),
        }));
        let creds = Credentials::Feed {
            url: "https://example.com/a.ics".into(),
        };
        let err = provider.validate_credentials(&creds).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidCredentials);
        assert_eq!(err.provider(), Some("INTERNAL"));
    }
}
