//! Fire-and-forget domain events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotwise_core::ProviderKind;
use slotwise_providers::BoxFuture;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

pub const TOPIC_SYNC_COMPLETED: &str = "calendar.sync.completed";
pub const TOPIC_SYNC_FAILED: &str = "calendar.sync.failed";
pub const TOPIC_AVAILABILITY_CREATED: &str = "availability.created";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all_fields = "camelCase")]
pub enum DomainEvent {
    #[serde(rename = "calendar.sync.completed")]
    SyncCompleted {
        integration_id: String,
        provider: ProviderKind,
        upserted: usize,
        removed: usize,
        at: DateTime<Utc>,
    },
    #[serde(rename = "calendar.sync.failed")]
    SyncFailed {
        integration_id: String,
        provider: ProviderKind,
        error: String,
        at: DateTime<Utc>,
    },
    #[serde(rename = "availability.created")]
    AvailabilityCreated {
        window_id: String,
        resource_id: String,
    },
}

impl DomainEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            Self::SyncCompleted { .. } => TOPIC_SYNC_COMPLETED,
            Self::SyncFailed { .. } => TOPIC_SYNC_FAILED,
            Self::AvailabilityCreated { .. } => TOPIC_AVAILABILITY_CREATED,
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event channel closed")]
    Closed,
}

/// Sink for domain events. Publishing never blocks the caller's outcome.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DomainEvent) -> BoxFuture<'_, Result<(), PublishError>>;
}

/// Logs each event at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, event: DomainEvent) -> BoxFuture<'_, Result<(), PublishError>> {
        Box::pin(async move {
            let payload = serde_json::to_string(&event).unwrap_or_default();
            info!(topic = event.topic(), %payload, "domain event");
            Ok(())
        })
    }
}

/// Forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventPublisher for ChannelPublisher {
    fn publish(&self, event: DomainEvent) -> BoxFuture<'_, Result<(), PublishError>> {
        let sent = self.tx.send(event).map_err(|_| PublishError::Closed);
        Box::pin(async move { sent })
    }
}
