//! Availability resolution and calendar synchronization.
//!
//! This crate ties the core model and the provider adapters together:
//! - [`SyncOrchestrator`] pulls due integrations into the event store
//! - [`PollScheduler`] drives sync cycles on an interval
//! - [`AvailabilityResolver`] partitions candidate slots into available and conflicting
//! - [`CalendarViewComposer`] merges everything into a per-resource view
//! - [`BookingGuard`] enforces overlap and restriction rules at creation time
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chrono::{Duration, Utc};
//! use slotwise_core::TimeWindow;
//! use slotwise_engine::{Engine, EngineConfig, ExternalMode, MemoryStore, TracingPublisher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let engine = Engine::new(&EngineConfig::default(), store, Arc::new(TracingPublisher))?;
//!
//!     engine.sync.tick(Utc::now()).await?;
//!     let week = TimeWindow::from_duration(Utc::now(), Duration::days(7))?;
//!     let availability = engine
//!         .resolver
//!         .resolve("room-1", week, ExternalMode::Optional)
//!         .await?;
//!     println!("{} free slots", availability.available.len());
//!     Ok(())
//! }
//! ```

mod availability;
mod booking;
mod composer;
mod config;
mod engine;
mod error;
mod memory;
mod publisher;
pub mod repository;
mod scheduler;
mod sync;

pub use availability::{
    Availability, AvailabilityResolver, ConflictSource, ConflictingSlot, ExternalMode,
    Restriction, ScheduleNote, Slot, SlotCheck, SlotQuery,
};
pub use booking::BookingGuard;
pub use composer::{
    CalendarView, CalendarViewComposer, DEFAULT_BUSINESS_END, DEFAULT_BUSINESS_START, ViewEvent,
    ViewEventKind, ViewOptions,
};
pub use config::{AvailabilitySettings, CalendarSettings, EngineConfig, SyncSettings};
pub use engine::Engine;
pub use error::{ConflictError, EngineError, EngineResult};
pub use memory::{Fixture, MemoryStore};
pub use publisher::{
    ChannelPublisher, DomainEvent, EventPublisher, PublishError, TOPIC_AVAILABILITY_CREATED,
    TOPIC_SYNC_COMPLETED, TOPIC_SYNC_FAILED, TracingPublisher,
};
pub use repository::{RepositoryError, RepositoryResult, Store, StoreSource};
pub use scheduler::{PollCommand, PollConfig, PollHandle, PollScheduler, PollState, SharedPollState};
pub use sync::{
    IntegrationOutcome, SyncCounts, SyncOrchestrator, SyncOutcome, SyncPhase, SyncReport,
    SyncStatus,
};
