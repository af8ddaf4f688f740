//! Wiring of the engine components around one store.

use std::sync::Arc;

use slotwise_providers::ProviderRegistry;
use tracing::debug;

use crate::availability::AvailabilityResolver;
use crate::booking::BookingGuard;
use crate::composer::CalendarViewComposer;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::publisher::EventPublisher;
use crate::repository::{Store, StoreSource};
use crate::sync::SyncOrchestrator;

/// Every engine component, sharing one store and publisher.
pub struct Engine {
    pub resolver: AvailabilityResolver,
    pub composer: CalendarViewComposer,
    pub booking: BookingGuard,
    pub sync: Arc<SyncOrchestrator>,
}

impl Engine {
    /// Builds the components with the built-in provider adapters.
    pub fn new(
        config: &EngineConfig,
        store: Arc<dyn Store>,
        publisher: Arc<dyn EventPublisher>,
    ) -> EngineResult<Self> {
        let internal = Arc::new(StoreSource::new(store.clone()));
        let registry = ProviderRegistry::with_defaults(&config.providers, internal)?;
        Self::with_registry(config, store, publisher, registry)
    }

    /// Builds the components around a caller-supplied registry.
    pub fn with_registry(
        config: &EngineConfig,
        store: Arc<dyn Store>,
        publisher: Arc<dyn EventPublisher>,
        registry: ProviderRegistry,
    ) -> EngineResult<Self> {
        config.validate()?;
        debug!(providers = ?registry.kinds(), "Building engine");

        let resolver = AvailabilityResolver::new(store.clone())
            .with_slot_minutes(config.availability.slot_minutes)
            .with_max_range_days(config.availability.max_range_days);
        let composer = CalendarViewComposer::new(store.clone(), resolver.clone())
            .with_business_hours(config.calendar.business_start, config.calendar.business_end)?;
        let booking = BookingGuard::new(store.clone(), resolver.clone(), publisher.clone());
        let sync = SyncOrchestrator::new(store, Arc::new(registry), publisher)
            .with_max_concurrency(config.sync.max_concurrency);

        Ok(Self {
            resolver,
            composer,
            booking,
            sync: Arc::new(sync),
        })
    }
}
