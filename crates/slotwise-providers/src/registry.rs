//! Lookup of adapters by provider kind.

use std::collections::HashMap;
use std::sync::Arc;

use slotwise_core::ProviderKind;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::google::GoogleProvider;
use crate::ical::IcalProvider;
use crate::internal::{InternalProvider, InternalSource};
use crate::outlook::OutlookProvider;
use crate::provider::CalendarProvider;
use crate::settings::ProviderSettings;

/// Maps each [`ProviderKind`] to its adapter.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn CalendarProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the four built-in adapters.
    pub fn with_defaults(
        settings: &ProviderSettings,
        internal: Arc<dyn InternalSource>,
    ) -> ProviderResult<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(GoogleProvider::new(settings.google())?));
        registry.register(Arc::new(OutlookProvider::new(settings.outlook())?));
        registry.register(Arc::new(IcalProvider::new(settings.ical())?));
        registry.register(Arc::new(InternalProvider::new(internal)));
        Ok(registry)
    }

    /// Adds or replaces the adapter for its kind.
    pub fn register(&mut self, provider: Arc<dyn CalendarProvider>) -> &mut Self {
        let kind = provider.kind();
        debug!(provider = %kind, "registered calendar provider");
        self.providers.insert(kind, provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> ProviderResult<Arc<dyn CalendarProvider>> {
        self.providers.get(&kind).cloned().ok_or_else(|| {
            ProviderError::configuration(format!("no adapter registered for {kind}"))
                .with_provider(kind.as_str())
        })
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.providers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::provider::BoxFuture;
    use slotwise_core::{Reservation, Schedule, TimeWindow};

    struct Empty;

    impl InternalSource for Empty {
        fn reservations<'a>(
            &'a self,
            _resource_id: &'a str,
            _window: TimeWindow,
        ) -> BoxFuture<'a, ProviderResult<Vec<Reservation>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn maintenance_schedules<'a>(
            &'a self,
            _resource_id: &'a str,
        ) -> BoxFuture<'a, ProviderResult<Vec<Schedule>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    #[test]
    fn defaults_cover_every_kind() {
        let registry =
            ProviderRegistry::with_defaults(&ProviderSettings::default(), Arc::new(Empty)).unwrap();
        assert_eq!(
            registry.kinds(),
            [
                ProviderKind::Google,
                ProviderKind::Outlook,
                ProviderKind::Ical,
                ProviderKind::Internal
            ]
        );
        assert_eq!(
            registry.get(ProviderKind::Ical).unwrap().kind(),
            ProviderKind::Ical
        );
    }

    #[test]
    fn missing_adapter_is_configuration_error() {
        let err = match ProviderRegistry::new().get(ProviderKind::Google) {
            Ok(_) => panic!("empty registry returned an adapter"),
            Err(e) => e,
        };
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }
}
