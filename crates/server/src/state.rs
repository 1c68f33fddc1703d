use std::sync::Arc;

use requestarr_core::{
    AvailabilityAggregator, Config, RequestRouter, SanitizedConfig, ScanController, SyncScheduler,
};

/// Shared application state
pub struct AppState {
    config: Config,
    controllers: Vec<Arc<dyn ScanController>>,
    scheduler: Arc<SyncScheduler>,
    aggregator: Arc<AvailabilityAggregator>,
    router: Arc<RequestRouter>,
}

impl AppState {
    pub fn new(
        config: Config,
        controllers: Vec<Arc<dyn ScanController>>,
        scheduler: Arc<SyncScheduler>,
        aggregator: Arc<AvailabilityAggregator>,
        router: Arc<RequestRouter>,
    ) -> Self {
        Self {
            config,
            controllers,
            scheduler,
            aggregator,
            router,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Scan controller for a service name ("radarr", "sonarr", ...).
    pub fn controller(&self, service: &str) -> Option<&Arc<dyn ScanController>> {
        self.controllers.iter().find(|c| c.name() == service)
    }

    pub fn scheduler(&self) -> &SyncScheduler {
        &self.scheduler
    }

    pub fn aggregator(&self) -> &AvailabilityAggregator {
        &self.aggregator
    }

    pub fn request_router(&self) -> &RequestRouter {
        &self.router
    }
}
