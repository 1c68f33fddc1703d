pub mod arr;
pub mod availability;
pub mod config;
pub mod media;
pub mod metrics;
pub mod notification;
pub mod reconcile;
pub mod routing;
pub mod scan;
pub mod scheduler;
pub mod testing;

pub use arr::{InventoryItem, InventorySource, ServiceClients, ServiceError, SourceInstance};
pub use availability::{
    AvailabilityAggregator, AvailabilityCache, InMemoryAvailabilityCache, InstanceAvailability,
    ShowInstanceAvailability,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, RoutingMode,
    SanitizedConfig, ServiceSettings, ServiceType,
};
pub use media::{
    ExternalIds, Media, MediaError, MediaRequest, MediaSnapshot, MediaStatus, MediaStore,
    MediaType, RequestStatus, SqliteMediaStore, Track,
};
pub use notification::{create_notification_system, NotificationEvent, NotificationHandle};
pub use reconcile::{
    AlwaysCurrent, ApplyOutcome, ReconcileError, ReconciliationEngine, TransitionGuard,
};
pub use routing::{
    OverrideEvaluator, RequestError, RequestRouter, RouteQuery, RouteResolution, RoutingError,
    RoutingResolver, RuleStore, SqliteRuleStore,
};
pub use scan::{scan_controllers, ScanController, ScanError, ScanOutcome, ScanStatus};
pub use scheduler::{SchedulerStatus, SyncScheduler};
