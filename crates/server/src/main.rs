use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use requestarr_core::notification::agents_from_config;
use requestarr_core::{
    create_notification_system, load_config, scan_controllers, validate_config,
    AvailabilityAggregator, MediaStore, OverrideEvaluator, ReconciliationEngine, RequestRouter,
    RoutingResolver, RuleStore, ServiceClients, SqliteMediaStore, SqliteRuleStore, SyncScheduler,
};

use requestarr_server::api::create_router;
use requestarr_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let json = std::env::var("REQUESTARR_LOG_JSON").is_ok_and(|v| v == "1");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

async fn run() -> Result<()> {
    init_logging();

    // Determine config path
    let config_path = std::env::var("REQUESTARR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!(version = VERSION, "Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Routing mode: {:?}", config.routing.mode);

    // Stores share one SQLite file
    let media_store: Arc<dyn MediaStore> = Arc::new(
        SqliteMediaStore::new(&config.database.path).context("Failed to create media store")?,
    );
    let rule_store: Arc<dyn RuleStore> = Arc::new(
        SqliteRuleStore::new(&config.database.path).context("Failed to create rule store")?,
    );
    info!("Stores initialized");

    // Notifications
    let agents = agents_from_config(&config.notifications);
    info!(agents = agents.len(), "Notification agents configured");
    let (notifier, dispatcher) =
        create_notification_system(agents, config.notifications.buffer_size);
    let dispatcher_handle = tokio::spawn(dispatcher.run());

    let engine = Arc::new(ReconciliationEngine::new(media_store).with_notifier(notifier.clone()));

    // Service clients
    let clients = ServiceClients::from_config(&config).context("Failed to create service clients")?;
    info!(
        radarr = clients.radarr.len(),
        sonarr = clients.sonarr.len(),
        readarr = clients.readarr.len(),
        jellyfin = clients.jellyfin.is_some(),
        "Service clients initialized"
    );

    let aggregator = Arc::new(AvailabilityAggregator::new(
        clients.movie_lookups(),
        clients.series_lookups(),
    ));

    let controllers = scan_controllers(&config, &clients, Arc::clone(&engine), Some(notifier.clone()));
    let scheduler = Arc::new(SyncScheduler::new(
        config.scheduler.clone(),
        controllers.clone(),
        Some(Arc::clone(&aggregator)),
    ));

    if config.scheduler.enabled {
        scheduler.start().await;
    } else {
        info!("Scheduler disabled in config, scans run on demand only");
    }

    let settings = config.service_settings();
    let router = Arc::new(RequestRouter::new(
        config.routing.mode,
        RoutingResolver::new(Arc::clone(&rule_store), settings.clone()),
        OverrideEvaluator::new(rule_store, settings),
        engine,
    ));

    let state = Arc::new(AppState::new(
        config.clone(),
        controllers,
        Arc::clone(&scheduler),
        aggregator,
        router,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if config.scheduler.enabled {
        scheduler.stop().await;
    }

    // Scan loops and the engine still hold handle clones
    drop(notifier);
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), dispatcher_handle).await;
    info!("Notification dispatcher stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
