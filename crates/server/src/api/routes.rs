use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{availability, handlers, routing, scans};
use super::middleware::metrics_middleware;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Scan sessions
        .route("/scans", get(scans::list_scans))
        .route("/scans/{service}/run", post(scans::run_scan))
        .route("/scans/{service}/cancel", post(scans::cancel_scan))
        // Availability
        .route("/availability/movie/{tmdb_id}", get(availability::movie_availability))
        .route("/availability/tv/{tvdb_id}", get(availability::show_availability))
        .route("/availability/cache", delete(availability::clear_cache))
        // Routing preview
        .route("/routing/resolve", post(routing::resolve));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
