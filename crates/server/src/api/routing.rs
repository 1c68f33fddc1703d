//! Routing preview API.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use requestarr_core::{RouteQuery, RouteResolution, RoutingMode};

use super::ApiError;
use crate::state::AppState;

/// Resolved destination plus the mode that produced it
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub mode: RoutingMode,
    #[serde(flatten)]
    pub resolution: RouteResolution,
}

/// Resolve where a request would be sent, without creating anything
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RouteQuery>, JsonRejection>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let Json(query) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let router = state.request_router();
    let resolution = router.route(query)?;
    Ok(Json(ResolveResponse {
        mode: router.mode(),
        resolution,
    }))
}
