//! Scan session API handlers.
//!
//! Sessions started here run in the background; the response only carries
//! the session ID. Progress is polled through `GET /scans`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use requestarr_core::SchedulerStatus;

use super::ApiError;
use crate::state::AppState;

/// Response for a started scan
#[derive(Debug, Serialize)]
pub struct RunScanResponse {
    pub service: String,
    pub session_id: String,
}

/// Response for a cancellation request
#[derive(Debug, Serialize)]
pub struct CancelScanResponse {
    pub service: String,
    /// False when no session was running.
    pub cancelled: bool,
}

/// Scheduler state and the status of every scanner
pub async fn list_scans(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(state.scheduler().status())
}

/// Start a scan session, superseding any session already running
pub async fn run_scan(
    State(state): State<Arc<AppState>>,
    Path(service): Path<String>,
) -> Result<(StatusCode, Json<RunScanResponse>), ApiError> {
    let controller = state
        .controller(&service)
        .ok_or_else(|| ApiError::not_found(format!("Unknown scanner: {}", service)))?;

    let handle = controller.run();
    info!(service = %service, session = %handle.session_id, "Scan started via API");

    Ok((
        StatusCode::ACCEPTED,
        Json(RunScanResponse {
            service,
            session_id: handle.session_id,
        }),
    ))
}

/// Cancel the running session of a scanner
pub async fn cancel_scan(
    State(state): State<Arc<AppState>>,
    Path(service): Path<String>,
) -> Result<Json<CancelScanResponse>, ApiError> {
    let controller = state
        .controller(&service)
        .ok_or_else(|| ApiError::not_found(format!("Unknown scanner: {}", service)))?;

    let cancelled = controller.cancel();
    Ok(Json(CancelScanResponse { service, cancelled }))
}
