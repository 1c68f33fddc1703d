//! Availability API handlers.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use requestarr_core::{InstanceAvailability, ShowInstanceAvailability};

use super::ApiError;
use crate::state::AppState;

fn parse_id(id: Result<Path<u32>, PathRejection>, kind: &str) -> Result<u32, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request(format!("Invalid {} ID", kind)))
}

/// Which Radarr instances hold a movie, by TMDB ID
pub async fn movie_availability(
    State(state): State<Arc<AppState>>,
    tmdb_id: Result<Path<u32>, PathRejection>,
) -> Result<Json<InstanceAvailability>, ApiError> {
    let tmdb_id = parse_id(tmdb_id, "TMDB")?;
    Ok(Json(state.aggregator().check_movie_availability(tmdb_id).await))
}

/// Which Sonarr instances hold a show, by TVDB ID, with per-season counts
pub async fn show_availability(
    State(state): State<Arc<AppState>>,
    tvdb_id: Result<Path<u32>, PathRejection>,
) -> Result<Json<ShowInstanceAvailability>, ApiError> {
    let tvdb_id = parse_id(tvdb_id, "TVDB")?;
    Ok(Json(state.aggregator().check_show_availability(tvdb_id).await))
}

pub async fn clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.aggregator().clear_cache();
    StatusCode::NO_CONTENT
}
