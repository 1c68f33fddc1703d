//! Mock per-title lookups for testing availability aggregation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::fixtures;
use crate::arr::{MovieHit, MovieLookup, SeriesHit, SeriesLookup, ServiceError, SourceInstance};

/// Mock Radarr instance answering TMDB lookups.
pub struct MockMovieLookup {
    instance: SourceInstance,
    movies: Arc<RwLock<HashMap<u32, MovieHit>>>,
    next_error: Arc<RwLock<Option<ServiceError>>>,
    calls: Arc<RwLock<usize>>,
}

impl MockMovieLookup {
    pub fn new(id: i64, is_4k: bool) -> Self {
        Self {
            instance: fixtures::source(id, "radarr", is_4k),
            movies: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(0)),
        }
    }

    pub async fn add_movie(&self, tmdb_id: u32, hit: MovieHit) {
        self.movies.write().await.insert(tmdb_id, hit);
    }

    pub async fn set_next_error(&self, error: ServiceError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn call_count(&self) -> usize {
        *self.calls.read().await
    }
}

#[async_trait]
impl MovieLookup for MockMovieLookup {
    fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    async fn movie_by_tmdb(&self, tmdb_id: u32) -> Result<Option<MovieHit>, ServiceError> {
        *self.calls.write().await += 1;
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self.movies.read().await.get(&tmdb_id).cloned())
    }
}

/// Mock Sonarr instance answering TVDB lookups.
pub struct MockSeriesLookup {
    instance: SourceInstance,
    series: Arc<RwLock<HashMap<u32, SeriesHit>>>,
    next_error: Arc<RwLock<Option<ServiceError>>>,
    calls: Arc<RwLock<usize>>,
}

impl MockSeriesLookup {
    pub fn new(id: i64, is_4k: bool) -> Self {
        Self {
            instance: fixtures::source(id, "sonarr", is_4k),
            series: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(0)),
        }
    }

    pub async fn add_series(&self, tvdb_id: u32, hit: SeriesHit) {
        self.series.write().await.insert(tvdb_id, hit);
    }

    pub async fn set_next_error(&self, error: ServiceError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn call_count(&self) -> usize {
        *self.calls.read().await
    }
}

#[async_trait]
impl SeriesLookup for MockSeriesLookup {
    fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    async fn series_by_tvdb(&self, tvdb_id: u32) -> Result<Option<SeriesHit>, ServiceError> {
        *self.calls.write().await += 1;
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self.series.read().await.get(&tvdb_id).cloned())
    }
}
