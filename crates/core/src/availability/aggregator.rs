//! Cross-instance availability aggregation.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use super::{
    AvailabilityCache, InMemoryAvailabilityCache, InstanceAvailability, InstanceHit,
    SeasonAvailability, ShowInstanceAvailability,
};
use crate::arr::{MovieLookup, SeriesLookup};
use crate::metrics::AVAILABILITY_CACHE;

/// Answers "which instances hold this title, and on which track".
pub struct AvailabilityAggregator {
    movies: Vec<Arc<dyn MovieLookup>>,
    series: Vec<Arc<dyn SeriesLookup>>,
    cache: Arc<dyn AvailabilityCache>,
}

impl AvailabilityAggregator {
    pub fn new(movies: Vec<Arc<dyn MovieLookup>>, series: Vec<Arc<dyn SeriesLookup>>) -> Self {
        Self {
            movies,
            series,
            cache: Arc::new(InMemoryAvailabilityCache::new()),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn AvailabilityCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Availability of a movie on every Radarr instance.
    ///
    /// Instances that error or do not have the movie are skipped.
    pub async fn check_movie_availability(&self, tmdb_id: u32) -> InstanceAvailability {
        if let Some(cached) = self.cache.get_movie(tmdb_id) {
            AVAILABILITY_CACHE.with_label_values(&["movie", "hit"]).inc();
            return cached;
        }
        AVAILABILITY_CACHE.with_label_values(&["movie", "miss"]).inc();

        let results = join_all(
            self.movies
                .iter()
                .map(|lookup| async move { (lookup.instance(), lookup.movie_by_tmdb(tmdb_id).await) }),
        )
        .await;

        let mut availability = InstanceAvailability::default();
        for (instance, result) in results {
            match result {
                Ok(Some(hit)) if hit.has_file => availability.record(InstanceHit {
                    instance_id: instance.id,
                    instance_name: instance.name.clone(),
                    is_4k: instance.is_4k,
                    external_item_id: hit.external_item_id,
                }),
                Ok(Some(_)) => {
                    debug!(tmdb_id, instance = %instance.name, "Movie has no file");
                }
                Ok(None) => {
                    debug!(tmdb_id, instance = %instance.name, "Movie not in instance");
                }
                Err(e) => {
                    debug!(tmdb_id, instance = %instance.name, error = %e, "Movie lookup failed");
                }
            }
        }

        self.cache.put_movie(tmdb_id, availability.clone());
        availability
    }

    /// Availability of a show on every Sonarr instance, with per-season
    /// episode file counts.
    ///
    /// For each season and track the highest count across instances wins.
    pub async fn check_show_availability(&self, tvdb_id: u32) -> ShowInstanceAvailability {
        if let Some(cached) = self.cache.get_show(tvdb_id) {
            AVAILABILITY_CACHE.with_label_values(&["show", "hit"]).inc();
            return cached;
        }
        AVAILABILITY_CACHE.with_label_values(&["show", "miss"]).inc();

        let results = join_all(
            self.series
                .iter()
                .map(|lookup| async move { (lookup.instance(), lookup.series_by_tvdb(tvdb_id).await) }),
        )
        .await;

        let mut availability = ShowInstanceAvailability::default();
        // season -> (standard, 4k)
        let mut seasons: BTreeMap<u32, (u32, u32)> = BTreeMap::new();

        for (instance, result) in results {
            let hit = match result {
                Ok(Some(hit)) if hit.file_count > 0 => hit,
                Ok(Some(_)) => {
                    debug!(tvdb_id, instance = %instance.name, "Series has no files");
                    continue;
                }
                Ok(None) => {
                    debug!(tvdb_id, instance = %instance.name, "Series not in instance");
                    continue;
                }
                Err(e) => {
                    debug!(tvdb_id, instance = %instance.name, error = %e, "Series lookup failed");
                    continue;
                }
            };

            if instance.is_4k {
                availability.has_4k = true;
            } else {
                availability.has_standard = true;
            }
            availability.instances.push(InstanceHit {
                instance_id: instance.id,
                instance_name: instance.name.clone(),
                is_4k: instance.is_4k,
                external_item_id: hit.external_item_id,
            });

            for season in hit.seasons.iter().filter(|s| s.episode_file_count > 0) {
                let entry = seasons.entry(season.season_number).or_default();
                let slot = if instance.is_4k { &mut entry.1 } else { &mut entry.0 };
                *slot = (*slot).max(season.episode_file_count);
            }
        }

        availability.seasons = seasons
            .into_iter()
            .map(|(season_number, (standard, uhd))| SeasonAvailability {
                season_number,
                episodes_standard: standard,
                episodes_4k: uhd,
            })
            .collect();

        self.cache.put_show(tvdb_id, availability.clone());
        availability
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("Availability cache cleared");
    }
}
