//! Radarr v3 API client.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::client::ServiceHttp;
use super::{
    InventoryItem, InventorySource, MovieHit, MovieLookup, ServiceError, SourceInstance,
};
use crate::config::{ServiceInstance, ServiceType};
use crate::media::{ExternalIds, MediaType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RadarrMovie {
    id: i64,
    #[serde(default)]
    title: String,
    tmdb_id: u32,
    #[serde(default)]
    imdb_id: Option<String>,
    #[serde(default)]
    monitored: bool,
    #[serde(default)]
    has_file: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct QueuePage {
    #[serde(default)]
    pub records: Vec<QueueRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct QueueRecord {
    #[serde(default)]
    pub movie_id: Option<i64>,
    #[serde(default)]
    pub book_id: Option<i64>,
}

/// Radarr API client for one instance.
pub struct RadarrClient {
    http: ServiceHttp,
    instance: SourceInstance,
}

impl RadarrClient {
    pub fn new(config: &ServiceInstance) -> Result<Self, ServiceError> {
        let http = ServiceHttp::new(
            "radarr",
            "X-Api-Key",
            &config.url,
            &config.api_key,
            config.timeout_secs,
        )?;
        Ok(Self {
            http,
            instance: SourceInstance::from_service(ServiceType::Radarr, config),
        })
    }

    pub fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    /// IDs of movies with a download in the queue.
    async fn queued_movie_ids(&self) -> HashSet<i64> {
        let page: Result<QueuePage, _> = self
            .http
            .get_json("queue", "/api/v3/queue", &[("pageSize", "1000".to_string())])
            .await;
        match page {
            Ok(page) => page.records.iter().filter_map(|r| r.movie_id).collect(),
            Err(e) => {
                warn!(instance = %self.instance.name, error = %e, "Failed to read Radarr queue");
                HashSet::new()
            }
        }
    }

    fn to_item(&self, movie: RadarrMovie, queued: &HashSet<i64>) -> InventoryItem {
        InventoryItem {
            external_item_id: movie.id,
            library_item_id: None,
            media_type: MediaType::Movie,
            ids: ExternalIds::tmdb(movie.tmdb_id),
            title: movie.title,
            monitored: movie.monitored,
            grabbed: queued.contains(&movie.id),
            file_count: movie.has_file as u32,
            is_4k: self.instance.is_4k,
            seasons: Vec::new(),
        }
    }
}

#[async_trait]
impl InventorySource for RadarrClient {
    fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    async fn fetch_inventory(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        let movies: Vec<RadarrMovie> = self.http.get_json("movies", "/api/v3/movie", &[]).await?;
        let queued = self.queued_movie_ids().await;

        Ok(movies
            .into_iter()
            .filter(|m| m.tmdb_id > 0)
            .map(|m| self.to_item(m, &queued))
            .collect())
    }
}

#[async_trait]
impl MovieLookup for RadarrClient {
    fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    async fn movie_by_tmdb(&self, tmdb_id: u32) -> Result<Option<MovieHit>, ServiceError> {
        let movies: Vec<RadarrMovie> = self
            .http
            .get_json(
                "movie_lookup",
                "/api/v3/movie",
                &[("tmdbId", tmdb_id.to_string())],
            )
            .await?;

        Ok(movies
            .into_iter()
            .find(|m| m.tmdb_id == tmdb_id)
            .map(|m| MovieHit {
                external_item_id: m.id,
                has_file: m.has_file,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(is_4k: bool) -> ServiceInstance {
        ServiceInstance {
            id: 3,
            name: "Radarr 4K".to_string(),
            url: "http://localhost:7878/".to_string(),
            api_key: "key".to_string(),
            is_default: true,
            is_4k,
            sync_enabled: true,
            active_profile_id: None,
            active_directory: None,
            tags: vec![],
            minimum_availability: None,
            series_type: None,
            active_anime_profile_id: None,
            active_anime_directory: None,
            anime_tags: vec![],
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_movie_json_parsing() {
        let json = r#"[{"id": 12, "title": "The Matrix", "tmdbId": 603, "imdbId": "tt0133093", "monitored": true, "hasFile": true, "sizeOnDisk": 100}]"#;
        let movies: Vec<RadarrMovie> = serde_json::from_str(json).unwrap();
        assert_eq!(movies[0].tmdb_id, 603);
        assert_eq!(movies[0].imdb_id.as_deref(), Some("tt0133093"));
        assert!(movies[0].has_file);
    }

    #[test]
    fn test_item_mapping_uses_instance_track() {
        let client = RadarrClient::new(&instance(true)).unwrap();
        let movie = RadarrMovie {
            id: 12,
            title: "The Matrix".to_string(),
            tmdb_id: 603,
            imdb_id: None,
            monitored: true,
            has_file: false,
        };
        let queued: HashSet<i64> = [12].into_iter().collect();
        let item = client.to_item(movie, &queued);
        assert!(item.is_4k);
        assert!(item.grabbed);
        assert!(!item.has_file());
        assert_eq!(item.ids.tmdb_id, Some(603));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let mut config = instance(false);
        config.api_key.clear();
        assert!(matches!(
            RadarrClient::new(&config),
            Err(ServiceError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = RadarrClient::new(&instance(false)).unwrap();
        assert_eq!(client.http.base_url(), "http://localhost:7878");
    }
}
