//! Sonarr v3 API client.

use async_trait::async_trait;
use serde::Deserialize;

use super::client::ServiceHttp;
use super::{
    EpisodeInventory, InventoryItem, InventorySource, SeasonInventory, SeriesHit, SeriesLookup,
    ServiceError, SourceInstance,
};
use crate::config::{ServiceInstance, ServiceType};
use crate::media::{ExternalIds, MediaType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrSeries {
    id: i64,
    #[serde(default)]
    title: String,
    tvdb_id: u32,
    #[serde(default)]
    monitored: bool,
    #[serde(default)]
    seasons: Vec<SonarrSeason>,
    #[serde(default)]
    statistics: Option<SonarrStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrSeason {
    season_number: u32,
    #[serde(default)]
    monitored: bool,
    #[serde(default)]
    statistics: Option<SonarrStatistics>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrStatistics {
    #[serde(default)]
    episode_file_count: u32,
    /// Aired, monitored episodes.
    #[serde(default)]
    episode_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrEpisode {
    season_number: u32,
    episode_number: u32,
    #[serde(default)]
    has_file: bool,
}

impl SonarrSeries {
    /// Regular seasons only; specials (season 0) are not tracked.
    fn season_inventory(&self) -> Vec<SeasonInventory> {
        self.seasons
            .iter()
            .filter(|s| s.season_number > 0)
            .map(|s| {
                let stats = s.statistics.as_ref();
                SeasonInventory {
                    season_number: s.season_number,
                    monitored: s.monitored,
                    aired_episodes: stats.map(|st| st.episode_count).unwrap_or(0),
                    episode_file_count: stats.map(|st| st.episode_file_count).unwrap_or(0),
                }
            })
            .collect()
    }

    fn file_count(&self) -> u32 {
        self.statistics
            .as_ref()
            .map(|s| s.episode_file_count)
            .unwrap_or_else(|| self.season_inventory().iter().map(|s| s.episode_file_count).sum())
    }
}

/// Sonarr API client for one instance.
pub struct SonarrClient {
    http: ServiceHttp,
    instance: SourceInstance,
}

impl SonarrClient {
    pub fn new(config: &ServiceInstance) -> Result<Self, ServiceError> {
        let http = ServiceHttp::new(
            "sonarr",
            "X-Api-Key",
            &config.url,
            &config.api_key,
            config.timeout_secs,
        )?;
        Ok(Self {
            http,
            instance: SourceInstance::from_service(ServiceType::Sonarr, config),
        })
    }

    pub fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    fn to_item(&self, series: SonarrSeries) -> InventoryItem {
        InventoryItem {
            external_item_id: series.id,
            library_item_id: None,
            media_type: MediaType::Tv,
            ids: ExternalIds::tvdb(series.tvdb_id),
            file_count: series.file_count(),
            seasons: series.season_inventory(),
            title: series.title,
            monitored: series.monitored,
            grabbed: false,
            is_4k: self.instance.is_4k,
        }
    }
}

#[async_trait]
impl InventorySource for SonarrClient {
    fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    async fn fetch_inventory(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        let series: Vec<SonarrSeries> =
            self.http.get_json("series", "/api/v3/series", &[]).await?;

        Ok(series
            .into_iter()
            .filter(|s| s.tvdb_id > 0)
            .map(|s| self.to_item(s))
            .collect())
    }

    async fn fetch_episodes(
        &self,
        item: &InventoryItem,
    ) -> Result<Vec<EpisodeInventory>, ServiceError> {
        let episodes: Vec<SonarrEpisode> = self
            .http
            .get_json(
                "episodes",
                "/api/v3/episode",
                &[("seriesId", item.external_item_id.to_string())],
            )
            .await?;

        Ok(episodes
            .into_iter()
            .filter(|e| e.season_number > 0)
            .map(|e| EpisodeInventory {
                season_number: e.season_number,
                episode_number: e.episode_number,
                has_file: e.has_file,
                is_4k: self.instance.is_4k,
            })
            .collect())
    }
}

#[async_trait]
impl SeriesLookup for SonarrClient {
    fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    async fn series_by_tvdb(&self, tvdb_id: u32) -> Result<Option<SeriesHit>, ServiceError> {
        let series: Vec<SonarrSeries> = self
            .http
            .get_json(
                "series_lookup",
                "/api/v3/series",
                &[("tvdbId", tvdb_id.to_string())],
            )
            .await?;

        Ok(series
            .into_iter()
            .find(|s| s.tvdb_id == tvdb_id)
            .map(|s| SeriesHit {
                external_item_id: s.id,
                file_count: s.file_count(),
                seasons: s.season_inventory(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERIES_JSON: &str = r#"[{
        "id": 7,
        "title": "Breaking Bad",
        "tvdbId": 81189,
        "monitored": true,
        "seasons": [
            {"seasonNumber": 0, "monitored": false, "statistics": {"episodeFileCount": 2, "episodeCount": 0}},
            {"seasonNumber": 1, "monitored": true, "statistics": {"episodeFileCount": 7, "episodeCount": 7}},
            {"seasonNumber": 2, "monitored": true, "statistics": {"episodeFileCount": 3, "episodeCount": 13}}
        ],
        "statistics": {"episodeFileCount": 12, "episodeCount": 20}
    }]"#;

    #[test]
    fn test_series_parsing_skips_specials() {
        let series: Vec<SonarrSeries> = serde_json::from_str(SERIES_JSON).unwrap();
        let seasons = series[0].season_inventory();
        assert_eq!(seasons.len(), 2);
        assert_eq!(seasons[0].season_number, 1);
        assert_eq!(seasons[0].aired_episodes, 7);
        assert_eq!(seasons[1].episode_file_count, 3);
        assert_eq!(series[0].file_count(), 12);
    }

    #[test]
    fn test_file_count_falls_back_to_seasons() {
        let json = r#"[{"id": 1, "tvdbId": 5, "seasons": [
            {"seasonNumber": 1, "statistics": {"episodeFileCount": 4, "episodeCount": 4}},
            {"seasonNumber": 2, "statistics": {"episodeFileCount": 1, "episodeCount": 4}}
        ]}]"#;
        let series: Vec<SonarrSeries> = serde_json::from_str(json).unwrap();
        assert_eq!(series[0].file_count(), 5);
    }

    #[test]
    fn test_episode_parsing() {
        let json = r#"[{"seasonNumber": 1, "episodeNumber": 2, "hasFile": true, "airDateUtc": "2008-01-27T02:00:00Z"}]"#;
        let episodes: Vec<SonarrEpisode> = serde_json::from_str(json).unwrap();
        assert!(episodes[0].has_file);
        assert_eq!(episodes[0].episode_number, 2);
    }
}
