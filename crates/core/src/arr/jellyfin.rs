//! Jellyfin media server client.
//!
//! Anything present in the library is available. Video items whose widest
//! stream is at least 2000 px belong on the 4K track; an item with both a 4K
//! and a lower-resolution version is reported once per track. Missing
//! episodes that have already aired are reported without a file so that
//! seasons are measured against their full length.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::client::ServiceHttp;
use super::{EpisodeInventory, InventoryItem, InventorySource, ServiceError, SourceInstance};
use crate::config::JellyfinConfig;
use crate::media::{ExternalIds, MediaType};

/// Minimum video width treated as 4K.
const UHD_MIN_WIDTH: u32 = 2000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<JellyfinItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct JellyfinItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "Type", default)]
    item_type: String,
    #[serde(default)]
    provider_ids: ProviderIds,
    #[serde(default)]
    media_sources: Vec<MediaSource>,
    /// Season number for episodes.
    #[serde(default)]
    parent_index_number: Option<u32>,
    /// Episode number for episodes.
    #[serde(default)]
    index_number: Option<u32>,
    #[serde(default)]
    location_type: Option<String>,
    #[serde(default)]
    premiere_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProviderIds {
    #[serde(default)]
    tmdb: Option<String>,
    #[serde(default)]
    tvdb: Option<String>,
    #[serde(default)]
    music_brainz_release_group: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MediaSource {
    #[serde(default)]
    media_streams: Vec<MediaStream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MediaStream {
    #[serde(rename = "Type", default)]
    stream_type: String,
    #[serde(default)]
    width: Option<u32>,
}

impl JellyfinItem {
    /// (has standard version, has 4K version)
    fn resolutions(&self) -> (bool, bool) {
        let mut standard = false;
        let mut uhd = false;
        for source in &self.media_sources {
            let width = source
                .media_streams
                .iter()
                .filter(|s| s.stream_type == "Video")
                .filter_map(|s| s.width)
                .max();
            match width {
                Some(w) if w >= UHD_MIN_WIDTH => uhd = true,
                _ => standard = true,
            }
        }
        if !standard && !uhd {
            // No stream info reported; count it as a standard copy
            standard = true;
        }
        (standard, uhd)
    }

    fn is_missing(&self) -> bool {
        self.location_type.as_deref() == Some("Virtual")
    }

    fn aired_before(&self, now: DateTime<Utc>) -> bool {
        self.premiere_date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .is_some_and(|d| d.with_timezone(&Utc) <= now)
    }
}

/// Episode entries for a series listing.
///
/// Present episodes yield one entry per track they exist on. Missing
/// episodes yield a single entry without a file once aired; unaired ones are
/// dropped along with specials.
fn to_episodes(items: Vec<JellyfinItem>, now: DateTime<Utc>) -> Vec<EpisodeInventory> {
    let mut episodes = Vec::new();
    for episode in items {
        let (Some(season_number), Some(episode_number)) =
            (episode.parent_index_number, episode.index_number)
        else {
            continue;
        };
        if season_number == 0 {
            continue;
        }
        if episode.is_missing() {
            if episode.aired_before(now) {
                episodes.push(EpisodeInventory {
                    season_number,
                    episode_number,
                    has_file: false,
                    is_4k: false,
                });
            }
            continue;
        }
        let (standard, uhd) = episode.resolutions();
        for (is_4k, present) in [(false, standard), (true, uhd)] {
            if present {
                episodes.push(EpisodeInventory {
                    season_number,
                    episode_number,
                    has_file: true,
                    is_4k,
                });
            }
        }
    }
    episodes
}

fn parse_id(value: &Option<String>) -> Option<u32> {
    value.as_deref().and_then(|v| v.parse().ok())
}

/// Jellyfin API client.
pub struct JellyfinClient {
    http: ServiceHttp,
    user_id: String,
    instance: SourceInstance,
}

impl JellyfinClient {
    pub fn new(config: &JellyfinConfig) -> Result<Self, ServiceError> {
        if config.user_id.is_empty() {
            return Err(ServiceError::NotConfigured(
                "Jellyfin user_id is required".to_string(),
            ));
        }
        let http = ServiceHttp::new(
            "jellyfin",
            "X-Emby-Token",
            &config.url,
            &config.api_key,
            config.timeout_secs,
        )?;
        Ok(Self {
            http,
            user_id: config.user_id.clone(),
            instance: SourceInstance::jellyfin(),
        })
    }

    pub fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    fn to_items(&self, item: JellyfinItem) -> Vec<InventoryItem> {
        let (media_type, ids) = match item.item_type.as_str() {
            "Movie" => match parse_id(&item.provider_ids.tmdb) {
                Some(id) => (MediaType::Movie, ExternalIds::tmdb(id)),
                None => return Vec::new(),
            },
            "Series" => match parse_id(&item.provider_ids.tvdb) {
                Some(id) => (MediaType::Tv, ExternalIds::tvdb(id)),
                None => return Vec::new(),
            },
            "MusicAlbum" => match item.provider_ids.music_brainz_release_group.clone() {
                Some(id) if !id.is_empty() => (MediaType::Music, ExternalIds::musicbrainz(id)),
                _ => return Vec::new(),
            },
            _ => return Vec::new(),
        };

        // Series carry no media sources; episode detail decides their tracks
        let tracks = if media_type == MediaType::Movie {
            let (standard, uhd) = item.resolutions();
            [(false, standard), (true, uhd)]
                .into_iter()
                .filter(|(_, present)| *present)
                .map(|(is_4k, _)| is_4k)
                .collect()
        } else {
            vec![false]
        };

        tracks
            .into_iter()
            .map(|is_4k| InventoryItem {
                external_item_id: 0,
                library_item_id: Some(item.id.clone()),
                media_type,
                ids: ids.clone(),
                title: item.name.clone(),
                monitored: false,
                grabbed: false,
                file_count: 1,
                is_4k,
                seasons: Vec::new(),
            })
            .collect()
    }
}

#[async_trait]
impl InventorySource for JellyfinClient {
    fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    async fn fetch_inventory(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        let path = format!("/Users/{}/Items", urlencoding::encode(&self.user_id));
        let response: ItemsResponse = self
            .http
            .get_json(
                "library",
                &path,
                &[
                    ("Recursive", "true".to_string()),
                    ("IncludeItemTypes", "Movie,Series,MusicAlbum".to_string()),
                    ("Fields", "ProviderIds,MediaSources".to_string()),
                ],
            )
            .await?;

        let total = response.items.len();
        let items: Vec<InventoryItem> = response
            .items
            .into_iter()
            .flat_map(|i| self.to_items(i))
            .collect();
        debug!(total, mapped = items.len(), "Jellyfin library listed");
        Ok(items)
    }

    async fn fetch_episodes(
        &self,
        item: &InventoryItem,
    ) -> Result<Vec<EpisodeInventory>, ServiceError> {
        let Some(series_id) = item.library_item_id.as_deref() else {
            return Ok(Vec::new());
        };

        let path = format!("/Shows/{}/Episodes", urlencoding::encode(series_id));
        let response: ItemsResponse = self
            .http
            .get_json(
                "episodes",
                &path,
                &[
                    ("userId", self.user_id.clone()),
                    ("Fields", "MediaSources".to_string()),
                ],
            )
            .await?;

        Ok(to_episodes(response.items, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> JellyfinClient {
        JellyfinClient::new(&JellyfinConfig {
            url: "http://localhost:8096".to_string(),
            api_key: "key".to_string(),
            user_id: "user-1".to_string(),
            sync_enabled: true,
            timeout_secs: 30,
        })
        .unwrap()
    }

    #[test]
    fn test_movie_with_both_resolutions_yields_two_items() {
        let json = r#"{"Items": [{
            "Id": "abc",
            "Name": "The Matrix",
            "Type": "Movie",
            "ProviderIds": {"Tmdb": "603"},
            "MediaSources": [
                {"MediaStreams": [{"Type": "Video", "Width": 3840}, {"Type": "Audio"}]},
                {"MediaStreams": [{"Type": "Video", "Width": 1920}]}
            ]
        }]}"#;
        let response: ItemsResponse = serde_json::from_str(json).unwrap();
        let items: Vec<InventoryItem> = response
            .items
            .into_iter()
            .flat_map(|i| client().to_items(i))
            .collect();

        assert_eq!(items.len(), 2);
        assert!(!items[0].is_4k);
        assert!(items[1].is_4k);
        assert_eq!(items[0].ids.tmdb_id, Some(603));
        assert_eq!(items[0].library_item_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_items_without_provider_ids_are_dropped() {
        let json = r#"{"Items": [
            {"Id": "1", "Name": "Home Video", "Type": "Movie"},
            {"Id": "2", "Name": "Album", "Type": "MusicAlbum", "ProviderIds": {"MusicBrainzReleaseGroup": "f5093c06"}},
            {"Id": "3", "Name": "Show", "Type": "Series", "ProviderIds": {"Tvdb": "81189"}}
        ]}"#;
        let response: ItemsResponse = serde_json::from_str(json).unwrap();
        let client = client();
        let items: Vec<InventoryItem> = response
            .items
            .into_iter()
            .flat_map(|i| client.to_items(i))
            .collect();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].media_type, MediaType::Music);
        assert_eq!(items[1].media_type, MediaType::Tv);
        assert!(!items[1].is_4k);
    }

    #[test]
    fn test_episode_listing_keeps_aired_missing_episodes() {
        let json = r#"{"Items": [
            {"Id": "e1", "Type": "Episode", "ParentIndexNumber": 1, "IndexNumber": 1,
             "MediaSources": [{"MediaStreams": [{"Type": "Video", "Width": 1920}]}]},
            {"Id": "e2", "Type": "Episode", "ParentIndexNumber": 1, "IndexNumber": 2,
             "LocationType": "Virtual", "PremiereDate": "2008-01-27T00:00:00.0000000Z"},
            {"Id": "e3", "Type": "Episode", "ParentIndexNumber": 1, "IndexNumber": 3,
             "LocationType": "Virtual", "PremiereDate": "2099-01-01T00:00:00.0000000Z"},
            {"Id": "e4", "Type": "Episode", "ParentIndexNumber": 1, "IndexNumber": 4,
             "LocationType": "Virtual"},
            {"Id": "s1", "Type": "Episode", "ParentIndexNumber": 0, "IndexNumber": 1,
             "MediaSources": [{"MediaStreams": [{"Type": "Video", "Width": 1920}]}]}
        ]}"#;
        let response: ItemsResponse = serde_json::from_str(json).unwrap();
        let now = DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let episodes = to_episodes(response.items, now);

        assert_eq!(
            episodes,
            vec![
                EpisodeInventory {
                    season_number: 1,
                    episode_number: 1,
                    has_file: true,
                    is_4k: false,
                },
                EpisodeInventory {
                    season_number: 1,
                    episode_number: 2,
                    has_file: false,
                    is_4k: false,
                },
            ]
        );
    }

    #[test]
    fn test_missing_user_id_rejected() {
        let result = JellyfinClient::new(&JellyfinConfig {
            url: "http://localhost:8096".to_string(),
            api_key: "key".to_string(),
            user_id: String::new(),
            sync_enabled: true,
            timeout_secs: 30,
        });
        assert!(matches!(result, Err(ServiceError::NotConfigured(_))));
    }
}
