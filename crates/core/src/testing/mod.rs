//! Testing utilities and mock implementations.
//!
//! Mocks stand in for external service instances and notification agents so
//! scans, availability checks and reconciliation can be exercised without
//! real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use requestarr_core::testing::{fixtures, MockInventorySource, RecordingAgent};
//!
//! let radarr = MockInventorySource::new(fixtures::source(1, "radarr", false));
//! radarr.add_item(fixtures::movie_item(10, 603, 1)).await;
//!
//! let agent = RecordingAgent::new();
//! // Wire into a ScanSession and a notification dispatcher...
//! ```

mod mock_inventory;
mod mock_lookup;
mod recording_agent;

pub use mock_inventory::MockInventorySource;
pub use mock_lookup::{MockMovieLookup, MockSeriesLookup};
pub use recording_agent::RecordingAgent;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::arr::{EpisodeInventory, InventoryItem, SeasonInventory, SourceInstance};
    use crate::config::ServiceInstance;
    use crate::media::{ExternalIds, MediaType};

    /// A configured instance with profile 1, a root folder derived from the
    /// name and "released" minimum availability.
    pub fn instance(id: i64, name: &str, is_default: bool, is_4k: bool) -> ServiceInstance {
        ServiceInstance {
            id,
            name: name.to_string(),
            url: format!("http://localhost:{}", 7000 + id),
            api_key: format!("key-{}", id),
            is_default,
            is_4k,
            sync_enabled: true,
            active_profile_id: Some(1),
            active_directory: Some(format!("/media/{}", name.to_lowercase().replace(' ', "-"))),
            tags: Vec::new(),
            minimum_availability: Some("released".to_string()),
            series_type: None,
            active_anime_profile_id: None,
            active_anime_directory: None,
            anime_tags: Vec::new(),
            timeout_secs: 30,
        }
    }

    pub fn source(id: i64, service: &str, is_4k: bool) -> SourceInstance {
        let suffix = if is_4k { " 4K" } else { "" };
        SourceInstance {
            id,
            name: format!("{} {}{}", service, id, suffix),
            service: service.to_string(),
            is_4k,
        }
    }

    /// A movie titled "Movie {tmdb_id}", unmonitored and not grabbed.
    pub fn movie_item(external_item_id: i64, tmdb_id: u32, file_count: u32) -> InventoryItem {
        InventoryItem {
            external_item_id,
            library_item_id: None,
            media_type: MediaType::Movie,
            ids: ExternalIds::tmdb(tmdb_id),
            title: format!("Movie {}", tmdb_id),
            monitored: false,
            grabbed: false,
            file_count,
            is_4k: false,
            seasons: Vec::new(),
        }
    }

    /// A book titled "Book {hardcover_id}".
    pub fn book_item(external_item_id: i64, hardcover_id: u32, file_count: u32) -> InventoryItem {
        InventoryItem {
            media_type: MediaType::Book,
            ids: ExternalIds::hardcover(hardcover_id),
            title: format!("Book {}", hardcover_id),
            ..movie_item(external_item_id, 0, file_count)
        }
    }

    /// A monitored series titled "Series {tvdb_id}".
    pub fn series_item(
        external_item_id: i64,
        tvdb_id: u32,
        seasons: Vec<SeasonInventory>,
    ) -> InventoryItem {
        InventoryItem {
            external_item_id,
            library_item_id: None,
            media_type: MediaType::Tv,
            ids: ExternalIds::tvdb(tvdb_id),
            title: format!("Series {}", tvdb_id),
            monitored: true,
            grabbed: false,
            file_count: seasons.iter().map(|s| s.episode_file_count).sum(),
            is_4k: false,
            seasons,
        }
    }

    /// A monitored season.
    pub fn season(season_number: u32, aired_episodes: u32, episode_file_count: u32) -> SeasonInventory {
        SeasonInventory {
            season_number,
            monitored: true,
            aired_episodes,
            episode_file_count,
        }
    }

    pub fn episode(season_number: u32, episode_number: u32, has_file: bool) -> EpisodeInventory {
        EpisodeInventory {
            season_number,
            episode_number,
            has_file,
            is_4k: false,
        }
    }
}
