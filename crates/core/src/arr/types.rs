//! Inventory and lookup types shared by all service clients.

use serde::{Deserialize, Serialize};

use crate::config::{ServiceInstance, ServiceType};
use crate::media::{ExternalIds, MediaType};

/// The service instance a source reads from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceInstance {
    /// Configured instance ID (0 for the media server).
    pub id: i64,
    pub name: String,
    /// Service name, e.g. "radarr" or "jellyfin".
    pub service: String,
    /// Instance serves the alternate (4K) track.
    pub is_4k: bool,
}

impl SourceInstance {
    pub fn from_service(service_type: ServiceType, instance: &ServiceInstance) -> Self {
        Self {
            id: instance.id,
            name: instance.name.clone(),
            service: service_type.as_str().to_string(),
            is_4k: instance.is_4k,
        }
    }

    pub fn jellyfin() -> Self {
        Self {
            id: 0,
            name: "Jellyfin".to_string(),
            service: "jellyfin".to_string(),
            is_4k: false,
        }
    }
}

/// One item listed by an external service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    /// Item ID inside the instance (0 for media server items).
    pub external_item_id: i64,
    /// Media server item ID, used to fetch episode detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_item_id: Option<String>,
    pub media_type: MediaType,
    pub ids: ExternalIds,
    pub title: String,
    pub monitored: bool,
    /// A download for the item is queued or running.
    #[serde(default)]
    pub grabbed: bool,
    /// Number of files on disk (episode files for series).
    pub file_count: u32,
    /// Item belongs on the alternate (4K) track.
    pub is_4k: bool,
    #[serde(default)]
    pub seasons: Vec<SeasonInventory>,
}

impl InventoryItem {
    pub fn has_file(&self) -> bool {
        self.file_count > 0
    }
}

/// Per-season counts reported with a series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonInventory {
    pub season_number: u32,
    pub monitored: bool,
    /// Episodes that have aired.
    pub aired_episodes: u32,
    pub episode_file_count: u32,
}

/// Per-episode detail fetched separately from the series listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeInventory {
    pub season_number: u32,
    pub episode_number: u32,
    pub has_file: bool,
    /// Episode belongs on the alternate (4K) track.
    pub is_4k: bool,
}

/// A movie found in one instance by TMDB ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieHit {
    pub external_item_id: i64,
    pub has_file: bool,
}

/// A series found in one instance by TVDB ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesHit {
    pub external_item_id: i64,
    /// Total episode files across all seasons.
    pub file_count: u32,
    pub seasons: Vec<SeasonInventory>,
}
