//! Clients for download-automation services and the media server.
//!
//! Each configured instance is exposed as an [`InventorySource`] for scanning.
//! Radarr and Sonarr instances additionally answer per-title lookups
//! ([`MovieLookup`], [`SeriesLookup`]) used by the availability aggregator.
//! Clients read only the fields the engine needs.

mod client;
mod jellyfin;
mod radarr;
mod readarr;
mod sonarr;
mod types;

pub use jellyfin::JellyfinClient;
pub use radarr::RadarrClient;
pub use readarr::ReadarrClient;
pub use sonarr::SonarrClient;
pub use types::*;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, ServiceType};

/// Errors that can occur when talking to an external service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Listing access to one service instance.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// The instance this source reads.
    fn instance(&self) -> &SourceInstance;

    /// List every item the instance manages.
    async fn fetch_inventory(&self) -> Result<Vec<InventoryItem>, ServiceError>;

    /// Per-episode detail for a series item.
    ///
    /// Sources without episode detail return an empty list.
    async fn fetch_episodes(
        &self,
        _item: &InventoryItem,
    ) -> Result<Vec<EpisodeInventory>, ServiceError> {
        Ok(Vec::new())
    }
}

/// Movie lookup by TMDB ID on one instance.
#[async_trait]
pub trait MovieLookup: Send + Sync {
    fn instance(&self) -> &SourceInstance;

    async fn movie_by_tmdb(&self, tmdb_id: u32) -> Result<Option<MovieHit>, ServiceError>;
}

/// Series lookup by TVDB ID on one instance.
#[async_trait]
pub trait SeriesLookup: Send + Sync {
    fn instance(&self) -> &SourceInstance;

    async fn series_by_tvdb(&self, tvdb_id: u32) -> Result<Option<SeriesHit>, ServiceError>;
}

/// Clients for every configured instance.
#[derive(Default, Clone)]
pub struct ServiceClients {
    pub radarr: Vec<Arc<RadarrClient>>,
    pub sonarr: Vec<Arc<SonarrClient>>,
    pub readarr: Vec<Arc<ReadarrClient>>,
    pub jellyfin: Option<Arc<JellyfinClient>>,
}

impl ServiceClients {
    /// Build clients for all instances in the configuration.
    ///
    /// Instances with `sync_enabled = false` still get a client so that
    /// availability lookups can reach them; scanners filter them out.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let radarr = config
            .radarr
            .iter()
            .map(|i| RadarrClient::new(i).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        let sonarr = config
            .sonarr
            .iter()
            .map(|i| SonarrClient::new(i).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        let readarr = config
            .readarr
            .iter()
            .map(|i| ReadarrClient::new(i).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        let jellyfin = config
            .jellyfin
            .as_ref()
            .map(|j| JellyfinClient::new(j).map(Arc::new))
            .transpose()?;

        Ok(Self {
            radarr,
            sonarr,
            readarr,
            jellyfin,
        })
    }

    /// Sources to scan for a service type, skipping instances with sync disabled.
    pub fn sources(
        &self,
        config: &Config,
        service_type: ServiceType,
    ) -> Vec<Arc<dyn InventorySource>> {
        let settings = config.service_settings();
        let enabled = |id: i64| {
            settings
                .instance(service_type, id)
                .map(|i| i.sync_enabled)
                .unwrap_or(false)
        };

        match service_type {
            ServiceType::Radarr => self
                .radarr
                .iter()
                .filter(|c| enabled(c.instance().id))
                .map(|c| c.clone() as Arc<dyn InventorySource>)
                .collect(),
            ServiceType::Sonarr => self
                .sonarr
                .iter()
                .filter(|c| enabled(c.instance().id))
                .map(|c| c.clone() as Arc<dyn InventorySource>)
                .collect(),
            ServiceType::Readarr => self
                .readarr
                .iter()
                .filter(|c| enabled(c.instance().id))
                .map(|c| c.clone() as Arc<dyn InventorySource>)
                .collect(),
        }
    }

    pub fn movie_lookups(&self) -> Vec<Arc<dyn MovieLookup>> {
        self.radarr
            .iter()
            .map(|c| c.clone() as Arc<dyn MovieLookup>)
            .collect()
    }

    pub fn series_lookups(&self) -> Vec<Arc<dyn SeriesLookup>> {
        self.sonarr
            .iter()
            .map(|c| c.clone() as Arc<dyn SeriesLookup>)
            .collect()
    }
}
