//! Scan sessions.
//!
//! A [`ScanSession`] walks every instance of one service in bounded batches
//! and applies each item through the reconciliation engine. The per-service
//! mapping lives in a [`Scanner`]:
//!
//! - [`RadarrScanner`]: movies by TMDB ID
//! - [`SonarrScanner`]: series, seasons and episodes by TVDB ID
//! - [`ReadarrScanner`]: books by Hardcover ID
//! - [`JellyfinScanner`]: library content on the standard or 4K track

mod jellyfin;
mod radarr;
mod readarr;
mod session;
mod sonarr;
mod sync;
mod types;

pub use jellyfin::JellyfinScanner;
pub use radarr::RadarrScanner;
pub use readarr::ReadarrScanner;
pub use session::{ScanController, ScanSession, Scanner, SessionGuard};
pub use sonarr::SonarrScanner;
pub use sync::{
    aggregate_media_status, download_status, library_season_status, lowers_availability,
    season_status, MediaSyncer,
};
pub use types::*;

use std::sync::Arc;

use crate::arr::{InventorySource, ServiceClients};
use crate::config::{Config, ServiceType};
use crate::notification::NotificationHandle;
use crate::reconcile::ReconciliationEngine;

/// One scan controller per service, wired to the configured instances.
pub fn scan_controllers(
    config: &Config,
    clients: &ServiceClients,
    engine: Arc<ReconciliationEngine>,
    notifier: Option<NotificationHandle>,
) -> Vec<Arc<dyn ScanController>> {
    let syncer = MediaSyncer::new(engine);
    let sync = config.sync.clone();

    let jellyfin = clients
        .jellyfin
        .as_ref()
        .filter(|_| config.jellyfin.as_ref().is_some_and(|j| j.sync_enabled))
        .map(|c| c.clone() as Arc<dyn InventorySource>);

    vec![
        Arc::new(ScanSession::new(
            RadarrScanner::new(syncer.clone(), clients.sources(config, ServiceType::Radarr)),
            sync.clone(),
            notifier.clone(),
        )) as Arc<dyn ScanController>,
        Arc::new(ScanSession::new(
            SonarrScanner::new(syncer.clone(), clients.sources(config, ServiceType::Sonarr)),
            sync.clone(),
            notifier.clone(),
        )),
        Arc::new(ScanSession::new(
            ReadarrScanner::new(syncer.clone(), clients.sources(config, ServiceType::Readarr)),
            sync.clone(),
            notifier.clone(),
        )),
        Arc::new(ScanSession::new(
            JellyfinScanner::new(syncer, jellyfin),
            sync,
            notifier,
        )),
    ]
}
