//! Sonarr scanner.

use std::sync::Arc;

use async_trait::async_trait;

use super::session::Scanner;
use super::sync::{
    aggregate_media_status, lowers_availability, mark_episodes, season_status, MediaSyncer,
};
use super::types::{ItemResult, ScanError};
use crate::arr::{InventoryItem, InventorySource};
use crate::media::Track;
use crate::reconcile::TransitionGuard;

/// Reconciles series, seasons and episodes listed by every Sonarr instance.
///
/// Each series costs one extra call for its episode list. An instance only
/// lowers a season on its track when it is the instance linked to that
/// track, so a second instance with fewer files cannot undo the first.
pub struct SonarrScanner {
    syncer: MediaSyncer,
    sources: Vec<Arc<dyn InventorySource>>,
}

impl SonarrScanner {
    pub fn new(syncer: MediaSyncer, sources: Vec<Arc<dyn InventorySource>>) -> Self {
        Self { syncer, sources }
    }
}

#[async_trait]
impl Scanner for SonarrScanner {
    fn name(&self) -> &'static str {
        "sonarr"
    }

    fn sources(&self) -> Vec<Arc<dyn InventorySource>> {
        self.sources.clone()
    }

    async fn process_item(
        &self,
        source: &dyn InventorySource,
        item: &InventoryItem,
        guard: &dyn TransitionGuard,
    ) -> Result<ItemResult, ScanError> {
        let Some(mut snapshot) = self.syncer.load(item)? else {
            return Ok(ItemResult::Skipped);
        };

        let episodes = source
            .fetch_episodes(item)
            .await
            .map_err(|e| ScanError::item(&item.title, e))?;

        let instance = source.instance();
        let track = Track::from_is_alt(instance.is_4k);

        // Another instance on the same track may hold more of the series
        let foreign = snapshot
            .media
            .linked_service(track)
            .is_some_and(|id| id != instance.id);
        let mut held_back = false;

        for season in item.seasons.iter().filter(|s| s.season_number > 0) {
            // Season statistics stand in when the episode list is empty
            let files = if episodes.is_empty() {
                season.episode_file_count
            } else {
                episodes
                    .iter()
                    .filter(|e| e.season_number == season.season_number && e.has_file)
                    .count() as u32
            };

            let stored = snapshot.season_mut(season.season_number);
            stored.observe_episode_count(season.aired_episodes);
            let current = stored.status(track);
            let next = season_status(current, season, files);
            if foreign && lowers_availability(current, next) {
                held_back = true;
                continue;
            }
            stored.set_status(track, next);
        }

        mark_episodes(&mut snapshot, &episodes, |_| track);
        aggregate_media_status(&mut snapshot, track);
        if !held_back {
            snapshot
                .media
                .set_service_link(track, instance.id, item.external_item_id);
        }

        self.syncer.apply(snapshot, guard).await
    }
}
