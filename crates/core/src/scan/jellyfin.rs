//! Jellyfin scanner.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;

use super::session::Scanner;
use super::sync::{
    aggregate_media_status, library_season_status, lowers_availability, mark_episodes,
    MediaSyncer,
};
use super::types::{ItemResult, ScanError};
use crate::arr::{EpisodeInventory, InventoryItem, InventorySource};
use crate::media::{MediaSnapshot, MediaStatus, MediaType, Track};
use crate::reconcile::TransitionGuard;

/// Marks library content as available.
///
/// A season counts as available once the library holds as many episodes as
/// the season is known to have. That length comes from the largest of the
/// download service's aired count, the season listing and the episodes the
/// media server lists, missing ones included. Library scans only raise
/// season statuses.
pub struct JellyfinScanner {
    syncer: MediaSyncer,
    source: Option<Arc<dyn InventorySource>>,
}

impl JellyfinScanner {
    pub fn new(syncer: MediaSyncer, source: Option<Arc<dyn InventorySource>>) -> Self {
        Self { syncer, source }
    }
}

#[async_trait]
impl Scanner for JellyfinScanner {
    fn name(&self) -> &'static str {
        "jellyfin"
    }

    fn sources(&self) -> Vec<Arc<dyn InventorySource>> {
        self.source.iter().cloned().collect()
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

        match item.media_type {
            MediaType::Tv => {
                let episodes = source
                    .fetch_episodes(item)
                    .await
                    .map_err(|e| ScanError::item(&item.title, e))?;
                observe_season_lengths(&mut snapshot, item, &episodes);
                mark_episodes(&mut snapshot, &episodes, |e| Track::from_is_alt(e.is_4k));

                for track in Track::ALL {
                    for season in snapshot.seasons.iter_mut() {
                        let current = season.status(track);
                        let next = library_season_status(season, track);
                        if !lowers_availability(current, next) {
                            season.set_status(track, next);
                        }
                    }
                    aggregate_media_status(&mut snapshot, track);
                }
            }
            _ => {
                snapshot
                    .media
                    .set_status(Track::from_is_alt(item.is_4k), MediaStatus::Available);
            }
        }

        self.syncer.apply(snapshot, guard).await
    }
}

fn observe_season_lengths(
    snapshot: &mut MediaSnapshot,
    item: &InventoryItem,
    episodes: &[EpisodeInventory],
) {
    for season in item.seasons.iter().filter(|s| s.season_number > 0) {
        snapshot
            .season_mut(season.season_number)
            .observe_episode_count(season.aired_episodes);
    }

    let mut listed: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
    for episode in episodes.iter().filter(|e| e.season_number > 0) {
        listed
            .entry(episode.season_number)
            .or_default()
            .insert(episode.episode_number);
    }
    for (season_number, numbers) in listed {
        snapshot
            .season_mut(season_number)
            .observe_episode_count(numbers.len() as u32);
    }
}
