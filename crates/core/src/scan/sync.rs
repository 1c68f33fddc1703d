//! Mapping inventory items onto stored media.

use std::sync::Arc;

use tracing::debug;

use super::types::{ItemResult, ScanError};
use crate::arr::{EpisodeInventory, InventoryItem, SeasonInventory, SourceInstance};
use crate::media::{MediaSnapshot, MediaStatus, NewMedia, Season, Track};
use crate::reconcile::{ApplyOutcome, ReconciliationEngine, TransitionGuard};

/// Loads and applies media snapshots on behalf of scanners.
#[derive(Clone)]
pub struct MediaSyncer {
    engine: Arc<ReconciliationEngine>,
}

impl MediaSyncer {
    pub fn new(engine: Arc<ReconciliationEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<ReconciliationEngine> {
        &self.engine
    }

    /// Stored snapshot for an item, creating the media on first sighting.
    ///
    /// Returns `None` for items without the identity their media type needs
    /// and for blocklisted media.
    pub fn load(&self, item: &InventoryItem) -> Result<Option<MediaSnapshot>, ScanError> {
        if item.ids.primary_key(item.media_type).is_none() {
            debug!(item = %item.title, "Item has no usable external ID, skipping");
            return Ok(None);
        }

        let store = self.engine.store();
        let media = match store.find_media(item.media_type, &item.ids)? {
            Some(media) => media,
            None => store.create_media(
                NewMedia::new(item.media_type, item.ids.clone()).with_title(item.title.clone()),
            )?,
        };

        if media.is_blocklisted() {
            debug!(media_id = media.id, item = %item.title, "Media is blocklisted, skipping");
            return Ok(None);
        }

        let Some(mut snapshot) = store.get_snapshot(media.id)? else {
            return Ok(None);
        };
        snapshot.media.ids.merge_missing(&item.ids);
        if snapshot.media.title.is_none() {
            snapshot.media.title = Some(item.title.clone());
        }
        Ok(Some(snapshot))
    }

    pub async fn apply(
        &self,
        snapshot: MediaSnapshot,
        guard: &dyn TransitionGuard,
    ) -> Result<ItemResult, ScanError> {
        let result = match self.engine.apply(snapshot, guard).await? {
            ApplyOutcome::Skipped => ItemResult::Skipped,
            ApplyOutcome::Applied(report) if report.changed => ItemResult::Applied,
            ApplyOutcome::Applied(_) => ItemResult::Unchanged,
        };
        Ok(result)
    }

    /// Apply a Radarr or Readarr item.
    pub async fn sync_download_item(
        &self,
        source: &SourceInstance,
        item: &InventoryItem,
        guard: &dyn TransitionGuard,
    ) -> Result<ItemResult, ScanError> {
        let Some(mut snapshot) = self.load(item)? else {
            return Ok(ItemResult::Skipped);
        };

        let track = Track::from_is_alt(source.is_4k);
        let next = download_status(snapshot.media.status(track), item);
        snapshot.media.set_status(track, next);
        snapshot
            .media
            .set_service_link(track, source.id, item.external_item_id);

        self.apply(snapshot, guard).await
    }
}

/// Status of a movie or book on the instance's track.
///
/// A file means AVAILABLE; monitored or grabbed without a file means
/// PROCESSING unless already AVAILABLE; otherwise unchanged.
pub fn download_status(current: MediaStatus, item: &InventoryItem) -> MediaStatus {
    if item.has_file() {
        MediaStatus::Available
    } else if (item.monitored || item.grabbed) && current != MediaStatus::Available {
        MediaStatus::Processing
    } else {
        current
    }
}

/// Status of a season from download-service counts.
pub fn season_status(current: MediaStatus, season: &SeasonInventory, files: u32) -> MediaStatus {
    if season.aired_episodes > 0 && files >= season.aired_episodes {
        MediaStatus::Available
    } else if files > 0 {
        MediaStatus::PartiallyAvailable
    } else if season.monitored {
        MediaStatus::Processing
    } else {
        current
    }
}

/// Whether `next` claims less availability than `current`.
pub fn lowers_availability(current: MediaStatus, next: MediaStatus) -> bool {
    match (current.availability_rank(), next.availability_rank()) {
        (Some(current), Some(next)) => next < current,
        _ => false,
    }
}

/// Status of a season from the episodes known to be in the library.
///
/// The season is AVAILABLE once the library holds as many episodes as the
/// season is known to have, PARTIALLY_AVAILABLE when it holds some, and
/// unchanged when it holds none.
pub fn library_season_status(season: &Season, track: Track) -> MediaStatus {
    let available = season
        .episodes
        .iter()
        .filter(|e| e.status(track) == MediaStatus::Available)
        .count();
    let expected = (season.episode_count as usize).max(season.episodes.len());

    if available == 0 {
        season.status(track)
    } else if available >= expected {
        MediaStatus::Available
    } else {
        MediaStatus::PartiallyAvailable
    }
}

/// Mark episodes with files as available on a track.
pub fn mark_episodes(
    snapshot: &mut MediaSnapshot,
    episodes: &[EpisodeInventory],
    track_of: impl Fn(&EpisodeInventory) -> Track,
) {
    for episode in episodes.iter().filter(|e| e.has_file && e.season_number > 0) {
        snapshot
            .season_mut(episode.season_number)
            .episode_mut(episode.episode_number)
            .set_status(track_of(episode), MediaStatus::Available);
    }
}

/// Derive a TV media track from its seasons.
///
/// An UNKNOWN aggregate leaves the media status alone so that a requested
/// title stays PENDING until some season moves.
pub fn aggregate_media_status(snapshot: &mut MediaSnapshot, track: Track) {
    if let Some(aggregate) = snapshot.aggregate_season_status(track) {
        if aggregate != MediaStatus::Unknown {
            snapshot.media.set_status(track, aggregate);
        }
    }
}
