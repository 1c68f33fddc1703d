//! The reconciliation engine.

use std::sync::Arc;

use tracing::{debug, info};

use super::{ApplyOutcome, ApplyReport, ReconcileError, TransitionGuard};
use crate::media::{
    ExternalIds, Media, MediaRequest, MediaSnapshot, MediaStatus, MediaStore, MediaType,
    NewMedia, RequestFilter, RequestStatus, Track,
};
use crate::metrics;
use crate::notification::{NotificationEvent, NotificationHandle};

/// Owns the media/season/episode status lifecycle and cascades status
/// changes into requests.
pub struct ReconciliationEngine {
    store: Arc<dyn MediaStore>,
    notifier: Option<NotificationHandle>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn MediaStore>) -> Self {
        Self {
            store,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: NotificationHandle) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn store(&self) -> &Arc<dyn MediaStore> {
        &self.store
    }

    /// Reconcile `next` against the stored state of the same media.
    ///
    /// Nothing is written when the guard reports the caller is stale, or when
    /// `next` matches what is already stored.
    pub async fn apply(
        &self,
        mut next: MediaSnapshot,
        guard: &dyn TransitionGuard,
    ) -> Result<ApplyOutcome, ReconcileError> {
        if !guard.is_current() {
            debug!(media_id = next.media.id, "Stale caller, skipping apply");
            return Ok(ApplyOutcome::Skipped);
        }

        let media_id = next.media.id;
        let prev = self
            .store
            .get_snapshot(media_id)?
            .ok_or(ReconcileError::MediaNotFound(media_id))?;

        for track in Track::ALL {
            if prev.media.status(track) == MediaStatus::Blocklisted
                && next.media.status(track) != MediaStatus::Blocklisted
            {
                return Err(ReconcileError::Blocklisted { media_id });
            }
        }

        if next.media.media_type == MediaType::Tv {
            clamp_to_seasons(&mut next);
        }

        if !snapshot_differs(&prev, &next) {
            return Ok(ApplyOutcome::Applied(ApplyReport {
                snapshot: prev,
                changed: false,
                auto_approved: Vec::new(),
                completed: Vec::new(),
                completed_seasons: Vec::new(),
            }));
        }

        let mut approvals = Vec::new();
        for track in Track::ALL {
            if prev.media.status(track) == MediaStatus::Pending
                && next.media.status(track) == MediaStatus::Available
            {
                approvals.extend(self.store.list_requests(
                    &RequestFilter::new()
                        .with_media_id(media_id)
                        .with_is_alt(track.is_alt())
                        .with_status(RequestStatus::Pending),
                )?);
            }
        }

        let approve: Vec<i64> = approvals.iter().map(|r| r.id).collect();
        let saved = self.store.save_snapshot_approving(&next, &approve)?;
        let auto_approved = self.announce_approved(media_id, &approvals).await;

        let mut completed = Vec::new();
        let mut completed_seasons = Vec::new();
        for track in Track::ALL {
            let before = prev.media.status(track);
            let after = saved.media.status(track);

            if before != after {
                metrics::RECONCILE_TRANSITIONS
                    .with_label_values(&["media", after.as_str()])
                    .inc();
                info!(
                    media_id,
                    track = track.as_str(),
                    from = before.as_str(),
                    to = after.as_str(),
                    "Media status changed"
                );
            }

            let status_trigger = before != after
                && matches!(
                    after,
                    MediaStatus::PartiallyAvailable | MediaStatus::Available | MediaStatus::Deleted
                );
            let season_trigger = saved.media.media_type == MediaType::Tv
                && seasons_changed(&prev, &saved, track);

            if status_trigger || season_trigger {
                self.complete_requests(
                    &prev,
                    &saved,
                    track,
                    &mut completed,
                    &mut completed_seasons,
                )
                .await?;
            }

            if before != after && after == MediaStatus::Available {
                self.notify(NotificationEvent::MediaAvailable {
                    media_id,
                    media_type: saved.media.media_type,
                    title: saved.media.title.clone(),
                    is_alt: track.is_alt(),
                })
                .await;
            }
        }

        Ok(ApplyOutcome::Applied(ApplyReport {
            snapshot: saved,
            changed: true,
            auto_approved,
            completed,
            completed_seasons,
        }))
    }

    /// Blocklist a title on both tracks, creating the media record if needed.
    pub async fn blocklist(
        &self,
        media_type: MediaType,
        ids: &ExternalIds,
    ) -> Result<Media, ReconcileError> {
        let media = match self.store.find_media(media_type, ids)? {
            Some(media) => media,
            None => self.store.create_media(NewMedia::new(media_type, ids.clone()))?,
        };

        let mut snapshot = self
            .store
            .get_snapshot(media.id)?
            .ok_or(ReconcileError::MediaNotFound(media.id))?;
        snapshot.media.status = MediaStatus::Blocklisted;
        snapshot.media.status_alt = MediaStatus::Blocklisted;
        let saved = self.store.save_snapshot(&snapshot)?;

        metrics::RECONCILE_TRANSITIONS
            .with_label_values(&["media", MediaStatus::Blocklisted.as_str()])
            .inc();
        info!(media_id = media.id, "Media blocklisted");
        Ok(saved.media)
    }

    /// Lift a blocklist, returning both tracks to UNKNOWN.
    pub async fn unblocklist(&self, media_id: i64) -> Result<Media, ReconcileError> {
        let mut snapshot = self
            .store
            .get_snapshot(media_id)?
            .ok_or(ReconcileError::MediaNotFound(media_id))?;
        if !snapshot.media.is_blocklisted() {
            return Err(ReconcileError::NotBlocklisted(media_id));
        }

        for track in Track::ALL {
            if snapshot.media.status(track) == MediaStatus::Blocklisted {
                snapshot.media.set_status(track, MediaStatus::Unknown);
            }
        }
        let saved = self.store.save_snapshot(&snapshot)?;
        info!(media_id, "Media removed from blocklist");
        Ok(saved.media)
    }

    /// Hard-delete a blocklisted media record with its children and requests.
    pub async fn remove_blocklisted(&self, media_id: i64) -> Result<(), ReconcileError> {
        let media = self
            .store
            .get_media(media_id)?
            .ok_or(ReconcileError::MediaNotFound(media_id))?;
        if !media.is_blocklisted() {
            return Err(ReconcileError::NotBlocklisted(media_id));
        }
        self.store.delete_media(media_id)?;
        info!(media_id, "Blocklisted media deleted");
        Ok(())
    }

    async fn announce_approved(&self, media_id: i64, approved: &[MediaRequest]) -> Vec<i64> {
        for request in approved {
            metrics::RECONCILE_TRANSITIONS
                .with_label_values(&["request", RequestStatus::Approved.as_str()])
                .inc();
            info!(
                media_id,
                request_id = request.id,
                "Request auto-approved, media already available"
            );
            self.notify(NotificationEvent::RequestAutoApproved {
                request_id: request.id,
                media_id,
                requested_by: request.requested_by,
                is_alt: request.is_alt,
            })
            .await;
        }
        approved.iter().map(|r| r.id).collect()
    }

    async fn complete_requests(
        &self,
        prev: &MediaSnapshot,
        saved: &MediaSnapshot,
        track: Track,
        completed: &mut Vec<i64>,
        completed_seasons: &mut Vec<i64>,
    ) -> Result<(), ReconcileError> {
        let approved = self.store.list_requests(
            &RequestFilter::new()
                .with_media_id(saved.media.id)
                .with_is_alt(track.is_alt())
                .with_status(RequestStatus::Approved),
        )?;

        for request in approved {
            let is_season_request =
                saved.media.media_type == MediaType::Tv && !request.seasons.is_empty();

            let done = if is_season_request {
                let mut all_completed = true;
                for season_request in &request.seasons {
                    if season_request.status == RequestStatus::Completed {
                        continue;
                    }

                    let now = saved
                        .season(season_request.season_number)
                        .map(|s| s.status(track))
                        .unwrap_or_default();
                    let before = prev
                        .season(season_request.season_number)
                        .map(|s| s.status(track))
                        .unwrap_or_default();

                    if now.is_terminal_for_requests() && now != before {
                        self.store.update_season_request_status(
                            season_request.id,
                            RequestStatus::Completed,
                        )?;
                        metrics::RECONCILE_TRANSITIONS
                            .with_label_values(&["season_request", RequestStatus::Completed.as_str()])
                            .inc();
                        debug!(
                            request_id = request.id,
                            season = season_request.season_number,
                            "Season request completed"
                        );
                        completed_seasons.push(season_request.id);
                    } else {
                        all_completed = false;
                    }
                }
                all_completed
            } else {
                saved.media.status(track).is_terminal_for_requests()
            };

            if done {
                self.store
                    .update_request_status(request.id, RequestStatus::Completed)?;
                metrics::RECONCILE_TRANSITIONS
                    .with_label_values(&["request", RequestStatus::Completed.as_str()])
                    .inc();
                info!(
                    media_id = saved.media.id,
                    request_id = request.id,
                    "Request completed"
                );
                self.notify(NotificationEvent::RequestCompleted {
                    request_id: request.id,
                    media_id: saved.media.id,
                    requested_by: request.requested_by,
                    is_alt: request.is_alt,
                })
                .await;
                completed.push(request.id);
            }
        }
        Ok(())
    }

    async fn notify(&self, event: NotificationEvent) {
        if let Some(notifier) = &self.notifier {
            notifier.emit(event).await;
        }
    }
}

/// Keep each media track at or below the aggregate of its seasons.
const PARTIAL_RANK: u8 = 3;

fn clamp_to_seasons(snapshot: &mut MediaSnapshot) {
    for track in Track::ALL {
        let Some(aggregate) = snapshot.aggregate_season_status(track) else {
            continue;
        };
        let current = snapshot.media.status(track);
        if let (Some(current_rank), Some(aggregate_rank)) =
            (current.availability_rank(), aggregate.availability_rank())
        {
            // Only availability claims are clamped; PENDING survives unknown seasons
            if current_rank > aggregate_rank && current_rank >= PARTIAL_RANK {
                snapshot.media.set_status(track, aggregate);
            }
        }
    }
}

fn seasons_changed(prev: &MediaSnapshot, next: &MediaSnapshot, track: Track) -> bool {
    next.seasons.iter().any(|season| {
        let before = prev
            .season(season.season_number)
            .map(|s| s.status(track))
            .unwrap_or_default();
        before != season.status(track)
    })
}

/// Whether writing `next` would change anything stored in `prev`.
///
/// Seasons or episodes absent from `next` are not removed by a save and so
/// do not count as differences.
fn snapshot_differs(prev: &MediaSnapshot, next: &MediaSnapshot) -> bool {
    let (a, b) = (&prev.media, &next.media);
    if a.ids != b.ids
        || a.title != b.title
        || a.status != b.status
        || a.status_alt != b.status_alt
        || a.service_id != b.service_id
        || a.service_id_alt != b.service_id_alt
        || a.external_service_id != b.external_service_id
        || a.external_service_id_alt != b.external_service_id_alt
    {
        return true;
    }

    next.seasons.iter().any(|season| {
        let Some(stored) = prev.season(season.season_number) else {
            return true;
        };
        if stored.status != season.status
            || stored.status_alt != season.status_alt
            || stored.episode_count != season.episode_count
        {
            return true;
        }
        season.episodes.iter().any(|episode| {
            match stored
                .episodes
                .iter()
                .find(|e| e.episode_number == episode.episode_number)
            {
                Some(e) => e.status != episode.status || e.status_alt != episode.status_alt,
                None => true,
            }
        })
    })
}
