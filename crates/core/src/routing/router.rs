//! Request submission: routing, media bookkeeping, request creation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::{
    OverrideEvaluator, OverrideQuery, RouteQuery, RouteResolution, RoutingError, RoutingResolver,
    ANIME_KEYWORD_ID,
};
use crate::config::{RoutingMode, ServiceType};
use crate::media::{
    ExternalIds, MediaError, MediaRequest, MediaStatus, MediaType, NewMedia, NewMediaRequest,
    RequestFilter, RequestStatus, Track,
};
use crate::reconcile::{AlwaysCurrent, ReconcileError, ReconciliationEngine};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("media {0} is blocklisted")]
    Blocklisted(i64),

    #[error("no download service handles {0} requests")]
    UnsupportedMediaType(&'static str),

    #[error("seasons of media {0} are already available or requested")]
    NothingToRequest(i64),
}

/// A user's request for a title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub media_type: MediaType,
    pub ids: ExternalIds,
    #[serde(default)]
    pub title: Option<String>,
    pub requested_by: i64,
    #[serde(default)]
    pub is_4k: bool,
    /// Requested season numbers (TV only).
    #[serde(default)]
    pub seasons: Vec<u32>,
    #[serde(default)]
    pub genres: Vec<i64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub keywords: Vec<i64>,
}

impl SubmitRequest {
    pub fn new(media_type: MediaType, ids: ExternalIds, requested_by: i64) -> Self {
        Self {
            media_type,
            ids,
            title: None,
            requested_by,
            is_4k: false,
            seasons: Vec::new(),
            genres: Vec::new(),
            language: None,
            keywords: Vec::new(),
        }
    }

    pub fn with_4k(mut self, is_4k: bool) -> Self {
        self.is_4k = is_4k;
        self
    }

    pub fn with_seasons(mut self, seasons: Vec<u32>) -> Self {
        self.seasons = seasons;
        self
    }

    pub fn with_genres(mut self, genres: Vec<i64>) -> Self {
        self.genres = genres;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<i64>) -> Self {
        self.keywords = keywords;
        self
    }
}

/// Download service responsible for a media type.
pub fn service_for(media_type: MediaType) -> Option<ServiceType> {
    match media_type {
        MediaType::Movie => Some(ServiceType::Radarr),
        MediaType::Tv => Some(ServiceType::Sonarr),
        MediaType::Book => Some(ServiceType::Readarr),
        MediaType::Music => None,
    }
}

/// Turns submitted requests into stored, routed media requests.
pub struct RequestRouter {
    mode: RoutingMode,
    resolver: RoutingResolver,
    overrides: OverrideEvaluator,
    engine: Arc<ReconciliationEngine>,
}

impl RequestRouter {
    pub fn new(
        mode: RoutingMode,
        resolver: RoutingResolver,
        overrides: OverrideEvaluator,
        engine: Arc<ReconciliationEngine>,
    ) -> Self {
        Self {
            mode,
            resolver,
            overrides,
            engine,
        }
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    /// Route a query with whichever resolver the configured mode selects.
    pub fn route(&self, query: RouteQuery) -> Result<RouteResolution, RoutingError> {
        match self.mode {
            RoutingMode::Rules => self.resolver.resolve_route(&query),
            RoutingMode::Overrides => {
                let is_anime = query.service_type == ServiceType::Sonarr
                    && query.keywords.contains(&ANIME_KEYWORD_ID);
                self.overrides.override_rules(&OverrideQuery {
                    route: query,
                    is_anime,
                })
            }
        }
    }

    pub async fn submit(&self, submit: SubmitRequest) -> Result<MediaRequest, RequestError> {
        let service_type = service_for(submit.media_type)
            .ok_or(RequestError::UnsupportedMediaType(submit.media_type.as_str()))?;
        let track = Track::from_is_alt(submit.is_4k);
        let store = self.engine.store();

        let existing = store.find_media(submit.media_type, &submit.ids)?;
        if let Some(media) = &existing {
            if media.status(track) == MediaStatus::Blocklisted {
                return Err(RequestError::Blocklisted(media.id));
            }
        }

        let mut query = RouteQuery::new(service_type, submit.is_4k)
            .with_genres(submit.genres.clone())
            .with_keywords(submit.keywords.clone());
        query.user_id = Some(submit.requested_by);
        query.language = submit.language.clone();
        let resolution = self.route(query)?;

        let media = match existing {
            Some(media) => media,
            None => {
                let mut new = NewMedia::new(submit.media_type, submit.ids.clone());
                new.title = submit.title.clone();
                store.create_media(new)?
            }
        };

        let mut snapshot = store
            .get_snapshot(media.id)?
            .ok_or(ReconcileError::MediaNotFound(media.id))?;

        let mut seasons = submit.seasons.clone();
        if submit.media_type == MediaType::Tv && !seasons.is_empty() {
            let active = store.list_requests(
                &RequestFilter::new()
                    .with_media_id(media.id)
                    .with_is_alt(submit.is_4k),
            )?;
            seasons.retain(|&number| {
                let available = snapshot
                    .season(number)
                    .is_some_and(|s| s.status(track) == MediaStatus::Available);
                let requested = active.iter().any(|request| {
                    matches!(request.status, RequestStatus::Pending | RequestStatus::Approved)
                        && request.seasons.iter().any(|s| {
                            s.season_number == number && s.status != RequestStatus::Completed
                        })
                });
                !available && !requested
            });
            seasons.sort_unstable();
            seasons.dedup();
            if seasons.is_empty() {
                return Err(RequestError::NothingToRequest(media.id));
            }
        }

        let reopen = |status: MediaStatus| {
            matches!(status, MediaStatus::Unknown | MediaStatus::Deleted)
        };
        if reopen(snapshot.media.status(track)) {
            snapshot.media.set_status(track, MediaStatus::Pending);
        }
        if submit.media_type == MediaType::Tv {
            for &season_number in &seasons {
                let season = snapshot.season_mut(season_number);
                if reopen(season.status(track)) {
                    season.set_status(track, MediaStatus::Pending);
                }
            }
        }
        self.engine.apply(snapshot, &AlwaysCurrent).await?;

        let mut new_request = NewMediaRequest::new(media.id, submit.requested_by, submit.is_4k);
        if submit.media_type == MediaType::Tv {
            new_request = new_request.with_seasons(seasons);
        }
        new_request.service_id = Some(resolution.service_id);
        new_request.profile_id = resolution.profile_id;
        new_request.root_folder = resolution.root_folder;
        new_request.tags = resolution.tags;

        let request = store.create_request(new_request)?;
        info!(
            request_id = request.id,
            media_id = media.id,
            service_id = resolution.service_id,
            "Request submitted"
        );
        Ok(request)
    }
}
