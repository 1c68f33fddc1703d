//! Media storage trait and types.

use thiserror::Error;

use super::{
    ExternalIds, Media, MediaRequest, MediaSnapshot, MediaStatus, MediaType, RequestStatus,
};

/// Error type for media and request storage.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Record not found.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The mandatory external ID for the media type is missing.
    #[error("Missing identity: {0}")]
    MissingIdentity(String),
    /// A media record with the same identity already exists.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for MediaError {
    fn from(err: rusqlite::Error) -> Self {
        MediaError::Database(err.to_string())
    }
}

/// Data for a new media record.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub media_type: MediaType,
    pub ids: ExternalIds,
    pub title: Option<String>,
    pub status: MediaStatus,
    pub status_alt: MediaStatus,
}

impl NewMedia {
    pub fn new(media_type: MediaType, ids: ExternalIds) -> Self {
        Self {
            media_type,
            ids,
            title: None,
            status: MediaStatus::Unknown,
            status_alt: MediaStatus::Unknown,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Data for a new media request.
#[derive(Debug, Clone)]
pub struct NewMediaRequest {
    pub media_id: i64,
    pub requested_by: i64,
    pub status: RequestStatus,
    pub is_alt: bool,
    pub service_id: Option<i64>,
    pub profile_id: Option<i64>,
    pub root_folder: Option<String>,
    pub tags: Vec<i64>,
    /// Requested season numbers (TV only). Each gets its own season request.
    pub seasons: Vec<u32>,
}

impl NewMediaRequest {
    pub fn new(media_id: i64, requested_by: i64, is_alt: bool) -> Self {
        Self {
            media_id,
            requested_by,
            status: RequestStatus::Pending,
            is_alt,
            service_id: None,
            profile_id: None,
            root_folder: None,
            tags: Vec::new(),
            seasons: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_seasons(mut self, seasons: Vec<u32>) -> Self {
        self.seasons = seasons;
        self
    }
}

/// Filter for querying media requests.
#[derive(Debug, Clone)]
pub struct RequestFilter {
    /// Filter by media.
    pub media_id: Option<i64>,
    /// Filter by request status.
    pub status: Option<RequestStatus>,
    /// Filter by track.
    pub is_alt: Option<bool>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl Default for RequestFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestFilter {
    pub fn new() -> Self {
        Self {
            media_id: None,
            status: None,
            is_alt: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_media_id(mut self, media_id: i64) -> Self {
        self.media_id = Some(media_id);
        self
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_is_alt(mut self, is_alt: bool) -> Self {
        self.is_alt = Some(is_alt);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Storage backend for media, seasons, episodes and requests.
pub trait MediaStore: Send + Sync {
    /// Create a media record. Fails with `Conflict` if the identity is taken.
    fn create_media(&self, media: NewMedia) -> Result<Media, MediaError>;

    /// Get a media record by ID.
    fn get_media(&self, id: i64) -> Result<Option<Media>, MediaError>;

    /// Find a media record by its type-specific primary identity.
    fn find_media(&self, media_type: MediaType, ids: &ExternalIds)
        -> Result<Option<Media>, MediaError>;

    /// Load a media record with all seasons and episodes.
    fn get_snapshot(&self, media_id: i64) -> Result<Option<MediaSnapshot>, MediaError>;

    /// Persist a snapshot atomically and return it with assigned IDs.
    ///
    /// Seasons and episodes are upserted by number. Children absent from the
    /// snapshot are left untouched.
    fn save_snapshot(&self, snapshot: &MediaSnapshot) -> Result<MediaSnapshot, MediaError>;

    /// Persist a snapshot and approve requests in the same transaction.
    ///
    /// Each listed request moves to APPROVED along with its PENDING season
    /// requests. Nothing is written if any part fails.
    fn save_snapshot_approving(
        &self,
        snapshot: &MediaSnapshot,
        approve: &[i64],
    ) -> Result<MediaSnapshot, MediaError>;

    /// Delete a media record together with its seasons, episodes and requests.
    fn delete_media(&self, id: i64) -> Result<(), MediaError>;

    /// Create a request with one season request per requested season.
    fn create_request(&self, request: NewMediaRequest) -> Result<MediaRequest, MediaError>;

    /// Get a request by ID.
    fn get_request(&self, id: i64) -> Result<Option<MediaRequest>, MediaError>;

    /// List requests matching the filter, oldest first.
    fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<MediaRequest>, MediaError>;

    /// Set the status of a request.
    fn update_request_status(&self, id: i64, status: RequestStatus) -> Result<(), MediaError>;

    /// Set the status of a season request.
    fn update_season_request_status(
        &self,
        id: i64,
        status: RequestStatus,
    ) -> Result<(), MediaError>;
}
