//! Core media and request data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Enumerations
// ============================================================================

/// Kind of title tracked by the system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    Tv,
    Music,
    Book,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
            MediaType::Music => "music",
            MediaType::Book => "book",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(MediaType::Movie),
            "tv" => Some(MediaType::Tv),
            "music" => Some(MediaType::Music),
            "book" => Some(MediaType::Book),
            _ => None,
        }
    }
}

/// Availability status of a media item, season or episode on one track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    #[default]
    Unknown,
    Pending,
    Processing,
    PartiallyAvailable,
    Available,
    Blocklisted,
    Deleted,
}

impl MediaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaStatus::Unknown => "unknown",
            MediaStatus::Pending => "pending",
            MediaStatus::Processing => "processing",
            MediaStatus::PartiallyAvailable => "partially_available",
            MediaStatus::Available => "available",
            MediaStatus::Blocklisted => "blocklisted",
            MediaStatus::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unknown" => Some(MediaStatus::Unknown),
            "pending" => Some(MediaStatus::Pending),
            "processing" => Some(MediaStatus::Processing),
            "partially_available" => Some(MediaStatus::PartiallyAvailable),
            "available" => Some(MediaStatus::Available),
            "blocklisted" => Some(MediaStatus::Blocklisted),
            "deleted" => Some(MediaStatus::Deleted),
            _ => None,
        }
    }

    /// Position on the availability ladder.
    ///
    /// `Blocklisted` and `Deleted` sit outside the ladder and return `None`.
    pub fn availability_rank(&self) -> Option<u8> {
        match self {
            MediaStatus::Unknown => Some(0),
            MediaStatus::Pending => Some(1),
            MediaStatus::Processing => Some(2),
            MediaStatus::PartiallyAvailable => Some(3),
            MediaStatus::Available => Some(4),
            MediaStatus::Blocklisted | MediaStatus::Deleted => None,
        }
    }

    /// Whether requests waiting on this status are satisfied.
    pub fn is_terminal_for_requests(&self) -> bool {
        matches!(self, MediaStatus::Available | MediaStatus::Deleted)
    }
}

/// Status of a media request or season request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Declined,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Declined => "declined",
            RequestStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "declined" => Some(RequestStatus::Declined),
            "completed" => Some(RequestStatus::Completed),
            _ => None,
        }
    }
}

/// Standard vs. alternate (4K / alternate edition) status dimension.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Standard,
    Alt,
}

impl Track {
    pub const ALL: [Track; 2] = [Track::Standard, Track::Alt];

    pub fn from_is_alt(is_alt: bool) -> Self {
        if is_alt {
            Track::Alt
        } else {
            Track::Standard
        }
    }

    pub fn is_alt(&self) -> bool {
        matches!(self, Track::Alt)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Track::Standard => "standard",
            Track::Alt => "alt",
        }
    }
}

// ============================================================================
// Identity
// ============================================================================

/// External identifiers of a title.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musicbrainz_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardcover_id: Option<u32>,
}

impl ExternalIds {
    pub fn tmdb(id: u32) -> Self {
        Self {
            tmdb_id: Some(id),
            ..Default::default()
        }
    }

    pub fn tvdb(id: u32) -> Self {
        Self {
            tvdb_id: Some(id),
            ..Default::default()
        }
    }

    pub fn musicbrainz(id: impl Into<String>) -> Self {
        Self {
            musicbrainz_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn hardcover(id: u32) -> Self {
        Self {
            hardcover_id: Some(id),
            ..Default::default()
        }
    }

    /// The identity key that is unique per media type.
    ///
    /// Movies are keyed by TMDB, shows by TVDB, music by MusicBrainz and
    /// books by Hardcover. Returns `None` when the mandatory ID is missing.
    pub fn primary_key(&self, media_type: MediaType) -> Option<String> {
        match media_type {
            MediaType::Movie => self.tmdb_id.map(|id| format!("tmdb:{}", id)),
            MediaType::Tv => self.tvdb_id.map(|id| format!("tvdb:{}", id)),
            MediaType::Music => self
                .musicbrainz_id
                .as_ref()
                .filter(|id| !id.is_empty())
                .map(|id| format!("mb:{}", id)),
            MediaType::Book => self.hardcover_id.map(|id| format!("hardcover:{}", id)),
        }
    }

    /// Fill IDs missing here from `other`.
    pub fn merge_missing(&mut self, other: &ExternalIds) {
        if self.tmdb_id.is_none() {
            self.tmdb_id = other.tmdb_id;
        }
        if self.tvdb_id.is_none() {
            self.tvdb_id = other.tvdb_id;
        }
        if self.musicbrainz_id.is_none() {
            self.musicbrainz_id = other.musicbrainz_id.clone();
        }
        if self.hardcover_id.is_none() {
            self.hardcover_id = other.hardcover_id;
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// One title known to the system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Media {
    pub id: i64,
    pub media_type: MediaType,
    pub ids: ExternalIds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: MediaStatus,
    pub status_alt: MediaStatus,
    /// Service instance holding the standard track.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id_alt: Option<i64>,
    /// Item ID inside that instance (e.g., the Radarr movie ID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_service_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_service_id_alt: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Media {
    pub fn status(&self, track: Track) -> MediaStatus {
        match track {
            Track::Standard => self.status,
            Track::Alt => self.status_alt,
        }
    }

    pub fn set_status(&mut self, track: Track, status: MediaStatus) {
        match track {
            Track::Standard => self.status = status,
            Track::Alt => self.status_alt = status,
        }
    }

    /// Instance currently carrying this track.
    pub fn linked_service(&self, track: Track) -> Option<i64> {
        match track {
            Track::Standard => self.service_id,
            Track::Alt => self.service_id_alt,
        }
    }

    /// Record which instance and item carry this track.
    pub fn set_service_link(&mut self, track: Track, service_id: i64, external_id: i64) {
        match track {
            Track::Standard => {
                self.service_id = Some(service_id);
                self.external_service_id = Some(external_id);
            }
            Track::Alt => {
                self.service_id_alt = Some(service_id);
                self.external_service_id_alt = Some(external_id);
            }
        }
    }

    pub fn is_blocklisted(&self) -> bool {
        self.status == MediaStatus::Blocklisted || self.status_alt == MediaStatus::Blocklisted
    }
}

/// An episode of a season.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    /// Zero until persisted.
    pub id: i64,
    pub episode_number: u32,
    pub status: MediaStatus,
    pub status_alt: MediaStatus,
}

impl Episode {
    pub fn new(episode_number: u32) -> Self {
        Self {
            id: 0,
            episode_number,
            status: MediaStatus::Unknown,
            status_alt: MediaStatus::Unknown,
        }
    }

    pub fn status(&self, track: Track) -> MediaStatus {
        match track {
            Track::Standard => self.status,
            Track::Alt => self.status_alt,
        }
    }

    pub fn set_status(&mut self, track: Track, status: MediaStatus) {
        match track {
            Track::Standard => self.status = status,
            Track::Alt => self.status_alt = status,
        }
    }
}

/// A season of a show, with its episodes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Season {
    /// Zero until persisted.
    pub id: i64,
    pub season_number: u32,
    pub status: MediaStatus,
    pub status_alt: MediaStatus,
    /// Episodes the season is known to have; zero when no service reported it.
    #[serde(default)]
    pub episode_count: u32,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

impl Season {
    pub fn new(season_number: u32) -> Self {
        Self {
            id: 0,
            season_number,
            status: MediaStatus::Unknown,
            status_alt: MediaStatus::Unknown,
            episode_count: 0,
            episodes: Vec::new(),
        }
    }

    /// Raise the known episode count. Counts never shrink.
    pub fn observe_episode_count(&mut self, count: u32) {
        self.episode_count = self.episode_count.max(count);
    }

    pub fn status(&self, track: Track) -> MediaStatus {
        match track {
            Track::Standard => self.status,
            Track::Alt => self.status_alt,
        }
    }

    pub fn set_status(&mut self, track: Track, status: MediaStatus) {
        match track {
            Track::Standard => self.status = status,
            Track::Alt => self.status_alt = status,
        }
    }

    /// Get or insert an episode by number.
    pub fn episode_mut(&mut self, episode_number: u32) -> &mut Episode {
        let idx = match self
            .episodes
            .iter()
            .position(|e| e.episode_number == episode_number)
        {
            Some(idx) => idx,
            None => {
                self.episodes.push(Episode::new(episode_number));
                self.episodes.len() - 1
            }
        };
        &mut self.episodes[idx]
    }
}

/// A media record together with its seasons and episodes.
///
/// This is the unit the reconciliation engine compares and persists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaSnapshot {
    pub media: Media,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

impl MediaSnapshot {
    pub fn new(media: Media) -> Self {
        Self {
            media,
            seasons: Vec::new(),
        }
    }

    pub fn season(&self, season_number: u32) -> Option<&Season> {
        self.seasons
            .iter()
            .find(|s| s.season_number == season_number)
    }

    /// Get or insert a season by number.
    pub fn season_mut(&mut self, season_number: u32) -> &mut Season {
        let idx = match self
            .seasons
            .iter()
            .position(|s| s.season_number == season_number)
        {
            Some(idx) => idx,
            None => {
                self.seasons.push(Season::new(season_number));
                self.seasons.len() - 1
            }
        };
        &mut self.seasons[idx]
    }

    /// Aggregate status of all seasons on a track.
    ///
    /// Returns `None` when there are no seasons to aggregate.
    pub fn aggregate_season_status(&self, track: Track) -> Option<MediaStatus> {
        if self.seasons.is_empty() {
            return None;
        }

        let statuses: Vec<MediaStatus> = self.seasons.iter().map(|s| s.status(track)).collect();

        if statuses.iter().all(|s| *s == MediaStatus::Deleted) {
            return Some(MediaStatus::Deleted);
        }
        if statuses.iter().all(|s| *s == MediaStatus::Available) {
            return Some(MediaStatus::Available);
        }

        let aggregate = if statuses
            .iter()
            .any(|s| matches!(s, MediaStatus::Available | MediaStatus::PartiallyAvailable))
        {
            MediaStatus::PartiallyAvailable
        } else if statuses.contains(&MediaStatus::Processing) {
            MediaStatus::Processing
        } else if statuses.contains(&MediaStatus::Pending) {
            MediaStatus::Pending
        } else {
            MediaStatus::Unknown
        };

        Some(aggregate)
    }
}

/// A season requested as part of a TV request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonRequest {
    pub id: i64,
    pub season_number: u32,
    pub status: RequestStatus,
}

/// A user's ask for a title on one track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRequest {
    pub id: i64,
    pub media_id: i64,
    pub requested_by: i64,
    pub status: RequestStatus,
    /// Request targets the alternate (4K) track.
    pub is_alt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<String>,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub seasons: Vec<SeasonRequest>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaRequest {
    pub fn track(&self) -> Track {
        Track::from_is_alt(self.is_alt)
    }
}
