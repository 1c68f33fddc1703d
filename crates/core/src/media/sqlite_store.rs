//! SQLite-backed media store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    Episode, ExternalIds, Media, MediaError, MediaRequest, MediaSnapshot, MediaStatus, MediaStore,
    MediaType, NewMedia, NewMediaRequest, RequestFilter, RequestStatus, Season, SeasonRequest,
};

const MEDIA_COLUMNS: &str = "id, media_type, tmdb_id, tvdb_id, musicbrainz_id, hardcover_id, title, status, status_alt, service_id, service_id_alt, external_service_id, external_service_id_alt, created_at, updated_at";

const REQUEST_COLUMNS: &str = "id, media_id, requested_by, status, is_alt, service_id, profile_id, root_folder, tags, created_at, updated_at";

/// SQLite-backed media store.
pub struct SqliteMediaStore {
    conn: Mutex<Connection>,
}

impl SqliteMediaStore {
    /// Create a new SQLite media store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, MediaError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite media store (useful for testing).
    pub fn in_memory() -> Result<Self, MediaError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), MediaError> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS media (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                media_type TEXT NOT NULL,
                identity TEXT NOT NULL,
                tmdb_id INTEGER,
                tvdb_id INTEGER,
                musicbrainz_id TEXT,
                hardcover_id INTEGER,
                title TEXT,
                status TEXT NOT NULL,
                status_alt TEXT NOT NULL,
                service_id INTEGER,
                service_id_alt INTEGER,
                external_service_id INTEGER,
                external_service_id_alt INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (media_type, identity)
            );

            CREATE TABLE IF NOT EXISTS seasons (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                media_id INTEGER NOT NULL REFERENCES media(id) ON DELETE CASCADE,
                season_number INTEGER NOT NULL,
                status TEXT NOT NULL,
                status_alt TEXT NOT NULL,
                episode_count INTEGER NOT NULL DEFAULT 0,
                UNIQUE (media_id, season_number)
            );

            CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                season_id INTEGER NOT NULL REFERENCES seasons(id) ON DELETE CASCADE,
                episode_number INTEGER NOT NULL,
                status TEXT NOT NULL,
                status_alt TEXT NOT NULL,
                UNIQUE (season_id, episode_number)
            );

            CREATE TABLE IF NOT EXISTS media_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                media_id INTEGER NOT NULL REFERENCES media(id) ON DELETE CASCADE,
                requested_by INTEGER NOT NULL,
                status TEXT NOT NULL,
                is_alt INTEGER NOT NULL DEFAULT 0,
                service_id INTEGER,
                profile_id INTEGER,
                root_folder TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS season_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id INTEGER NOT NULL REFERENCES media_requests(id) ON DELETE CASCADE,
                season_number INTEGER NOT NULL,
                status TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_media_requests_media ON media_requests(media_id);
            CREATE INDEX IF NOT EXISTS idx_media_requests_status ON media_requests(status);
            CREATE INDEX IF NOT EXISTS idx_season_requests_request ON season_requests(request_id);
            "#,
        )?;
        Ok(())
    }

    fn parse_timestamp(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn parse_status(value: &str) -> MediaStatus {
        MediaStatus::parse(value).unwrap_or_default()
    }

    fn row_to_media(row: &rusqlite::Row) -> rusqlite::Result<Media> {
        let media_type_str: String = row.get(1)?;
        let status_str: String = row.get(7)?;
        let status_alt_str: String = row.get(8)?;
        let created_at_str: String = row.get(13)?;
        let updated_at_str: String = row.get(14)?;

        Ok(Media {
            id: row.get(0)?,
            // Only written through `MediaType::as_str`
            media_type: MediaType::parse(&media_type_str).unwrap_or(MediaType::Movie),
            ids: ExternalIds {
                tmdb_id: row.get(2)?,
                tvdb_id: row.get(3)?,
                musicbrainz_id: row.get(4)?,
                hardcover_id: row.get(5)?,
            },
            title: row.get(6)?,
            status: Self::parse_status(&status_str),
            status_alt: Self::parse_status(&status_alt_str),
            service_id: row.get(9)?,
            service_id_alt: row.get(10)?,
            external_service_id: row.get(11)?,
            external_service_id_alt: row.get(12)?,
            created_at: Self::parse_timestamp(&created_at_str),
            updated_at: Self::parse_timestamp(&updated_at_str),
        })
    }

    fn row_to_request(row: &rusqlite::Row) -> rusqlite::Result<MediaRequest> {
        let status_str: String = row.get(3)?;
        let is_alt: i64 = row.get(4)?;
        let tags_json: String = row.get(8)?;
        let created_at_str: String = row.get(9)?;
        let updated_at_str: String = row.get(10)?;

        Ok(MediaRequest {
            id: row.get(0)?,
            media_id: row.get(1)?,
            requested_by: row.get(2)?,
            status: RequestStatus::parse(&status_str).unwrap_or_default(),
            is_alt: is_alt != 0,
            service_id: row.get(5)?,
            profile_id: row.get(6)?,
            root_folder: row.get(7)?,
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            seasons: Vec::new(),
            created_at: Self::parse_timestamp(&created_at_str),
            updated_at: Self::parse_timestamp(&updated_at_str),
        })
    }

    fn load_media(conn: &Connection, id: i64) -> Result<Option<Media>, MediaError> {
        let media = conn
            .query_row(
                &format!("SELECT {} FROM media WHERE id = ?", MEDIA_COLUMNS),
                params![id],
                Self::row_to_media,
            )
            .optional()?;
        Ok(media)
    }

    fn load_snapshot(conn: &Connection, media_id: i64) -> Result<Option<MediaSnapshot>, MediaError> {
        let Some(media) = Self::load_media(conn, media_id)? else {
            return Ok(None);
        };

        let mut season_stmt = conn.prepare(
            "SELECT id, season_number, status, status_alt, episode_count FROM seasons WHERE media_id = ? ORDER BY season_number",
        )?;
        let mut seasons = season_stmt
            .query_map(params![media_id], |row| {
                let status: String = row.get(2)?;
                let status_alt: String = row.get(3)?;
                Ok(Season {
                    id: row.get(0)?,
                    season_number: row.get(1)?,
                    status: Self::parse_status(&status),
                    status_alt: Self::parse_status(&status_alt),
                    episode_count: row.get(4)?,
                    episodes: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut episode_stmt = conn.prepare(
            "SELECT id, episode_number, status, status_alt FROM episodes WHERE season_id = ? ORDER BY episode_number",
        )?;
        for season in &mut seasons {
            season.episodes = episode_stmt
                .query_map(params![season.id], |row| {
                    let status: String = row.get(2)?;
                    let status_alt: String = row.get(3)?;
                    Ok(Episode {
                        id: row.get(0)?,
                        episode_number: row.get(1)?,
                        status: Self::parse_status(&status),
                        status_alt: Self::parse_status(&status_alt),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(Some(MediaSnapshot { media, seasons }))
    }

    fn load_season_requests(
        conn: &Connection,
        request_id: i64,
    ) -> Result<Vec<SeasonRequest>, MediaError> {
        let mut stmt = conn.prepare(
            "SELECT id, season_number, status FROM season_requests WHERE request_id = ? ORDER BY season_number",
        )?;
        let seasons = stmt
            .query_map(params![request_id], |row| {
                let status: String = row.get(2)?;
                Ok(SeasonRequest {
                    id: row.get(0)?,
                    season_number: row.get(1)?,
                    status: RequestStatus::parse(&status).unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(seasons)
    }

    fn write_snapshot(
        conn: &Connection,
        snapshot: &MediaSnapshot,
        now: DateTime<Utc>,
    ) -> Result<(), MediaError> {
        let media = &snapshot.media;
        let updated = conn.execute(
            "UPDATE media SET tmdb_id = ?, tvdb_id = ?, musicbrainz_id = ?, hardcover_id = ?, title = ?, status = ?, status_alt = ?, service_id = ?, service_id_alt = ?, external_service_id = ?, external_service_id_alt = ?, updated_at = ? WHERE id = ?",
            params![
                media.ids.tmdb_id,
                media.ids.tvdb_id,
                media.ids.musicbrainz_id,
                media.ids.hardcover_id,
                media.title,
                media.status.as_str(),
                media.status_alt.as_str(),
                media.service_id,
                media.service_id_alt,
                media.external_service_id,
                media.external_service_id_alt,
                now.to_rfc3339(),
                media.id,
            ],
        )?;
        if updated == 0 {
            return Err(MediaError::NotFound(format!("media {}", media.id)));
        }

        for season in &snapshot.seasons {
            conn.execute(
                "INSERT INTO seasons (media_id, season_number, status, status_alt, episode_count) VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(media_id, season_number) DO UPDATE SET status = excluded.status, status_alt = excluded.status_alt, episode_count = excluded.episode_count",
                params![
                    media.id,
                    season.season_number,
                    season.status.as_str(),
                    season.status_alt.as_str(),
                    season.episode_count,
                ],
            )?;
            let season_id: i64 = conn.query_row(
                "SELECT id FROM seasons WHERE media_id = ? AND season_number = ?",
                params![media.id, season.season_number],
                |row| row.get(0),
            )?;

            for episode in &season.episodes {
                conn.execute(
                    "INSERT INTO episodes (season_id, episode_number, status, status_alt) VALUES (?, ?, ?, ?)
                     ON CONFLICT(season_id, episode_number) DO UPDATE SET status = excluded.status, status_alt = excluded.status_alt",
                    params![
                        season_id,
                        episode.episode_number,
                        episode.status.as_str(),
                        episode.status_alt.as_str(),
                    ],
                )?;
            }
        }
        Ok(())
    }

    fn build_where_clause(filter: &RequestFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(media_id) = filter.media_id {
            conditions.push("media_id = ?");
            params.push(Box::new(media_id));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }

        if let Some(is_alt) = filter.is_alt {
            conditions.push("is_alt = ?");
            params.push(Box::new(is_alt as i64));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

impl MediaStore for SqliteMediaStore {
    fn create_media(&self, new: NewMedia) -> Result<Media, MediaError> {
        let identity = new.ids.primary_key(new.media_type).ok_or_else(|| {
            MediaError::MissingIdentity(format!(
                "{} media requires its primary external id",
                new.media_type.as_str()
            ))
        })?;

        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        let result = conn.execute(
            "INSERT INTO media (media_type, identity, tmdb_id, tvdb_id, musicbrainz_id, hardcover_id, title, status, status_alt, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                new.media_type.as_str(),
                identity,
                new.ids.tmdb_id,
                new.ids.tvdb_id,
                new.ids.musicbrainz_id,
                new.ids.hardcover_id,
                new.title,
                new.status.as_str(),
                new.status_alt.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(MediaError::Conflict(format!(
                    "{} media {} already exists",
                    new.media_type.as_str(),
                    identity
                )));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Media {
            id: conn.last_insert_rowid(),
            media_type: new.media_type,
            ids: new.ids,
            title: new.title,
            status: new.status,
            status_alt: new.status_alt,
            service_id: None,
            service_id_alt: None,
            external_service_id: None,
            external_service_id_alt: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_media(&self, id: i64) -> Result<Option<Media>, MediaError> {
        let conn = self.conn.lock().unwrap();
        Self::load_media(&conn, id)
    }

    fn find_media(
        &self,
        media_type: MediaType,
        ids: &ExternalIds,
    ) -> Result<Option<Media>, MediaError> {
        let Some(identity) = ids.primary_key(media_type) else {
            return Ok(None);
        };

        let conn = self.conn.lock().unwrap();
        let media = conn
            .query_row(
                &format!(
                    "SELECT {} FROM media WHERE media_type = ? AND identity = ?",
                    MEDIA_COLUMNS
                ),
                params![media_type.as_str(), identity],
                Self::row_to_media,
            )
            .optional()?;
        Ok(media)
    }

    fn get_snapshot(&self, media_id: i64) -> Result<Option<MediaSnapshot>, MediaError> {
        let conn = self.conn.lock().unwrap();
        Self::load_snapshot(&conn, media_id)
    }

    fn save_snapshot(&self, snapshot: &MediaSnapshot) -> Result<MediaSnapshot, MediaError> {
        self.save_snapshot_approving(snapshot, &[])
    }

    fn save_snapshot_approving(
        &self,
        snapshot: &MediaSnapshot,
        approve: &[i64],
    ) -> Result<MediaSnapshot, MediaError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now();

        Self::write_snapshot(&tx, snapshot, now)?;

        for request_id in approve {
            let updated = tx.execute(
                "UPDATE media_requests SET status = ?, updated_at = ? WHERE id = ?",
                params![RequestStatus::Approved.as_str(), now.to_rfc3339(), request_id],
            )?;
            if updated == 0 {
                return Err(MediaError::NotFound(format!("request {}", request_id)));
            }
            tx.execute(
                "UPDATE season_requests SET status = ? WHERE request_id = ? AND status = ?",
                params![
                    RequestStatus::Approved.as_str(),
                    request_id,
                    RequestStatus::Pending.as_str(),
                ],
            )?;
        }

        let saved = Self::load_snapshot(&tx, snapshot.media.id)?
            .ok_or_else(|| MediaError::NotFound(format!("media {}", snapshot.media.id)))?;
        tx.commit()?;
        Ok(saved)
    }

    fn delete_media(&self, id: i64) -> Result<(), MediaError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM media WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(MediaError::NotFound(format!("media {}", id)));
        }
        Ok(())
    }

    fn create_request(&self, request: NewMediaRequest) -> Result<MediaRequest, MediaError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let now = Utc::now();

        let tags_json =
            serde_json::to_string(&request.tags).map_err(|e| MediaError::Database(e.to_string()))?;

        tx.execute(
            "INSERT INTO media_requests (media_id, requested_by, status, is_alt, service_id, profile_id, root_folder, tags, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                request.media_id,
                request.requested_by,
                request.status.as_str(),
                request.is_alt as i64,
                request.service_id,
                request.profile_id,
                request.root_folder,
                tags_json,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;
        let request_id = tx.last_insert_rowid();

        let mut seasons = Vec::with_capacity(request.seasons.len());
        for season_number in &request.seasons {
            tx.execute(
                "INSERT INTO season_requests (request_id, season_number, status) VALUES (?, ?, ?)",
                params![request_id, season_number, request.status.as_str()],
            )?;
            seasons.push(SeasonRequest {
                id: tx.last_insert_rowid(),
                season_number: *season_number,
                status: request.status,
            });
        }
        tx.commit()?;

        Ok(MediaRequest {
            id: request_id,
            media_id: request.media_id,
            requested_by: request.requested_by,
            status: request.status,
            is_alt: request.is_alt,
            service_id: request.service_id,
            profile_id: request.profile_id,
            root_folder: request.root_folder,
            tags: request.tags,
            seasons,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_request(&self, id: i64) -> Result<Option<MediaRequest>, MediaError> {
        let conn = self.conn.lock().unwrap();
        let request = conn
            .query_row(
                &format!("SELECT {} FROM media_requests WHERE id = ?", REQUEST_COLUMNS),
                params![id],
                Self::row_to_request,
            )
            .optional()?;

        match request {
            Some(mut request) => {
                request.seasons = Self::load_season_requests(&conn, request.id)?;
                Ok(Some(request))
            }
            None => Ok(None),
        }
    }

    fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<MediaRequest>, MediaError> {
        let conn = self.conn.lock().unwrap();
        let (where_clause, mut params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM media_requests {} ORDER BY id ASC LIMIT ? OFFSET ?",
            REQUEST_COLUMNS, where_clause
        );
        params.push(Box::new(filter.limit));
        params.push(Box::new(filter.offset));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let mut requests = stmt
            .query_map(params_refs.as_slice(), Self::row_to_request)?
            .collect::<Result<Vec<_>, _>>()?;

        for request in &mut requests {
            request.seasons = Self::load_season_requests(&conn, request.id)?;
        }

        Ok(requests)
    }

    fn update_request_status(&self, id: i64, status: RequestStatus) -> Result<(), MediaError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE media_requests SET status = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), Utc::now().to_rfc3339(), id],
        )?;
        if updated == 0 {
            return Err(MediaError::NotFound(format!("request {}", id)));
        }
        Ok(())
    }

    fn update_season_request_status(
        &self,
        id: i64,
        status: RequestStatus,
    ) -> Result<(), MediaError> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE season_requests SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        if updated == 0 {
            return Err(MediaError::NotFound(format!("season request {}", id)));
        }
        Ok(())
    }
}
