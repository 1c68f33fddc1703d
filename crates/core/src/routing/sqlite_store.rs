//! SQLite-backed rule store.
//!
//! Conditions are stored in their legacy delimited string form and parsed
//! into typed sets when rows are loaded.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use super::{
    Conditions, NewOverrideRule, NewRoutingRule, OverrideRule, RoutingRule, RuleError, RuleStore,
};
use crate::config::{SeriesType, ServiceType};

/// SQLite-backed rule store.
pub struct SqliteRuleStore {
    conn: Mutex<Connection>,
}

impl SqliteRuleStore {
    pub fn new(path: &Path) -> Result<Self, RuleError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, RuleError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RuleError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS routing_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                service_type TEXT NOT NULL,
                is_4k INTEGER NOT NULL DEFAULT 0,
                priority INTEGER NOT NULL DEFAULT 0,
                is_fallback INTEGER NOT NULL DEFAULT 0,
                users TEXT,
                genres TEXT,
                languages TEXT,
                keywords TEXT,
                target_service_id INTEGER NOT NULL,
                active_profile_id INTEGER,
                root_folder TEXT,
                series_type TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                minimum_availability TEXT
            );

            CREATE TABLE IF NOT EXISTS override_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                radarr_service_id INTEGER,
                sonarr_service_id INTEGER,
                users TEXT,
                genre TEXT,
                language TEXT,
                keywords TEXT,
                profile_id INTEGER,
                root_folder TEXT,
                tags TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_routing_rules_target
                ON routing_rules(service_type, is_4k, priority DESC);
            "#,
        )?;
        Ok(())
    }

    fn tags_to_json(tags: &[i64]) -> Result<String, RuleError> {
        serde_json::to_string(tags).map_err(|e| RuleError::Database(e.to_string()))
    }

    fn parse_tags(json: &str) -> Vec<i64> {
        serde_json::from_str(json).unwrap_or_default()
    }
}

/// Raw routing rule row, before condition parsing.
struct RoutingRow {
    id: i64,
    name: String,
    service_type: String,
    is_4k: bool,
    priority: i32,
    is_fallback: bool,
    users: Option<String>,
    genres: Option<String>,
    languages: Option<String>,
    keywords: Option<String>,
    target_service_id: i64,
    active_profile_id: Option<i64>,
    root_folder: Option<String>,
    series_type: Option<String>,
    tags: String,
    minimum_availability: Option<String>,
}

impl RoutingRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            service_type: row.get(2)?,
            is_4k: row.get::<_, i64>(3)? != 0,
            priority: row.get(4)?,
            is_fallback: row.get::<_, i64>(5)? != 0,
            users: row.get(6)?,
            genres: row.get(7)?,
            languages: row.get(8)?,
            keywords: row.get(9)?,
            target_service_id: row.get(10)?,
            active_profile_id: row.get(11)?,
            root_folder: row.get(12)?,
            series_type: row.get(13)?,
            tags: row.get(14)?,
            minimum_availability: row.get(15)?,
        })
    }

    fn into_rule(self) -> Result<RoutingRule, RuleError> {
        let service_type =
            ServiceType::parse(&self.service_type).ok_or_else(|| RuleError::InvalidCondition {
                field: "service_type",
                value: self.service_type.clone(),
            })?;
        let conditions = Conditions::parse(
            self.users.as_deref(),
            self.genres.as_deref(),
            self.languages.as_deref(),
            self.keywords.as_deref(),
        )?;

        Ok(RoutingRule {
            id: self.id,
            name: self.name,
            service_type,
            is_4k: self.is_4k,
            priority: self.priority,
            is_fallback: self.is_fallback,
            conditions,
            target_service_id: self.target_service_id,
            active_profile_id: self.active_profile_id,
            root_folder: self.root_folder,
            series_type: self.series_type.as_deref().and_then(SeriesType::parse),
            tags: SqliteRuleStore::parse_tags(&self.tags),
            minimum_availability: self.minimum_availability,
        })
    }
}

impl RuleStore for SqliteRuleStore {
    fn create_routing_rule(&self, rule: NewRoutingRule) -> Result<RoutingRule, RuleError> {
        // Reject malformed conditions before they reach the table
        Conditions::parse(
            rule.users.as_deref(),
            rule.genres.as_deref(),
            rule.languages.as_deref(),
            rule.keywords.as_deref(),
        )?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO routing_rules (name, service_type, is_4k, priority, is_fallback, users, genres, languages, keywords, target_service_id, active_profile_id, root_folder, series_type, tags, minimum_availability) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                rule.name,
                rule.service_type.as_str(),
                rule.is_4k as i64,
                rule.priority,
                rule.is_fallback as i64,
                rule.users,
                rule.genres,
                rule.languages,
                rule.keywords,
                rule.target_service_id,
                rule.active_profile_id,
                rule.root_folder,
                rule.series_type.map(|s| s.as_str()),
                Self::tags_to_json(&rule.tags)?,
                rule.minimum_availability,
            ],
        )?;
        let id = conn.last_insert_rowid();

        let row = conn.query_row(
            "SELECT id, name, service_type, is_4k, priority, is_fallback, users, genres, languages, keywords, target_service_id, active_profile_id, root_folder, series_type, tags, minimum_availability FROM routing_rules WHERE id = ?",
            params![id],
            RoutingRow::from_row,
        )?;
        row.into_rule()
    }

    fn list_routing_rules(&self) -> Result<Vec<RoutingRule>, RuleError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, service_type, is_4k, priority, is_fallback, users, genres, languages, keywords, target_service_id, active_profile_id, root_folder, series_type, tags, minimum_availability FROM routing_rules ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], RoutingRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RoutingRow::into_rule).collect()
    }

    fn delete_routing_rule(&self, id: i64) -> Result<(), RuleError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM routing_rules WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(RuleError::NotFound(id));
        }
        Ok(())
    }

    fn create_override_rule(&self, rule: NewOverrideRule) -> Result<OverrideRule, RuleError> {
        let conditions = Conditions::parse(
            rule.users.as_deref(),
            rule.genre.as_deref(),
            rule.language.as_deref(),
            rule.keywords.as_deref(),
        )?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO override_rules (radarr_service_id, sonarr_service_id, users, genre, language, keywords, profile_id, root_folder, tags) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                rule.radarr_service_id,
                rule.sonarr_service_id,
                rule.users,
                rule.genre,
                rule.language,
                rule.keywords,
                rule.profile_id,
                rule.root_folder,
                Self::tags_to_json(&rule.tags)?,
            ],
        )?;

        Ok(OverrideRule {
            id: conn.last_insert_rowid(),
            radarr_service_id: rule.radarr_service_id,
            sonarr_service_id: rule.sonarr_service_id,
            conditions,
            profile_id: rule.profile_id,
            root_folder: rule.root_folder,
            tags: rule.tags,
        })
    }

    fn list_override_rules(&self) -> Result<Vec<OverrideRule>, RuleError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, radarr_service_id, sonarr_service_id, users, genre, language, keywords, profile_id, root_folder, tags FROM override_rules ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<i64>>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                    row.get::<_, Option<i64>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, radarr, sonarr, users, genre, language, keywords, profile, root, tags)| {
                    Ok(OverrideRule {
                        id,
                        radarr_service_id: radarr,
                        sonarr_service_id: sonarr,
                        conditions: Conditions::parse(
                            users.as_deref(),
                            genre.as_deref(),
                            language.as_deref(),
                            keywords.as_deref(),
                        )?,
                        profile_id: profile,
                        root_folder: root,
                        tags: Self::parse_tags(&tags),
                    })
                },
            )
            .collect()
    }

    fn delete_override_rule(&self, id: i64) -> Result<(), RuleError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM override_rules WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(RuleError::NotFound(id));
        }
        Ok(())
    }
}
