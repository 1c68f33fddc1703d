//! Routing rule and resolution types.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{SeriesType, ServiceType};

/// TMDB keyword marking a title as anime.
pub const ANIME_KEYWORD_ID: i64 = 210024;

/// Separator of legacy condition lists: "1,2,3" or "en|ja".
static CONDITION_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[,|]\s*").unwrap());

/// Errors from rule storage and parsing.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule not found: {0}")]
    NotFound(i64),

    #[error("invalid {field} condition '{value}'")]
    InvalidCondition { field: &'static str, value: String },

    #[error("database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for RuleError {
    fn from(err: rusqlite::Error) -> Self {
        RuleError::Database(err.to_string())
    }
}

/// Errors from route resolution.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("{}", no_default_message(.service_type, .is_4k))]
    NoDefaultInstanceConfigured {
        service_type: ServiceType,
        is_4k: bool,
    },

    #[error("rule {rule_id} targets {service_type} instance {service_id}, which is not configured")]
    UnknownTargetInstance {
        rule_id: i64,
        service_type: ServiceType,
        service_id: i64,
    },

    #[error("rule store error: {0}")]
    Rules(#[from] RuleError),
}

fn no_default_message(service_type: &ServiceType, is_4k: &bool) -> String {
    let service = service_type.display_name();
    if *is_4k {
        format!(
            "no default 4K {service} instance configured; mark one {service} instance with is_4k = true as default"
        )
    } else {
        format!("no default {service} instance configured; mark one {service} instance as default")
    }
}

/// Typed condition sets, parsed once from their stored string form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Conditions {
    pub users: BTreeSet<i64>,
    pub genres: BTreeSet<i64>,
    /// Lowercased language codes.
    pub languages: BTreeSet<String>,
    pub keywords: BTreeSet<i64>,
}

fn split(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.into_iter()
        .flat_map(|value| CONDITION_SEPARATOR.split(value.trim()))
        .filter(|part| !part.is_empty())
}

fn parse_ids(field: &'static str, raw: Option<&str>) -> Result<BTreeSet<i64>, RuleError> {
    split(raw)
        .map(|part| {
            part.parse::<i64>().map_err(|_| RuleError::InvalidCondition {
                field,
                value: part.to_string(),
            })
        })
        .collect()
}

fn join<T: ToString>(values: impl IntoIterator<Item = T>) -> Option<String> {
    let joined = values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    (!joined.is_empty()).then_some(joined)
}

impl Conditions {
    /// Parse the delimited string form used by stored rules.
    pub fn parse(
        users: Option<&str>,
        genres: Option<&str>,
        languages: Option<&str>,
        keywords: Option<&str>,
    ) -> Result<Self, RuleError> {
        Ok(Self {
            users: parse_ids("users", users)?,
            genres: parse_ids("genres", genres)?,
            languages: split(languages).map(|l| l.to_lowercase()).collect(),
            keywords: parse_ids("keywords", keywords)?,
        })
    }

    /// Delimited string form of (users, genres, languages, keywords).
    pub fn to_raw(&self) -> [Option<String>; 4] {
        [
            join(&self.users),
            join(&self.genres),
            self.languages
                .iter()
                .cloned()
                .reduce(|a, b| format!("{}|{}", a, b)),
            join(&self.keywords),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.genres.is_empty()
            && self.languages.is_empty()
            && self.keywords.is_empty()
    }

    /// Number of populated content conditions (genre, language, keywords).
    pub fn specificity(&self) -> usize {
        [
            !self.genres.is_empty(),
            !self.languages.is_empty(),
            !self.keywords.is_empty(),
        ]
        .iter()
        .filter(|populated| **populated)
        .count()
    }

    /// Every populated condition matches; within a condition any value may match.
    pub fn matches(
        &self,
        user_id: Option<i64>,
        genres: &[i64],
        language: Option<&str>,
        keywords: &[i64],
    ) -> bool {
        if !self.users.is_empty() && !user_id.is_some_and(|u| self.users.contains(&u)) {
            return false;
        }
        if !self.genres.is_empty() && !genres.iter().any(|g| self.genres.contains(g)) {
            return false;
        }
        if !self.languages.is_empty()
            && !language.is_some_and(|l| self.languages.contains(&l.to_lowercase()))
        {
            return false;
        }
        if !self.keywords.is_empty() && !keywords.iter().any(|k| self.keywords.contains(k)) {
            return false;
        }
        true
    }
}

/// A prioritized routing rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingRule {
    pub id: i64,
    pub name: String,
    pub service_type: ServiceType,
    pub is_4k: bool,
    /// Higher runs first.
    pub priority: i32,
    /// Matches every request regardless of conditions.
    pub is_fallback: bool,
    pub conditions: Conditions,
    pub target_service_id: i64,
    pub active_profile_id: Option<i64>,
    pub root_folder: Option<String>,
    pub series_type: Option<SeriesType>,
    pub tags: Vec<i64>,
    pub minimum_availability: Option<String>,
}

impl RoutingRule {
    pub fn matches(&self, query: &RouteQuery) -> bool {
        self.is_fallback
            || self.conditions.is_empty()
            || self.conditions.matches(
                query.user_id,
                &query.genres,
                query.language.as_deref(),
                &query.keywords,
            )
    }
}

/// A legacy per-instance override rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverrideRule {
    pub id: i64,
    pub radarr_service_id: Option<i64>,
    pub sonarr_service_id: Option<i64>,
    pub conditions: Conditions,
    pub profile_id: Option<i64>,
    pub root_folder: Option<String>,
    pub tags: Vec<i64>,
}

impl OverrideRule {
    /// The instance this rule applies to for a service type.
    pub fn service_id(&self, service_type: ServiceType) -> Option<i64> {
        match service_type {
            ServiceType::Radarr => self.radarr_service_id,
            ServiceType::Sonarr => self.sonarr_service_id,
            ServiceType::Readarr => None,
        }
    }
}

/// Inputs to rule-based routing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteQuery {
    pub service_type: ServiceType,
    #[serde(default)]
    pub is_4k: bool,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub genres: Vec<i64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub keywords: Vec<i64>,
}

impl RouteQuery {
    pub fn new(service_type: ServiceType, is_4k: bool) -> Self {
        Self {
            service_type,
            is_4k,
            user_id: None,
            genres: Vec::new(),
            language: None,
            keywords: Vec::new(),
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_genres(mut self, genres: Vec<i64>) -> Self {
        self.genres = genres;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<i64>) -> Self {
        self.keywords = keywords;
        self
    }
}

/// Inputs to legacy override evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverrideQuery {
    #[serde(flatten)]
    pub route: RouteQuery,
    #[serde(default)]
    pub is_anime: bool,
}

/// Where and how a request is sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RouteResolution {
    pub service_id: i64,
    pub profile_id: Option<i64>,
    pub root_folder: Option<String>,
    pub series_type: Option<SeriesType>,
    pub tags: Vec<i64>,
    pub minimum_availability: Option<String>,
    /// Rule that produced the result; `None` for instance defaults.
    pub rule_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_strings() {
        let conditions =
            Conditions::parse(Some("1, 2"), Some("16|28"), Some("EN|ja"), None).unwrap();
        assert_eq!(conditions.users.len(), 2);
        assert!(conditions.genres.contains(&28));
        assert!(conditions.languages.contains("en"));
        assert!(conditions.keywords.is_empty());
        assert_eq!(conditions.specificity(), 2);

        let [users, genres, languages, keywords] = conditions.to_raw();
        assert_eq!(users.as_deref(), Some("1,2"));
        assert_eq!(genres.as_deref(), Some("16,28"));
        assert_eq!(languages.as_deref(), Some("en|ja"));
        assert!(keywords.is_none());
    }

    #[test]
    fn test_parse_rejects_non_numeric_ids() {
        let result = Conditions::parse(None, Some("16,action"), None, None);
        assert!(matches!(
            result,
            Err(RuleError::InvalidCondition { field: "genres", .. })
        ));
    }

    #[test]
    fn test_matches_and_across_or_within() {
        let conditions = Conditions::parse(None, Some("16,28"), Some("ja"), None).unwrap();
        assert!(conditions.matches(None, &[28, 99], Some("JA"), &[]));
        assert!(!conditions.matches(None, &[28], Some("en"), &[]));
        assert!(!conditions.matches(None, &[12], Some("ja"), &[]));
        assert!(!conditions.matches(None, &[28], None, &[]));
    }

    #[test]
    fn test_empty_parses_to_empty() {
        let conditions = Conditions::parse(Some(""), Some("  "), None, Some(",")).unwrap();
        assert!(conditions.is_empty());
    }

    #[test]
    fn test_no_default_message_names_service_and_track() {
        let err = RoutingError::NoDefaultInstanceConfigured {
            service_type: ServiceType::Sonarr,
            is_4k: true,
        };
        let message = err.to_string();
        assert!(message.contains("4K Sonarr"));
        assert!(message.contains("is_4k = true"));

        let err = RoutingError::NoDefaultInstanceConfigured {
            service_type: ServiceType::Radarr,
            is_4k: false,
        };
        assert_eq!(
            err.to_string(),
            "no default Radarr instance configured; mark one Radarr instance as default"
        );
    }
}
