//! Rule storage trait and types.

use serde::{Deserialize, Serialize};

use super::{OverrideRule, RoutingRule, RuleError};
use crate::config::{SeriesType, ServiceType};

/// Data for a new routing rule. Conditions use the delimited string form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoutingRule {
    pub name: String,
    pub service_type: ServiceType,
    #[serde(default)]
    pub is_4k: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default)]
    pub users: Option<String>,
    #[serde(default)]
    pub genres: Option<String>,
    #[serde(default)]
    pub languages: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    pub target_service_id: i64,
    #[serde(default)]
    pub active_profile_id: Option<i64>,
    #[serde(default)]
    pub root_folder: Option<String>,
    #[serde(default)]
    pub series_type: Option<SeriesType>,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub minimum_availability: Option<String>,
}

impl NewRoutingRule {
    pub fn new(
        name: impl Into<String>,
        service_type: ServiceType,
        target_service_id: i64,
    ) -> Self {
        Self {
            name: name.into(),
            service_type,
            is_4k: false,
            priority: 0,
            is_fallback: false,
            users: None,
            genres: None,
            languages: None,
            keywords: None,
            target_service_id,
            active_profile_id: None,
            root_folder: None,
            series_type: None,
            tags: Vec::new(),
            minimum_availability: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_4k(mut self, is_4k: bool) -> Self {
        self.is_4k = is_4k;
        self
    }

    pub fn fallback(mut self) -> Self {
        self.is_fallback = true;
        self
    }

    pub fn with_genres(mut self, genres: impl Into<String>) -> Self {
        self.genres = Some(genres.into());
        self
    }

    pub fn with_languages(mut self, languages: impl Into<String>) -> Self {
        self.languages = Some(languages.into());
        self
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    pub fn with_users(mut self, users: impl Into<String>) -> Self {
        self.users = Some(users.into());
        self
    }

    pub fn with_profile(mut self, profile_id: i64) -> Self {
        self.active_profile_id = Some(profile_id);
        self
    }

    pub fn with_root_folder(mut self, root_folder: impl Into<String>) -> Self {
        self.root_folder = Some(root_folder.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<i64>) -> Self {
        self.tags = tags;
        self
    }
}

/// Data for a new legacy override rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOverrideRule {
    #[serde(default)]
    pub radarr_service_id: Option<i64>,
    #[serde(default)]
    pub sonarr_service_id: Option<i64>,
    #[serde(default)]
    pub users: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub profile_id: Option<i64>,
    #[serde(default)]
    pub root_folder: Option<String>,
    #[serde(default)]
    pub tags: Vec<i64>,
}

/// Storage backend for routing and override rules.
///
/// Rules come back with conditions already parsed into typed sets.
pub trait RuleStore: Send + Sync {
    /// Create a routing rule; conditions are validated before writing.
    fn create_routing_rule(&self, rule: NewRoutingRule) -> Result<RoutingRule, RuleError>;

    /// All routing rules, in ID order.
    fn list_routing_rules(&self) -> Result<Vec<RoutingRule>, RuleError>;

    fn delete_routing_rule(&self, id: i64) -> Result<(), RuleError>;

    /// Create an override rule; conditions are validated before writing.
    fn create_override_rule(&self, rule: NewOverrideRule) -> Result<OverrideRule, RuleError>;

    /// All override rules, in ID order.
    fn list_override_rules(&self) -> Result<Vec<OverrideRule>, RuleError>;

    fn delete_override_rule(&self, id: i64) -> Result<(), RuleError>;
}
