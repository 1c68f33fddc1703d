//! Legacy per-instance override rules.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::resolver::instance_defaults;
use super::{OverrideQuery, OverrideRule, RouteResolution, RoutingError, RuleStore, ANIME_KEYWORD_ID};
use crate::config::{SeriesType, ServiceSettings, ServiceType};
use crate::metrics::ROUTING_RESOLUTIONS;

/// Applies the most specific matching override rule on top of the default
/// instance's settings.
pub struct OverrideEvaluator {
    rules: Arc<dyn RuleStore>,
    settings: ServiceSettings,
}

impl OverrideEvaluator {
    pub fn new(rules: Arc<dyn RuleStore>, settings: ServiceSettings) -> Self {
        Self { rules, settings }
    }

    pub fn override_rules(&self, query: &OverrideQuery) -> Result<RouteResolution, RoutingError> {
        let result = self.evaluate(query);
        let outcome = match &result {
            Ok(resolution) if resolution.rule_id.is_some() => "rule",
            Ok(_) => "default",
            Err(_) => "error",
        };
        ROUTING_RESOLUTIONS
            .with_label_values(&["overrides", outcome])
            .inc();
        result
    }

    fn evaluate(&self, query: &OverrideQuery) -> Result<RouteResolution, RoutingError> {
        let route = &query.route;
        let instance = self
            .settings
            .default_instance(route.service_type, route.is_4k)
            .ok_or(RoutingError::NoDefaultInstanceConfigured {
                service_type: route.service_type,
                is_4k: route.is_4k,
            })?;

        let anime = query.is_anime && route.service_type == ServiceType::Sonarr;
        let mut resolution = instance_defaults(instance);
        if anime {
            if instance.active_anime_profile_id.is_some() {
                resolution.profile_id = instance.active_anime_profile_id;
            }
            if instance.active_anime_directory.is_some() {
                resolution.root_folder = instance.active_anime_directory.clone();
            }
            if !instance.anime_tags.is_empty() {
                resolution.tags = instance.anime_tags.clone();
            }
            resolution.series_type = Some(SeriesType::Anime);
        }

        let rules = self.rules.list_override_rules()?;
        let Some(rule) = select_rule(&rules, query, instance.id, anime) else {
            return Ok(resolution);
        };

        debug!(rule_id = rule.id, instance = %instance.name, "Override rule applied");

        if rule.profile_id.is_some() {
            resolution.profile_id = rule.profile_id;
        }
        if rule.root_folder.is_some() {
            resolution.root_folder = rule.root_folder.clone();
        }
        let tags: BTreeSet<i64> = resolution.tags.iter().chain(&rule.tags).copied().collect();
        resolution.tags = tags.into_iter().collect();
        resolution.rule_id = Some(rule.id);
        Ok(resolution)
    }
}

/// Highest specificity among matching rules for the instance; lower ID on ties.
fn select_rule<'a>(
    rules: &'a [OverrideRule],
    query: &OverrideQuery,
    instance_id: i64,
    anime: bool,
) -> Option<&'a OverrideRule> {
    let route = &query.route;
    rules
        .iter()
        .filter(|r| r.service_id(route.service_type) == Some(instance_id))
        .filter(|r| !anime || r.conditions.keywords.contains(&ANIME_KEYWORD_ID))
        .filter(|r| {
            r.conditions.matches(
                route.user_id,
                &route.genres,
                route.language.as_deref(),
                &route.keywords,
            )
        })
        .fold(None, |best: Option<&OverrideRule>, rule| match best {
            Some(b) if b.conditions.specificity() > rule.conditions.specificity() => Some(b),
            Some(b)
                if b.conditions.specificity() == rule.conditions.specificity() && b.id < rule.id =>
            {
                Some(b)
            }
            _ => Some(rule),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{NewOverrideRule, RouteQuery, SqliteRuleStore};
    use crate::testing::fixtures;

    fn settings() -> ServiceSettings {
        let mut sonarr = fixtures::instance(1, "Sonarr", true, false);
        sonarr.active_anime_profile_id = Some(8);
        sonarr.active_anime_directory = Some("/media/anime".to_string());
        sonarr.anime_tags = vec![20];
        ServiceSettings {
            radarr: vec![fixtures::instance(1, "Radarr", true, false)],
            sonarr: vec![sonarr],
            ..Default::default()
        }
    }

    fn evaluator(rules: Vec<NewOverrideRule>) -> OverrideEvaluator {
        let store = SqliteRuleStore::in_memory().unwrap();
        for rule in rules {
            store.create_override_rule(rule).unwrap();
        }
        OverrideEvaluator::new(Arc::new(store), settings())
    }

    fn movie_query() -> OverrideQuery {
        OverrideQuery {
            route: RouteQuery::new(ServiceType::Radarr, false)
                .with_genres(vec![16, 28])
                .with_language("ja"),
            is_anime: false,
        }
    }

    #[test]
    fn test_most_specific_rule_wins() {
        let evaluator = evaluator(vec![
            NewOverrideRule {
                radarr_service_id: Some(1),
                genre: Some("16".to_string()),
                root_folder: Some("/genre".to_string()),
                tags: vec![1],
                ..Default::default()
            },
            NewOverrideRule {
                radarr_service_id: Some(1),
                genre: Some("16".to_string()),
                language: Some("ja".to_string()),
                root_folder: Some("/genre-lang".to_string()),
                tags: vec![5, 1],
                ..Default::default()
            },
        ]);

        let resolution = evaluator.override_rules(&movie_query()).unwrap();
        assert_eq!(resolution.rule_id, Some(2));
        assert_eq!(resolution.root_folder.as_deref(), Some("/genre-lang"));
        assert_eq!(resolution.profile_id, Some(1));
        assert_eq!(resolution.tags, vec![1, 5]);
    }

    #[test]
    fn test_ties_pick_lower_id() {
        let evaluator = evaluator(vec![
            NewOverrideRule {
                radarr_service_id: Some(1),
                genre: Some("16".to_string()),
                root_folder: Some("/first".to_string()),
                ..Default::default()
            },
            NewOverrideRule {
                radarr_service_id: Some(1),
                language: Some("ja".to_string()),
                root_folder: Some("/second".to_string()),
                ..Default::default()
            },
        ]);
        let resolution = evaluator.override_rules(&movie_query()).unwrap();
        assert_eq!(resolution.root_folder.as_deref(), Some("/first"));
    }

    #[test]
    fn test_rules_for_other_instances_ignored() {
        let evaluator = evaluator(vec![NewOverrideRule {
            radarr_service_id: Some(2),
            genre: Some("16".to_string()),
            root_folder: Some("/elsewhere".to_string()),
            ..Default::default()
        }]);
        let resolution = evaluator.override_rules(&movie_query()).unwrap();
        assert_eq!(resolution.rule_id, None);
        assert_eq!(resolution.root_folder.as_deref(), Some("/media/radarr"));
    }

    #[test]
    fn test_anime_defaults_and_keyword_requirement() {
        let evaluator = evaluator(vec![
            NewOverrideRule {
                sonarr_service_id: Some(1),
                genre: Some("16".to_string()),
                root_folder: Some("/cartoons".to_string()),
                ..Default::default()
            },
            NewOverrideRule {
                sonarr_service_id: Some(1),
                keywords: Some("210024".to_string()),
                tags: vec![30],
                ..Default::default()
            },
        ]);

        let query = OverrideQuery {
            route: RouteQuery::new(ServiceType::Sonarr, false)
                .with_genres(vec![16])
                .with_keywords(vec![ANIME_KEYWORD_ID]),
            is_anime: true,
        };
        let resolution = evaluator.override_rules(&query).unwrap();
        assert_eq!(resolution.rule_id, Some(2));
        assert_eq!(resolution.series_type, Some(SeriesType::Anime));
        assert_eq!(resolution.profile_id, Some(8));
        assert_eq!(resolution.root_folder.as_deref(), Some("/media/anime"));
        assert_eq!(resolution.tags, vec![20, 30]);
    }

    #[test]
    fn test_missing_default_instance() {
        let evaluator = evaluator(vec![]);
        let query = OverrideQuery {
            route: RouteQuery::new(ServiceType::Radarr, true),
            is_anime: false,
        };
        assert!(matches!(
            evaluator.override_rules(&query),
            Err(RoutingError::NoDefaultInstanceConfigured { is_4k: true, .. })
        ));
    }
}
