//! Priority-ordered routing rule resolution.

use std::sync::Arc;

use tracing::debug;

use super::{RouteQuery, RouteResolution, RoutingError, RuleStore};
use crate::config::{ServiceInstance, ServiceSettings};
use crate::metrics::ROUTING_RESOLUTIONS;

/// Picks a target instance and its options from routing rules.
pub struct RoutingResolver {
    rules: Arc<dyn RuleStore>,
    settings: ServiceSettings,
}

/// Instance defaults as a resolution without a rule.
pub(super) fn instance_defaults(instance: &ServiceInstance) -> RouteResolution {
    RouteResolution {
        service_id: instance.id,
        profile_id: instance.active_profile_id,
        root_folder: instance.active_directory.clone(),
        series_type: instance.series_type,
        tags: instance.tags.clone(),
        minimum_availability: instance.minimum_availability.clone(),
        rule_id: None,
    }
}

impl RoutingResolver {
    pub fn new(rules: Arc<dyn RuleStore>, settings: ServiceSettings) -> Self {
        Self { rules, settings }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Resolve where a request goes.
    ///
    /// Rules for the query's service type and track run by descending
    /// priority, lower ID first on ties; the first match wins. Without a
    /// match the default instance is used.
    pub fn resolve_route(&self, query: &RouteQuery) -> Result<RouteResolution, RoutingError> {
        let result = self.resolve(query);
        let outcome = match &result {
            Ok(resolution) if resolution.rule_id.is_some() => "rule",
            Ok(_) => "default",
            Err(_) => "error",
        };
        ROUTING_RESOLUTIONS
            .with_label_values(&["rules", outcome])
            .inc();
        result
    }

    fn resolve(&self, query: &RouteQuery) -> Result<RouteResolution, RoutingError> {
        let mut rules: Vec<_> = self
            .rules
            .list_routing_rules()?
            .into_iter()
            .filter(|r| r.service_type == query.service_type && r.is_4k == query.is_4k)
            .collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

        if let Some(rule) = rules.iter().find(|r| r.matches(query)) {
            let instance = self
                .settings
                .instance(query.service_type, rule.target_service_id)
                .ok_or(RoutingError::UnknownTargetInstance {
                    rule_id: rule.id,
                    service_type: query.service_type,
                    service_id: rule.target_service_id,
                })?;

            debug!(rule_id = rule.id, rule = %rule.name, instance = %instance.name, "Routing rule matched");

            let defaults = instance_defaults(instance);
            return Ok(RouteResolution {
                service_id: instance.id,
                profile_id: rule.active_profile_id.or(defaults.profile_id),
                root_folder: rule.root_folder.clone().or(defaults.root_folder),
                series_type: rule.series_type.or(defaults.series_type),
                tags: if rule.tags.is_empty() {
                    defaults.tags
                } else {
                    rule.tags.clone()
                },
                minimum_availability: rule
                    .minimum_availability
                    .clone()
                    .or(defaults.minimum_availability),
                rule_id: Some(rule.id),
            });
        }

        let instance = self
            .settings
            .default_instance(query.service_type, query.is_4k)
            .ok_or(RoutingError::NoDefaultInstanceConfigured {
                service_type: query.service_type,
                is_4k: query.is_4k,
            })?;
        debug!(instance = %instance.name, "No routing rule matched, using default instance");
        Ok(instance_defaults(instance))
    }
}
