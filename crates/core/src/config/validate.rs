use std::collections::HashSet;

use super::{types::Config, ConfigError, ServiceType};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Batch size is positive
/// - Instance IDs are unique within a service type and URLs are set
/// - At most one default instance per service type and track
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.sync.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "sync.batch_size must be greater than 0".to_string(),
        ));
    }

    let settings = config.service_settings();
    for service_type in [ServiceType::Radarr, ServiceType::Sonarr, ServiceType::Readarr] {
        let instances = settings.instances(service_type);

        let mut ids = HashSet::new();
        for instance in instances {
            if !ids.insert(instance.id) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate {} instance id {}",
                    service_type, instance.id
                )));
            }
            if instance.url.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{} instance '{}' has an empty url",
                    service_type, instance.name
                )));
            }
        }

        for is_4k in [false, true] {
            let defaults = instances
                .iter()
                .filter(|i| i.is_default && i.is_4k == is_4k)
                .count();
            if defaults > 1 {
                return Err(ConfigError::ValidationError(format!(
                    "more than one default {} {}instance configured",
                    service_type,
                    if is_4k { "4K " } else { "" }
                )));
            }
        }
    }

    if let Some(jellyfin) = &config.jellyfin {
        if jellyfin.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "jellyfin.url cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfig, ServiceInstance};

    fn instance(id: i64, is_default: bool, is_4k: bool) -> ServiceInstance {
        ServiceInstance {
            id,
            name: format!("radarr-{}", id),
            url: "http://localhost:7878".to_string(),
            api_key: "key".to_string(),
            is_default,
            is_4k,
            sync_enabled: true,
            active_profile_id: None,
            active_directory: None,
            tags: vec![],
            minimum_availability: None,
            series_type: None,
            active_anime_profile_id: None,
            active_anime_directory: None,
            anime_tags: vec![],
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config {
            radarr: vec![instance(1, true, false), instance(2, true, true)],
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_duplicate_ids_fails() {
        let config = Config {
            radarr: vec![instance(1, true, false), instance(1, false, false)],
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate radarr instance id 1"));
    }

    #[test]
    fn test_validate_two_defaults_same_track_fails() {
        let config = Config {
            radarr: vec![instance(1, true, true), instance(2, true, true)],
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("default radarr 4K instance"));
    }
}
