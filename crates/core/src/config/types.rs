use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Radarr instances.
    #[serde(default)]
    pub radarr: Vec<ServiceInstance>,
    /// Sonarr instances.
    #[serde(default)]
    pub sonarr: Vec<ServiceInstance>,
    /// Readarr instances.
    #[serde(default)]
    pub readarr: Vec<ServiceInstance>,
    /// Optional Jellyfin media server.
    #[serde(default)]
    pub jellyfin: Option<JellyfinConfig>,
}

impl Config {
    /// Snapshot of the configured download-automation instances.
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            radarr: self.radarr.clone(),
            sonarr: self.sonarr.clone(),
            readarr: self.readarr.clone(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8282
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("requestarr.db")
}

/// Scan session tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Items processed per bundle.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between bundles (milliseconds).
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay(),
        }
    }
}

fn default_batch_size() -> usize {
    20
}

fn default_batch_delay() -> u64 {
    3000 // 3 seconds
}

/// Periodic scan scheduling.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// When disabled, scans only run on demand.
    #[serde(default)]
    pub enabled: bool,
    /// Delay before the first scan after startup (seconds).
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,
    #[serde(default = "default_arr_interval")]
    pub radarr_interval_secs: u64,
    #[serde(default = "default_arr_interval")]
    pub sonarr_interval_secs: u64,
    #[serde(default = "default_arr_interval")]
    pub readarr_interval_secs: u64,
    #[serde(default = "default_media_server_interval")]
    pub jellyfin_interval_secs: u64,
}

impl SchedulerConfig {
    /// Interval for a scanner by its service name.
    pub fn interval_for(&self, service: &str) -> Option<u64> {
        match service {
            "radarr" => Some(self.radarr_interval_secs),
            "sonarr" => Some(self.sonarr_interval_secs),
            "readarr" => Some(self.readarr_interval_secs),
            "jellyfin" => Some(self.jellyfin_interval_secs),
            _ => None,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay_secs: default_initial_delay(),
            radarr_interval_secs: default_arr_interval(),
            sonarr_interval_secs: default_arr_interval(),
            readarr_interval_secs: default_arr_interval(),
            jellyfin_interval_secs: default_media_server_interval(),
        }
    }
}

fn default_initial_delay() -> u64 {
    30
}

fn default_arr_interval() -> u64 {
    300 // 5 minutes
}

fn default_media_server_interval() -> u64 {
    3600
}

/// Which resolver handles new requests.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Prioritized routing rules.
    #[default]
    Rules,
    /// Legacy per-instance override rules.
    Overrides,
}

/// Routing configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub mode: RoutingMode,
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
    /// Log every notification event at info level.
    #[serde(default = "default_true")]
    pub log_events: bool,
    /// Optional webhook receiving JSON events.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Channel buffer between the engine and the dispatcher.
    #[serde(default = "default_notification_buffer")]
    pub buffer_size: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            log_events: true,
            webhook_url: None,
            buffer_size: default_notification_buffer(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_notification_buffer() -> usize {
    256
}

/// Kind of download-automation service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Radarr,
    Sonarr,
    Readarr,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Radarr => "radarr",
            ServiceType::Sonarr => "sonarr",
            ServiceType::Readarr => "readarr",
        }
    }

    /// Human readable product name, used in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceType::Radarr => "Radarr",
            ServiceType::Sonarr => "Sonarr",
            ServiceType::Readarr => "Readarr",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "radarr" => Some(ServiceType::Radarr),
            "sonarr" => Some(ServiceType::Sonarr),
            "readarr" => Some(ServiceType::Readarr),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sonarr series type applied when a series is added.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeriesType {
    Standard,
    Daily,
    Anime,
}

impl SeriesType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesType::Standard => "standard",
            SeriesType::Daily => "daily",
            SeriesType::Anime => "anime",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(SeriesType::Standard),
            "daily" => Some(SeriesType::Daily),
            "anime" => Some(SeriesType::Anime),
            _ => None,
        }
    }
}

/// One configured deployment of a Radarr/Sonarr/Readarr server.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServiceInstance {
    /// Stable instance ID, referenced by rules and requests.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Base URL (e.g., "http://localhost:7878").
    pub url: String,
    /// API key sent as `X-Api-Key`.
    pub api_key: String,
    /// Default instance for its service type and track.
    #[serde(default)]
    pub is_default: bool,
    /// Serves the 4K / alternate track.
    #[serde(default)]
    pub is_4k: bool,
    /// Include this instance in scans.
    #[serde(default = "default_true")]
    pub sync_enabled: bool,
    #[serde(default)]
    pub active_profile_id: Option<i64>,
    #[serde(default)]
    pub active_directory: Option<String>,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub minimum_availability: Option<String>,
    #[serde(default)]
    pub series_type: Option<SeriesType>,
    /// Anime defaults (Sonarr only).
    #[serde(default)]
    pub active_anime_profile_id: Option<i64>,
    #[serde(default)]
    pub active_anime_directory: Option<String>,
    #[serde(default)]
    pub anime_tags: Vec<i64>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Settings view over all configured instances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceSettings {
    pub radarr: Vec<ServiceInstance>,
    pub sonarr: Vec<ServiceInstance>,
    pub readarr: Vec<ServiceInstance>,
}

impl ServiceSettings {
    /// All instances of one service type.
    pub fn instances(&self, service_type: ServiceType) -> &[ServiceInstance] {
        match service_type {
            ServiceType::Radarr => &self.radarr,
            ServiceType::Sonarr => &self.sonarr,
            ServiceType::Readarr => &self.readarr,
        }
    }

    /// The default instance for a service type and track.
    pub fn default_instance(
        &self,
        service_type: ServiceType,
        is_4k: bool,
    ) -> Option<&ServiceInstance> {
        self.instances(service_type)
            .iter()
            .find(|i| i.is_default && i.is_4k == is_4k)
    }

    /// Look up an instance by ID.
    pub fn instance(&self, service_type: ServiceType, id: i64) -> Option<&ServiceInstance> {
        self.instances(service_type).iter().find(|i| i.id == id)
    }
}

/// Jellyfin media server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JellyfinConfig {
    /// Jellyfin server URL (e.g., "http://localhost:8096")
    pub url: String,
    /// Jellyfin API key
    pub api_key: String,
    /// User whose library view is scanned.
    pub user_id: String,
    #[serde(default = "default_true")]
    pub sync_enabled: bool,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub scheduler: SchedulerConfig,
    pub routing: RoutingConfig,
    pub notifications: SanitizedNotificationsConfig,
    pub radarr: Vec<SanitizedServiceInstance>,
    pub sonarr: Vec<SanitizedServiceInstance>,
    pub readarr: Vec<SanitizedServiceInstance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jellyfin: Option<SanitizedJellyfinConfig>,
}

/// Sanitized instance (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServiceInstance {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub api_key_configured: bool,
    pub is_default: bool,
    pub is_4k: bool,
    pub sync_enabled: bool,
}

/// Sanitized Jellyfin config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedJellyfinConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub sync_enabled: bool,
}

/// Sanitized notifications config (webhook URL may carry tokens)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotificationsConfig {
    pub log_events: bool,
    pub webhook_configured: bool,
}

impl From<&ServiceInstance> for SanitizedServiceInstance {
    fn from(instance: &ServiceInstance) -> Self {
        Self {
            id: instance.id,
            name: instance.name.clone(),
            url: instance.url.clone(),
            api_key_configured: !instance.api_key.is_empty(),
            is_default: instance.is_default,
            is_4k: instance.is_4k,
            sync_enabled: instance.sync_enabled,
        }
    }
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let sanitize = |instances: &[ServiceInstance]| {
            instances
                .iter()
                .map(SanitizedServiceInstance::from)
                .collect::<Vec<_>>()
        };

        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            sync: config.sync.clone(),
            scheduler: config.scheduler.clone(),
            routing: config.routing.clone(),
            notifications: SanitizedNotificationsConfig {
                log_events: config.notifications.log_events,
                webhook_configured: config.notifications.webhook_url.is_some(),
            },
            radarr: sanitize(&config.radarr),
            sonarr: sanitize(&config.sonarr),
            readarr: sanitize(&config.readarr),
            jellyfin: config.jellyfin.as_ref().map(|j| SanitizedJellyfinConfig {
                url: j.url.clone(),
                api_key_configured: !j.api_key.is_empty(),
                sync_enabled: j.sync_enabled,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: i64, is_default: bool, is_4k: bool) -> ServiceInstance {
        ServiceInstance {
            id,
            name: format!("instance-{}", id),
            url: "http://localhost:8989".to_string(),
            api_key: "secret".to_string(),
            is_default,
            is_4k,
            sync_enabled: true,
            active_profile_id: Some(1),
            active_directory: Some("/tv".to_string()),
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
    fn test_deserialize_with_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8282);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "requestarr.db");
        assert_eq!(config.sync.batch_size, 20);
        assert_eq!(config.sync.batch_delay_ms, 3000);
        assert_eq!(config.routing.mode, RoutingMode::Rules);
        assert!(!config.scheduler.enabled);
        assert!(config.radarr.is_empty());
        assert!(config.jellyfin.is_none());
    }

    #[test]
    fn test_deserialize_instances() {
        let toml = r#"
[routing]
mode = "overrides"

[[sonarr]]
id = 1
name = "Sonarr"
url = "http://localhost:8989"
api_key = "abc"
is_default = true
series_type = "anime"

[[sonarr]]
id = 2
name = "Sonarr 4K"
url = "http://localhost:8990"
api_key = "def"
is_default = true
is_4k = true
sync_enabled = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.routing.mode, RoutingMode::Overrides);
        assert_eq!(config.sonarr.len(), 2);
        assert_eq!(config.sonarr[0].series_type, Some(SeriesType::Anime));
        assert!(config.sonarr[0].sync_enabled);
        assert!(!config.sonarr[1].sync_enabled);
        assert_eq!(config.sonarr[1].timeout_secs, 30);
    }

    #[test]
    fn test_default_instance_lookup_respects_track() {
        let settings = ServiceSettings {
            radarr: vec![instance(1, false, false), instance(2, true, false), instance(3, true, true)],
            ..Default::default()
        };
        assert_eq!(
            settings.default_instance(ServiceType::Radarr, false).map(|i| i.id),
            Some(2)
        );
        assert_eq!(
            settings.default_instance(ServiceType::Radarr, true).map(|i| i.id),
            Some(3)
        );
        assert!(settings.default_instance(ServiceType::Sonarr, false).is_none());
        assert_eq!(settings.instance(ServiceType::Radarr, 1).map(|i| i.id), Some(1));
    }

    #[test]
    fn test_sanitized_config_hides_keys() {
        let config = Config {
            radarr: vec![instance(1, true, false)],
            jellyfin: Some(JellyfinConfig {
                url: "http://localhost:8096".to_string(),
                api_key: String::new(),
                user_id: "user".to_string(),
                sync_enabled: true,
                timeout_secs: 30,
            }),
            ..Default::default()
        };
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.radarr[0].api_key_configured);
        assert!(!sanitized.jellyfin.as_ref().unwrap().api_key_configured);
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_service_type_parse() {
        assert_eq!(ServiceType::parse("Sonarr"), Some(ServiceType::Sonarr));
        assert_eq!(ServiceType::parse("lidarr"), None);
        assert_eq!(ServiceType::Readarr.to_string(), "readarr");
    }
}
