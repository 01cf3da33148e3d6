use common::config::StorageAppConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used to build recognition callback URLs.
    pub public_url: String,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider.
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocodingConfig {
    /// When false every lookup yields no result. Default: true.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Nominatim-compatible base URL.
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_geocoding_timeout_secs")]
    pub timeout_secs: u64,
    /// Number of memoised lookups kept in memory. Default: 1024.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

/// Which callback the recognition service is asked to call.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Single-location recognition, answered on `/api/update-image-result`.
    Location,
    /// Object detection, answered on `/api/update-image-trash-result`.
    Detection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecognitionConfig {
    #[serde(default = "default_recognition_base_url")]
    pub base_url: String,
    #[serde(default = "default_submit_path")]
    pub submit_path: String,
    #[serde(default = "default_task_kind")]
    pub task_kind: TaskKind,
    /// Status code the service answers with when it accepts a submission. Default: 202.
    #[serde(default = "default_accepted_status")]
    pub accepted_status: u16,
    #[serde(default = "default_recognition_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Camera angle used when an item does not carry one. Default: 0.0.
    #[serde(default = "default_angle")]
    pub default_angle: f64,
    /// Camera height used when an item does not carry one. Default: 2.0.
    #[serde(default = "default_height")]
    pub default_height: f64,
    /// Maximum number of items in one upload request. Default: 50.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    /// Radius used when a query carries coordinates but no `radius_km`. Default: 1.0.
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageAppConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("GEOSIGHT_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.public_url", "http://127.0.0.1:3000")?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://geosight.db?mode=rwc")?
            // Load from config/config.toml (or $GEOSIGHT_CONFIG)
            .add_source(File::with_name(&path).required(false))
            // Override from environment (e.g., GEOSIGHT__AUTH__JWT_SECRET)
            .add_source(
                Environment::with_prefix("GEOSIGHT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}

fn default_max_connections() -> u32 {
    20
}
fn default_true() -> bool {
    true
}
fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".into()
}
fn default_user_agent() -> String {
    concat!("geosight/", env!("CARGO_PKG_VERSION")).into()
}
fn default_geocoding_timeout_secs() -> u64 {
    5
}
fn default_cache_size() -> usize {
    1024
}
fn default_recognition_base_url() -> String {
    "http://127.0.0.1:8080".into()
}
fn default_submit_path() -> String {
    "/api/tasks".into()
}
fn default_task_kind() -> TaskKind {
    TaskKind::Location
}
fn default_accepted_status() -> u16 {
    202
}
fn default_recognition_timeout_secs() -> u64 {
    10
}
fn default_angle() -> f64 {
    0.0
}
fn default_height() -> f64 {
    2.0
}
fn default_max_items() -> usize {
    50
}
fn default_page_size() -> u64 {
    10
}
fn default_max_page_size() -> u64 {
    100
}
fn default_radius_km() -> f64 {
    1.0
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            base_url: default_geocoding_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_geocoding_timeout_secs(),
            cache_size: default_cache_size(),
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            base_url: default_recognition_base_url(),
            submit_path: default_submit_path(),
            task_kind: default_task_kind(),
            accepted_status: default_accepted_status(),
            timeout_secs: default_recognition_timeout_secs(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            default_angle: default_angle(),
            default_height: default_height(),
            max_items: default_max_items(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            default_radius_km: default_radius_km(),
        }
    }
}
