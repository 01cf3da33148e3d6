use serde::Deserialize;

/// Which blob store implementation to use.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Filesystem,
}

/// App-level blob storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageAppConfig {
    /// Backend to use. Default: "filesystem".
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Maximum size of a single object in bytes. Default: 32 MiB.
    #[serde(default = "default_max_blob_size")]
    pub max_blob_size: u64,
    /// Lifetime of presigned read URLs in seconds. Default: 3600.
    #[serde(default = "default_presign_expiry_secs")]
    pub presign_expiry_secs: u64,
    #[serde(default)]
    pub s3: S3Config,
    #[serde(default)]
    pub filesystem: FilesystemConfig,
}

/// S3-compatible object storage settings.
#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    /// Bucket name. Default: "images".
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Region name. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint (MinIO etc.). When unset, `region` must be an AWS region.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Use path-style addressing (`endpoint/bucket/key`). Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

/// Local filesystem storage settings.
#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemConfig {
    /// Root directory for stored objects. Default: "./data/blobs".
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Public base URL the directory is served under. Default: "http://127.0.0.1:3000/media".
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Filesystem
}
fn default_max_blob_size() -> u64 {
    32 * 1024 * 1024
}
fn default_presign_expiry_secs() -> u64 {
    3600
}
fn default_bucket() -> String {
    "images".into()
}
fn default_region() -> String {
    "us-east-1".into()
}
fn default_path_style() -> bool {
    true
}
fn default_base_path() -> String {
    "./data/blobs".into()
}
fn default_public_url() -> String {
    "http://127.0.0.1:3000/media".into()
}

impl Default for StorageAppConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            max_blob_size: default_max_blob_size(),
            presign_expiry_secs: default_presign_expiry_secs(),
            s3: S3Config::default(),
            filesystem: FilesystemConfig::default(),
        }
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            path_style: default_path_style(),
        }
    }
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            public_url: default_public_url(),
        }
    }
}
