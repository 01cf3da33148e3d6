use std::time::Duration;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tracing::debug;

use super::error::StorageError;
use super::key::validate_key;
use super::traits::BlobStore;
use crate::config::S3Config;

/// S3-compatible blob store (AWS, MinIO, Ceph RGW, ...).
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    max_size: u64,
}

impl S3BlobStore {
    pub fn new(config: &S3Config, max_size: u64) -> Result<Self, StorageError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.trim_end_matches('/').to_string(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Backend(format!("invalid region: {e}")))?,
        };

        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket, max_size })
    }
}

fn check_status(operation: &str, key: &str, code: u16) -> Result<(), StorageError> {
    if (200..300).contains(&code) {
        Ok(())
    } else {
        Err(StorageError::Backend(format!(
            "{operation} '{key}' returned HTTP {code}"
        )))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let key = validate_key(key)?;
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        debug!(key, size = data.len(), "Uploading object");
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        check_status("put", key, response.status_code())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let key = validate_key(key)?;
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        match response.status_code() {
            404 => Ok(false),
            code => check_status("delete", key, code).map(|()| true),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.bucket.url(), key)
    }

    async fn presigned_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let key = validate_key(key)?;
        let expiry_secs = u32::try_from(expires_in.as_secs()).unwrap_or(u32::MAX);
        self.bucket
            .presign_get(key, expiry_secs, None)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}
