use std::time::Duration;

use async_trait::async_trait;

use super::error::StorageError;

/// Key-addressed object storage.
///
/// Keys are opaque strings such as `3f0c..._photo.jpg` or `archives/...zip`.
/// Backends must treat them as flat object names and never resolve them
/// outside their own root.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, replacing any previous object.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Delete the object stored under `key`.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Permanent (non-expiring) URL of the object.
    fn object_url(&self, key: &str) -> String;

    /// Time-limited read URL for the object.
    async fn presigned_url(&self, key: &str, expires_in: Duration)
    -> Result<String, StorageError>;
}
