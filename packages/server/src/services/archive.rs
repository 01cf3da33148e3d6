use std::io::Cursor;

use axum::body::Bytes;
use chrono::Utc;
use common::storage::{BlobStore, generate_key};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::{info, warn};

use crate::entity::upload_archive;
use crate::error::AppError;
use crate::models::archive::{ArchiveResponse, ArchiveUploadForm};
use crate::services::deletion::delete_blobs_best_effort;

const ARCHIVE_PREFIX: &str = "archives";

/// Archive bytes and metadata that passed validation.
pub struct ValidatedArchive {
    pub archive: Bytes,
    pub archive_name: String,
    pub metadata: Option<(Bytes, String)>,
}

/// Checks that `archive` opens as a zip file and `json` parses.
pub fn validate_archive(form: ArchiveUploadForm) -> Result<ValidatedArchive, AppError> {
    let archive_name = form
        .archive
        .metadata
        .file_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "archive.zip".to_string());
    let archive = form.archive.contents;

    if archive.is_empty() {
        return Err(AppError::Validation("Archive file is empty".into()));
    }
    let entries = zip::ZipArchive::new(Cursor::new(archive.as_ref()))
        .map_err(|e| AppError::Validation(format!("Archive is not a valid zip file: {e}")))?
        .len();

    let metadata = match form.json {
        None => None,
        Some(field) if field.contents.is_empty() => None,
        Some(field) => {
            serde_json::from_slice::<serde_json::Value>(&field.contents)
                .map_err(|e| AppError::Validation(format!("Metadata is not valid JSON: {e}")))?;
            let name = field
                .metadata
                .file_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "metadata.json".to_string());
            Some((field.contents, name))
        }
    };

    info!(entries, archive_name = %archive_name, "Validated upload archive");

    Ok(ValidatedArchive {
        archive,
        archive_name,
        metadata,
    })
}

/// Stores the archive (and metadata) and records it for the batch worker.
pub async fn store_archive(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    user_id: i32,
    upload: ValidatedArchive,
) -> Result<ArchiveResponse, AppError> {
    let archive_key = generate_key(Some(ARCHIVE_PREFIX), &upload.archive_name);
    store
        .put(&archive_key, &upload.archive, "application/zip")
        .await?;
    let mut stored = vec![archive_key.clone()];

    let metadata = match &upload.metadata {
        None => None,
        Some((bytes, name)) => {
            let key = generate_key(Some(ARCHIVE_PREFIX), name);
            if let Err(e) = store.put(&key, bytes, "application/json").await {
                warn!(error = %e, "Metadata upload failed, removing archive");
                delete_blobs_best_effort(store, &stored).await;
                return Err(e.into());
            }
            stored.push(key.clone());
            Some(key)
        }
    };

    let row = upload_archive::ActiveModel {
        user_id: Set(user_id),
        filename: Set(archive_key.clone()),
        original_filename: Set(upload.archive_name),
        storage_url: Set(store.object_url(&archive_key)),
        metadata_storage_url: Set(metadata.as_deref().map(|k| store.object_url(k))),
        metadata_filename: Set(metadata),
        status: Set("pending".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await;

    let row = match row {
        Ok(row) => row,
        Err(e) => {
            delete_blobs_best_effort(store, &stored).await;
            return Err(e.into());
        }
    };

    info!(archive_id = row.id, user_id, "Stored upload archive");

    Ok(ArchiveResponse {
        message: "Archive accepted for processing".into(),
        archive_id: row.id,
    })
}
