use chrono::Utc;
use common::TaskStatus;
use common::storage::{BlobStore, generate_key};
use futures::future::join_all;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set, TransactionTrait};
use tracing::{info, warn};

use crate::clients::geocoding::{Geocoder, forward_best_effort, reverse_best_effort};
use crate::clients::recognition::DispatchJob;
use crate::config::UploadConfig;
use crate::entity::{recognition_task, uploaded_file};
use crate::error::AppError;
use crate::models::upload::UploadItem;
use crate::services::deletion::delete_blobs_best_effort;
use crate::utils::geo::Coordinates;

/// Location of an item after geocoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub coordinates: Option<Coordinates>,
    pub address: Option<String>,
}

/// Fills whichever half of (address, coordinates) is missing.
///
/// Nothing is looked up when both or neither are present.
pub async fn resolve_location(geocoder: &dyn Geocoder, item: &UploadItem) -> ResolvedLocation {
    match (&item.address, item.coordinates) {
        (Some(address), None) => ResolvedLocation {
            coordinates: forward_best_effort(geocoder, address).await,
            address: Some(address.clone()),
        },
        (None, Some(point)) => ResolvedLocation {
            coordinates: Some(point),
            address: reverse_best_effort(geocoder, point).await,
        },
        (address, coordinates) => ResolvedLocation {
            coordinates,
            address: address.clone(),
        },
    }
}

struct StoredBlob {
    key: String,
    url: String,
    original_name: String,
}

/// Stores every image and creates one file and one task per item.
///
/// Either every item is persisted or nothing is: a blob failure deletes the
/// blobs stored so far, a database failure rolls back and deletes all blobs.
/// Returns the jobs to hand to the recognition service.
pub async fn create_tasks(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    geocoder: &dyn Geocoder,
    defaults: &UploadConfig,
    user_id: i32,
    items: Vec<UploadItem>,
) -> Result<Vec<DispatchJob>, AppError> {
    let locations = join_all(items.iter().map(|item| resolve_location(geocoder, item))).await;

    let mut stored: Vec<StoredBlob> = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let original_name = item.image.original_name().to_string();
        let key = generate_key(None, &original_name);
        if let Err(e) = store
            .put(&key, &item.image.bytes, &item.image.resolved_content_type())
            .await
        {
            warn!(index, key = %key, error = %e, "Blob upload failed, rolling back batch");
            let keys: Vec<String> = stored.into_iter().map(|b| b.key).collect();
            delete_blobs_best_effort(store, &keys).await;
            return Err(e.into());
        }
        stored.push(StoredBlob {
            url: store.object_url(&key),
            key,
            original_name,
        });
    }

    match insert_rows(db, defaults, user_id, &items, &locations, &stored).await {
        Ok(jobs) => {
            info!(user_id, count = jobs.len(), "Created recognition tasks");
            Ok(jobs)
        }
        Err(e) => {
            let keys: Vec<String> = stored.into_iter().map(|b| b.key).collect();
            delete_blobs_best_effort(store, &keys).await;
            Err(e.into())
        }
    }
}

async fn insert_rows(
    db: &DatabaseConnection,
    defaults: &UploadConfig,
    user_id: i32,
    items: &[UploadItem],
    locations: &[ResolvedLocation],
    stored: &[StoredBlob],
) -> Result<Vec<DispatchJob>, DbErr> {
    let txn = db.begin().await?;
    let now = Utc::now();
    let mut jobs = Vec::with_capacity(items.len());

    for ((item, location), blob) in items.iter().zip(locations).zip(stored) {
        let file = uploaded_file::ActiveModel {
            filename: Set(blob.key.clone()),
            original_filename: Set(Some(blob.original_name.clone())),
            file_path: Set(blob.key.clone()),
            storage_url: Set(blob.url.clone()),
            user_id: Set(user_id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let height = item.height.unwrap_or(defaults.default_height);
        let angle = item.angle.unwrap_or(defaults.default_angle);

        let task = recognition_task::ActiveModel {
            user_id: Set(user_id),
            file_id: Set(file.id),
            status: Set(TaskStatus::Processing),
            lat: Set(location.coordinates.map(|c| c.lat)),
            lon: Set(location.coordinates.map(|c| c.lon)),
            address: Set(location.address.clone()),
            height: Set(Some(height)),
            angle: Set(Some(angle)),
            error_reason: Set(None),
            coordinates_recognized: Set(false),
            address_recognized: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        jobs.push(DispatchJob {
            task_id: task.id.to_string(),
            image_path: file.file_path,
            height: Some(height),
            angle: Some(angle),
        });
    }

    // Dropping an uncommitted transaction rolls it back.
    txn.commit().await?;
    Ok(jobs)
}
