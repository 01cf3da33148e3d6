use std::collections::HashSet;

use chrono::Utc;
use common::TaskStatus;
use common::storage::{BlobStore, validate_key};
use futures::future::join_all;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IntoActiveModel, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, warn};

use crate::clients::geocoding::{Geocoder, reverse_best_effort};
use crate::entity::{detected_sub_image, recognition_task, uploaded_file};
use crate::error::AppError;
use crate::models::callback::{
    DetectionCallback, DetectionCallbackResponse, DetectionReport, ExternalStatus,
    LocationCallback, LocationCallbackResponse, RawDetection, failure_reason,
};
use crate::utils::dedup::detection_key;
use crate::utils::geo::Coordinates;

async fn lock_task(
    txn: &DatabaseTransaction,
    task_id: i32,
) -> Result<recognition_task::Model, AppError> {
    recognition_task::Entity::find_by_id(task_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {task_id} not found")))
}

/// Marks a task failed and returns the `TASK_FAILED` error for the caller.
///
/// A task that is already `done` keeps its status.
async fn record_failure(
    db: &DatabaseConnection,
    task_id: i32,
    reason: String,
) -> Result<AppError, AppError> {
    let txn = db.begin().await?;
    let task = lock_task(&txn, task_id).await?;

    if task.status.accepts_callback_transition(TaskStatus::Failed) {
        let mut active = task.into_active_model();
        active.status = Set(TaskStatus::Failed);
        active.error_reason = Set(Some(reason.clone()));
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        info!(task_id, reason = %reason, "Recognition task failed");
    } else {
        info!(task_id, "Ignoring failure report for completed task");
    }

    txn.commit().await?;
    Ok(AppError::TaskFailed(reason))
}

/// Applies a single-location result.
///
/// Coordinates are written only when the task has none; the address is then
/// reverse-geocoded from whatever coordinates the task ends up with.
pub async fn apply_location_result(
    db: &DatabaseConnection,
    geocoder: &dyn Geocoder,
    callback: LocationCallback,
) -> Result<LocationCallbackResponse, AppError> {
    let task_id = callback.task_id.0;

    let point = match callback.status {
        ExternalStatus::Unknown => {
            return Err(AppError::Validation(
                "Status must be Succeeded or Failed".into(),
            ));
        }
        ExternalStatus::Failed => {
            let reason = failure_reason(
                callback.error_message.as_deref(),
                callback.error_code.as_ref(),
            );
            return Err(record_failure(db, task_id, reason).await?);
        }
        ExternalStatus::Succeeded => {
            let result = callback.result.ok_or_else(|| {
                AppError::Validation("Result is required when Status is Succeeded".into())
            })?;
            Coordinates::new(result.latitude, result.longitude).ok_or_else(|| {
                AppError::Validation("Result coordinates are out of range".into())
            })?
        }
    };

    let txn = db.begin().await?;
    let task = lock_task(&txn, task_id).await?;

    let fill_coordinates = task.lat.is_none() && task.lon.is_none();
    let mut active = task.into_active_model();
    active.status = Set(TaskStatus::Done);
    active.error_reason = Set(None);
    active.updated_at = Set(Utc::now());
    if fill_coordinates {
        active.lat = Set(Some(point.lat));
        active.lon = Set(Some(point.lon));
        active.coordinates_recognized = Set(true);
    }
    let task = active.update(&txn).await?;
    txn.commit().await?;

    info!(
        task_id,
        coordinates_filled = fill_coordinates,
        "Applied recognition result"
    );

    if task.address.is_none()
        && let Some(effective) = Coordinates::from_pair(task.lat, task.lon)
        && let Some(address) = reverse_best_effort(geocoder, effective).await
    {
        // Conditional so a concurrent writer's address is never replaced.
        recognition_task::Entity::update_many()
            .col_expr(recognition_task::Column::Address, Expr::value(address))
            .col_expr(recognition_task::Column::AddressRecognized, Expr::value(true))
            .filter(recognition_task::Column::Id.eq(task_id))
            .filter(recognition_task::Column::Address.is_null())
            .exec(db)
            .await?;
    }

    Ok(LocationCallbackResponse {
        task_id,
        status: TaskStatus::Done,
    })
}

/// Applies a batch of detections to a task.
///
/// Invalid elements are skipped with a warning. Elements already stored by an
/// earlier delivery are recognised by their dedup key and skipped as well.
pub async fn apply_detection_result(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    geocoder: &dyn Geocoder,
    callback: DetectionCallback,
) -> Result<DetectionCallbackResponse, AppError> {
    let task_id = callback.task_id.0;

    if recognition_task::Entity::find_by_id(task_id)
        .one(db)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(format!("Task {task_id} not found")));
    }

    if callback.status != ExternalStatus::Succeeded {
        let reason = failure_reason(
            callback.error_message.as_deref(),
            callback.error_code.as_ref(),
        );
        return Err(record_failure(db, task_id, reason).await?);
    }

    let reports = valid_reports(task_id, callback.result.unwrap_or_default());
    let addresses = join_all(
        reports
            .iter()
            .map(|report| reverse_best_effort(geocoder, report.point)),
    )
    .await;

    let txn = db.begin().await?;
    let task = lock_task(&txn, task_id).await?;

    let keys: Vec<String> = reports
        .iter()
        .map(|r| detection_key(task_id, &r.image_path))
        .collect();
    let already_stored: HashSet<String> = if keys.is_empty() {
        HashSet::new()
    } else {
        detected_sub_image::Entity::find()
            .filter(detected_sub_image::Column::DedupKey.is_in(keys.clone()))
            .all(&txn)
            .await?
            .into_iter()
            .map(|d| d.dedup_key)
            .collect()
    };

    let now = Utc::now();
    let mut processed = 0;
    for ((report, address), key) in reports.into_iter().zip(addresses).zip(keys) {
        if already_stored.contains(&key) {
            info!(task_id, image_path = %report.image_path, "Detection already stored, skipping");
            continue;
        }

        let path_taken = uploaded_file::Entity::find()
            .filter(uploaded_file::Column::Filename.eq(&report.image_path))
            .one(&txn)
            .await?
            .is_some();
        if path_taken {
            warn!(task_id, image_path = %report.image_path, "Image path already registered, skipping detection");
            continue;
        }

        let file = uploaded_file::ActiveModel {
            filename: Set(report.image_path.clone()),
            original_filename: Set(Some(base_name(&report.image_path).to_string())),
            file_path: Set(report.image_path.clone()),
            storage_url: Set(store.object_url(&report.image_path)),
            user_id: Set(task.user_id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        detected_sub_image::ActiveModel {
            task_id: Set(task_id),
            file_id: Set(file.id),
            lat: Set(report.point.lat),
            lon: Set(report.point.lon),
            address: Set(address),
            dedup_key: Set(key),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        processed += 1;
    }

    let mut active = task.into_active_model();
    active.status = Set(TaskStatus::Done);
    active.error_reason = Set(None);
    active.updated_at = Set(now);
    active.update(&txn).await?;

    txn.commit().await?;

    info!(task_id, processed, "Applied detection result");

    Ok(DetectionCallbackResponse {
        status: TaskStatus::Done,
        processed,
    })
}

/// Keeps elements with a usable path and coordinates, first occurrence wins.
fn valid_reports(task_id: i32, raw: Vec<RawDetection>) -> Vec<DetectionReport> {
    let mut seen = HashSet::new();
    raw.iter()
        .enumerate()
        .filter_map(|(index, element)| {
            let Some(report) = element.validate() else {
                warn!(task_id, index, "Skipping detection without path or coordinates");
                return None;
            };
            if let Err(e) = validate_key(&report.image_path) {
                warn!(task_id, index, error = %e, "Skipping detection with unusable path");
                return None;
            }
            seen.insert(report.image_path.clone()).then_some(report)
        })
        .collect()
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
