use chrono::Utc;
use common::TaskStatus;
use common::storage::BlobStore;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use tracing::info;

use crate::clients::recognition::DispatchJob;
use crate::entity::{recognition_task, uploaded_file};
use crate::error::AppError;
use crate::services::deletion::{delete_blobs_best_effort, remove_detections};

/// Resets a task owned by `user_id` to `processing`.
///
/// Detections are removed, and coordinates or address written by an earlier
/// callback are cleared so the next result can fill them again. Values given
/// at submission are kept. Returns the job to re-dispatch.
pub async fn reset_task(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    user_id: i32,
    task_id: i32,
) -> Result<DispatchJob, AppError> {
    let txn = db.begin().await?;

    let task = recognition_task::Entity::find_by_id(task_id)
        .filter(recognition_task::Column::UserId.eq(user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    let file = uploaded_file::Entity::find_by_id(task.file_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal(format!("File {} of task {task_id} is missing", task.file_id)))?;

    let removed = remove_detections(&txn, task.id).await?;

    let clear_coordinates = task.coordinates_recognized;
    let clear_address = task.address_recognized;
    let mut active = task.into_active_model();
    active.status = Set(TaskStatus::Processing);
    active.error_reason = Set(None);
    active.updated_at = Set(Utc::now());
    if clear_coordinates {
        active.lat = Set(None);
        active.lon = Set(None);
        active.coordinates_recognized = Set(false);
    }
    if clear_address {
        active.address = Set(None);
        active.address_recognized = Set(false);
    }
    let task = active.update(&txn).await?;

    txn.commit().await?;

    info!(
        task_id,
        removed_detections = removed.len(),
        "Reset recognition task for retry"
    );
    delete_blobs_best_effort(store, &removed).await;

    Ok(DispatchJob {
        task_id: task.id.to_string(),
        image_path: file.file_path,
        height: task.height,
        angle: task.angle,
    })
}
