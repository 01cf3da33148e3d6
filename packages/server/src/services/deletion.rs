use common::storage::BlobStore;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, TransactionTrait,
};
use tracing::{info, warn};

use crate::entity::{detected_sub_image, recognition_task, uploaded_file};
use crate::error::AppError;

/// Deletes a task's detections and their files.
///
/// Returns the object keys of the removed files; the caller deletes the
/// blobs once the surrounding transaction has committed.
pub async fn remove_detections<C: ConnectionTrait>(
    conn: &C,
    task_id: i32,
) -> Result<Vec<String>, DbErr> {
    let file_ids: Vec<i32> = detected_sub_image::Entity::find()
        .filter(detected_sub_image::Column::TaskId.eq(task_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|d| d.file_id)
        .collect();

    if file_ids.is_empty() {
        return Ok(Vec::new());
    }

    detected_sub_image::Entity::delete_many()
        .filter(detected_sub_image::Column::TaskId.eq(task_id))
        .exec(conn)
        .await?;

    let keys = uploaded_file::Entity::find()
        .filter(uploaded_file::Column::Id.is_in(file_ids.clone()))
        .all(conn)
        .await?
        .into_iter()
        .map(|f| f.file_path)
        .collect();

    uploaded_file::Entity::delete_many()
        .filter(uploaded_file::Column::Id.is_in(file_ids))
        .exec(conn)
        .await?;

    Ok(keys)
}

/// Deletes blobs, logging failures instead of returning them.
pub async fn delete_blobs_best_effort(store: &dyn BlobStore, keys: &[String]) {
    for key in keys {
        match store.delete(key).await {
            Ok(true) => {}
            Ok(false) => warn!(key = %key, "Blob was already absent"),
            Err(e) => warn!(key = %key, error = %e, "Failed to delete blob"),
        }
    }
}

/// Deletes a task owned by `user_id` together with everything it owns.
///
/// The primary file is removed as well unless another task still references it.
pub async fn delete_task(
    db: &DatabaseConnection,
    store: &dyn BlobStore,
    user_id: i32,
    task_id: i32,
) -> Result<(), AppError> {
    let txn = db.begin().await?;

    let task = recognition_task::Entity::find_by_id(task_id)
        .filter(recognition_task::Column::UserId.eq(user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    let mut keys = remove_detections(&txn, task.id).await?;

    recognition_task::Entity::delete_by_id(task.id)
        .exec(&txn)
        .await?;

    let still_referenced = recognition_task::Entity::find()
        .filter(recognition_task::Column::FileId.eq(task.file_id))
        .count(&txn)
        .await?;
    if still_referenced == 0
        && let Some(file) = uploaded_file::Entity::find_by_id(task.file_id)
            .one(&txn)
            .await?
    {
        uploaded_file::Entity::delete_by_id(file.id)
            .exec(&txn)
            .await?;
        keys.push(file.file_path);
    }

    txn.commit().await?;

    info!(task_id, removed_files = keys.len(), "Deleted recognition task");
    delete_blobs_best_effort(store, &keys).await;

    Ok(())
}
