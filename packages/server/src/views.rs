//! Read models: turn loaded entity graphs into response shapes.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use common::storage::BlobStore;
use futures::future::join_all;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::warn;

use crate::entity::{detected_sub_image, recognition_task, uploaded_file, user};
use crate::error::AppError;
use crate::models::location::{ImageView, MainImageView, TaskView, TrashImageView, UserSummary};
use crate::models::map::DetectionView;
use crate::utils::geo::Coordinates;

/// Preview URLs keyed by object key; `None` where presigning failed.
pub type Previews = HashMap<String, Option<String>>;

/// Presigns every key concurrently.
pub async fn presign_all<'a>(
    store: &dyn BlobStore,
    keys: impl IntoIterator<Item = &'a str>,
    expires_in: Duration,
) -> Previews {
    let keys: Vec<&str> = keys
        .into_iter()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let urls = join_all(keys.iter().map(|key| async move {
        match store.presigned_url(key, expires_in).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to presign preview URL");
                None
            }
        }
    }))
    .await;
    keys.into_iter().map(str::to_string).zip(urls).collect()
}

fn preview(previews: &Previews, key: &str) -> Option<String> {
    previews.get(key).cloned().flatten()
}

pub fn image_view(file: &uploaded_file::Model, previews: &Previews) -> ImageView {
    ImageView {
        id: file.id,
        filename: file.filename.clone(),
        original_filename: file.original_filename.clone(),
        file_path: file.file_path.clone(),
        storage_url: file.storage_url.clone(),
        preview_url: preview(previews, &file.file_path),
        uploaded_at: file.created_at,
    }
}

/// Builds one task view from already loaded rows.
pub fn build_task_view(
    task: &recognition_task::Model,
    owner: &user::Model,
    main_file: &uploaded_file::Model,
    detections: &[(&detected_sub_image::Model, &uploaded_file::Model)],
    previews: &Previews,
) -> TaskView {
    TaskView {
        id: task.id,
        status: task.status,
        created_at: task.created_at,
        user: UserSummary {
            id: owner.id,
            username: owner.username.clone(),
        },
        main_address: task.address.clone(),
        main_coordinates: Coordinates::from_pair(task.lat, task.lon),
        height: task.height,
        angle: task.angle,
        error_reason: task.error_reason.clone(),
        main_image: MainImageView {
            id: main_file.id,
            filename: main_file.filename.clone(),
            file_path: main_file.file_path.clone(),
            preview_url: preview(previews, &main_file.file_path),
        },
        trash_images: detections
            .iter()
            .map(|(detection, file)| TrashImageView {
                id: detection.id,
                image: image_view(file, previews),
                lat: detection.lat,
                lon: detection.lon,
            })
            .collect(),
    }
}

pub fn build_detection_view(
    detection: &detected_sub_image::Model,
    file: &uploaded_file::Model,
    previews: &Previews,
) -> DetectionView {
    DetectionView {
        id: detection.id,
        image: image_view(file, previews),
        image_location_id: detection.task_id,
        lat: detection.lat,
        lon: detection.lon,
        created_at: detection.created_at,
        address: detection.address.clone(),
    }
}

async fn load_files<C: ConnectionTrait>(
    conn: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, uploaded_file::Model>, AppError> {
    let ids: Vec<i32> = ids.into_iter().collect::<HashSet<_>>().into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(uploaded_file::Entity::find()
        .filter(uploaded_file::Column::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|f| (f.id, f))
        .collect())
}

fn missing_file(file_id: i32) -> AppError {
    AppError::Internal(format!("Uploaded file {file_id} is missing"))
}

/// Loads owners, files and detections for `tasks` in batches and builds their views.
pub async fn task_views<C: ConnectionTrait>(
    conn: &C,
    store: &dyn BlobStore,
    expires_in: Duration,
    tasks: &[recognition_task::Model],
) -> Result<Vec<TaskView>, AppError> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let user_ids: Vec<i32> = tasks
        .iter()
        .map(|t| t.user_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let owners: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let detections = detected_sub_image::Entity::find()
        .filter(detected_sub_image::Column::TaskId.is_in(tasks.iter().map(|t| t.id)))
        .order_by_asc(detected_sub_image::Column::Id)
        .all(conn)
        .await?;

    let files = load_files(
        conn,
        tasks
            .iter()
            .map(|t| t.file_id)
            .chain(detections.iter().map(|d| d.file_id)),
    )
    .await?;

    let previews = presign_all(store, files.values().map(|f| f.file_path.as_str()), expires_in).await;

    let mut by_task: HashMap<i32, Vec<(&detected_sub_image::Model, &uploaded_file::Model)>> =
        HashMap::new();
    for detection in &detections {
        let file = files
            .get(&detection.file_id)
            .ok_or_else(|| missing_file(detection.file_id))?;
        by_task
            .entry(detection.task_id)
            .or_default()
            .push((detection, file));
    }

    tasks
        .iter()
        .map(|task| {
            let owner = owners
                .get(&task.user_id)
                .ok_or_else(|| AppError::Internal(format!("User {} is missing", task.user_id)))?;
            let main_file = files
                .get(&task.file_id)
                .ok_or_else(|| missing_file(task.file_id))?;
            let detections = by_task.get(&task.id).map(Vec::as_slice).unwrap_or(&[]);
            Ok(build_task_view(task, owner, main_file, detections, &previews))
        })
        .collect()
}

/// Loads files for `detections` and builds their views.
pub async fn detection_views<C: ConnectionTrait>(
    conn: &C,
    store: &dyn BlobStore,
    expires_in: Duration,
    detections: &[detected_sub_image::Model],
) -> Result<Vec<DetectionView>, AppError> {
    let files = load_files(conn, detections.iter().map(|d| d.file_id)).await?;
    let previews = presign_all(store, files.values().map(|f| f.file_path.as_str()), expires_in).await;

    detections
        .iter()
        .map(|detection| {
            let file = files
                .get(&detection.file_id)
                .ok_or_else(|| missing_file(detection.file_id))?;
            Ok(build_detection_view(detection, file, &previews))
        })
        .collect()
}
