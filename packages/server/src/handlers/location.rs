use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::instrument;

use crate::clients::recognition::spawn_dispatch;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::location::{LocationListQuery, TaskListResponse};
use crate::models::shared::MessageResponse;
use crate::services::{deletion, query, retry};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/user/image-locations",
    tag = "Image Locations",
    operation_id = "listImageLocations",
    summary = "List the caller's recognition tasks",
    description = "Returns the caller's tasks, newest first. `date_after`/`date_before` bound the \
        creation date inclusively (UTC). With `lat` and `lon` only tasks within `radius_km` \
        (default from configuration) are returned; non-numeric coordinates or radius disable \
        that filter. `next`/`previous` are page numbers.",
    params(LocationListQuery),
    responses(
        (status = 200, description = "Paginated tasks", body = TaskListResponse),
        (status = 400, description = "Malformed date (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Page out of range (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_image_locations(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<LocationListQuery>,
) -> Result<Json<TaskListResponse>, AppError> {
    let listing = query::list_tasks(
        &state.db,
        state.blob_store.as_ref(),
        &state.config.query,
        Duration::from_secs(state.config.storage.presign_expiry_secs),
        auth_user.user_id,
        &params,
    )
    .await?;

    Ok(Json(listing))
}

#[utoipa::path(
    delete,
    path = "/image-locations/{id}",
    tag = "Image Locations",
    operation_id = "deleteImageLocation",
    summary = "Delete a task",
    description = "Deletes the task, its detections and their files, and the primary file unless \
        another task references it. Stored blobs are removed afterwards, best-effort.",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Task not found or not owned by the caller (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_image_location(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    deletion::delete_task(&state.db, state.blob_store.as_ref(), auth_user.user_id, id).await?;

    Ok(Json(MessageResponse::new("Task deleted")))
}

#[utoipa::path(
    post,
    path = "/image-locations/{id}/retry",
    tag = "Image Locations",
    operation_id = "retryImageLocation",
    summary = "Retry recognition of a task",
    description = "Removes the task's detections, resets it to `processing`, clears the error and \
        any callback-written location, and submits the image for recognition again.",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task resubmitted", body = MessageResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Task not found or not owned by the caller (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn retry_image_location(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    let job = retry::reset_task(&state.db, state.blob_store.as_ref(), auth_user.user_id, id).await?;
    spawn_dispatch(state.dispatcher.clone(), vec![job]);

    Ok(Json(MessageResponse::new("Task resubmitted for recognition")))
}
