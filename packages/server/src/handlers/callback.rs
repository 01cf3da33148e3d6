use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::callback::{
    DetectionCallback, DetectionCallbackResponse, LocationCallback, LocationCallbackResponse,
};
use crate::services::callback;
use crate::state::AppState;

// Callback routes are unauthenticated; they are expected to be reachable
// only from the recognition service's network.

#[utoipa::path(
    post,
    path = "/update-image-result",
    tag = "Callbacks",
    operation_id = "updateImageResult",
    summary = "Single-location recognition result",
    description = "Called by the recognition service. On `Succeeded` the task becomes `done` and \
        its coordinates are filled only if still empty; a missing address is then \
        reverse-geocoded. On `Failed` the task becomes `failed` (a `done` task stays `done`) and \
        the call is answered with TASK_FAILED.",
    request_body = LocationCallback,
    responses(
        (status = 200, description = "Result applied", body = LocationCallbackResponse),
        (status = 400, description = "Malformed body (VALIDATION_ERROR) or failed task (TASK_FAILED)", body = ErrorBody),
        (status = 404, description = "Unknown task (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, body), fields(task_id = body.task_id.0))]
pub async fn update_image_result(
    State(state): State<AppState>,
    AppJson(body): AppJson<LocationCallback>,
) -> Result<Json<LocationCallbackResponse>, AppError> {
    let applied =
        callback::apply_location_result(&state.db, state.geocoder.as_ref(), body).await?;
    Ok(Json(applied))
}

#[utoipa::path(
    post,
    path = "/update-image-trash-result",
    tag = "Callbacks",
    operation_id = "updateImageTrashResult",
    summary = "Object-detection result",
    description = "Called by the recognition service. On success one detection (and file record \
        pointing at the already stored crop) is created per valid element; invalid elements and \
        elements already stored by an earlier delivery are skipped. Any other status marks the \
        task `failed` and is answered with TASK_FAILED.",
    request_body = DetectionCallback,
    responses(
        (status = 200, description = "Detections stored", body = DetectionCallbackResponse),
        (status = 400, description = "Malformed body (VALIDATION_ERROR) or failed task (TASK_FAILED)", body = ErrorBody),
        (status = 404, description = "Unknown task (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, body), fields(task_id = body.task_id.0))]
pub async fn update_image_trash_result(
    State(state): State<AppState>,
    AppJson(body): AppJson<DetectionCallback>,
) -> Result<Json<DetectionCallbackResponse>, AppError> {
    let applied = callback::apply_detection_result(
        &state.db,
        state.blob_store.as_ref(),
        state.geocoder.as_ref(),
        body,
    )
    .await?;
    Ok(Json(applied))
}
