use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::map::{MapQuery, MapResponse};
use crate::services::query;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/map/trash-images-by-coordinates",
    tag = "Map",
    operation_id = "listDetectionsByCoordinates",
    summary = "List the caller's detections around a point",
    description = "Returns detections whose files belong to the caller. With `lat` and `lon` only \
        detections within `radius_km` (default from configuration) are returned; non-numeric \
        inputs disable the filter.",
    params(MapQuery),
    responses(
        (status = 200, description = "Detections", body = MapResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn detections_by_coordinates(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<MapQuery>,
) -> Result<Json<MapResponse>, AppError> {
    let map = query::list_detections(
        &state.db,
        state.blob_store.as_ref(),
        &state.config.query,
        Duration::from_secs(state.config.storage.presign_expiry_secs),
        auth_user.user_id,
        &params,
    )
    .await?;

    Ok(Json(map))
}
