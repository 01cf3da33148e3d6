use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_typed_multipart::BaseMultipart;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::archive::{ArchiveResponse, ArchiveUploadDoc, ArchiveUploadForm};
use crate::services::archive::{store_archive, validate_archive};
use crate::services::users::ensure_user;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/upload-archive",
    tag = "Upload",
    operation_id = "uploadArchive",
    summary = "Upload a zip bundle of images",
    description = "Stores a zip `archive` and optional `json` metadata for the external batch \
        worker, which expands it into recognition tasks.",
    request_body(content = ArchiveUploadDoc, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Archive accepted", body = ArchiveResponse),
        (status = 400, description = "Missing, empty or invalid archive or metadata (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 500, description = "Blob storage failed (STORAGE_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_archive(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: BaseMultipart<ArchiveUploadForm, AppError>,
) -> Result<(StatusCode, Json<ArchiveResponse>), AppError> {
    let upload = validate_archive(multipart.data)?;

    ensure_user(&state.db, &auth_user).await?;

    let stored = store_archive(&state.db, state.blob_store.as_ref(), auth_user.user_id, upload).await?;

    Ok((StatusCode::ACCEPTED, Json(stored)))
}
