use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use tracing::instrument;

use crate::clients::recognition::spawn_dispatch;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::shared::EmptyResponse;
use crate::models::upload::{ImagePart, ItemField, RawUploadItem, parse_field_name, validate_items};
use crate::services::upload::create_tasks;
use crate::services::users::ensure_user;
use crate::state::AppState;

pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(256 * 1024 * 1024) // 256 MB
}

#[utoipa::path(
    post,
    path = "/upload-images",
    tag = "Upload",
    operation_id = "uploadImages",
    summary = "Upload images for recognition",
    description = "Accepts an ordered list of items as multipart fields named \
        `images_data[i][image|address|lat|lon|angle|height]`. Every item needs a non-empty \
        `image`. Missing coordinates are forward-geocoded from `address` and a missing address \
        is reverse-geocoded from the coordinates, best-effort. All items are stored or none is. \
        Recognition is requested in the background after the response is sent.",
    request_body(content_type = "multipart/form-data", description = "Indexed upload items"),
    responses(
        (status = 200, description = "Items accepted", body = EmptyResponse),
        (status = 400, description = "Validation error with per-item details (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 500, description = "Blob storage failed (STORAGE_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_images(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<EmptyResponse>, AppError> {
    let mut raw: BTreeMap<usize, RawUploadItem> = BTreeMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let Some((index, item_field)) = field.name().and_then(parse_field_name) else {
            continue; // Ignore unknown fields.
        };

        if item_field == ItemField::Image {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read image {index}: {e}")))?;
            raw.entry(index).or_default().image = Some(ImagePart {
                bytes,
                file_name,
                content_type,
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read item {index}: {e}")))?;
            raw.entry(index).or_default().set_text(item_field, text);
        }
    }

    let items = validate_items(raw, state.config.upload.max_items)?;

    ensure_user(&state.db, &auth_user).await?;

    let jobs = create_tasks(
        &state.db,
        state.blob_store.as_ref(),
        state.geocoder.as_ref(),
        &state.config.upload,
        auth_user.user_id,
        items,
    )
    .await?;

    spawn_dispatch(state.dispatcher.clone(), jobs);

    Ok(Json(EmptyResponse {}))
}
