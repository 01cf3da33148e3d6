use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::Serialize;

/// Multipart body of `POST /api/upload-archive`.
#[derive(TryFromMultipart)]
pub struct ArchiveUploadForm {
    /// Zip bundle of images.
    #[form_data(limit = "unlimited")]
    pub archive: FieldData<Bytes>,
    /// Optional JSON metadata describing the bundle.
    #[form_data(limit = "unlimited")]
    pub json: Option<FieldData<Bytes>>,
}

/// Documentation-only schema of the archive form.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct ArchiveUploadDoc {
    #[schema(value_type = String, format = Binary)]
    pub archive: Vec<u8>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub json: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ArchiveResponse {
    #[schema(example = "Archive accepted for processing")]
    pub message: String,
    #[schema(example = 3)]
    pub archive_id: i32,
}
