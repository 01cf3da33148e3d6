use chrono::{DateTime, Utc};
use common::TaskStatus;
use serde::{Deserialize, Serialize};

use crate::utils::geo::Coordinates;

/// Query parameters for the task listing.
///
/// Values are taken as raw strings: non-numeric coordinates disable the
/// radius filter instead of failing the request.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct LocationListQuery {
    /// Inclusive lower bound on the creation date (UTC), `YYYY-MM-DD`.
    #[param(example = "2024-01-01")]
    pub date_after: Option<String>,
    /// Inclusive upper bound on the creation date (UTC), `YYYY-MM-DD`.
    #[param(example = "2024-01-31")]
    pub date_before: Option<String>,
    #[param(example = "55.75")]
    pub lat: Option<String>,
    #[param(example = "37.61")]
    pub lon: Option<String>,
    /// Search radius in kilometres. Defaults to the configured radius.
    #[param(example = "1.5")]
    pub radius_km: Option<String>,
    #[param(example = "1")]
    pub page: Option<String>,
    #[param(example = "10")]
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserSummary {
    #[schema(example = 7)]
    pub id: i32,
    #[schema(example = "alice")]
    pub username: String,
}

/// Primary image of a task.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MainImageView {
    pub id: i32,
    pub filename: String,
    pub file_path: String,
    /// Time-limited read URL; `null` when it could not be generated.
    pub preview_url: Option<String>,
}

/// A stored file as shown next to a detection.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ImageView {
    pub id: i32,
    pub filename: String,
    pub original_filename: Option<String>,
    pub file_path: String,
    pub storage_url: String,
    /// Time-limited read URL; `null` when it could not be generated.
    pub preview_url: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// A detection nested in a task.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TrashImageView {
    pub id: i32,
    pub image: ImageView,
    pub lat: f64,
    pub lon: f64,
}

/// Wire shape of one recognition task.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TaskView {
    #[schema(example = 42)]
    pub id: i32,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
    pub main_address: Option<String>,
    /// `null` unless both coordinates are known.
    pub main_coordinates: Option<Coordinates>,
    pub height: Option<f64>,
    pub angle: Option<f64>,
    pub error_reason: Option<String>,
    pub main_image: MainImageView,
    pub trash_images: Vec<TrashImageView>,
}

/// Paginated task listing.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TaskListResponse {
    /// Number of matching tasks across all pages.
    #[schema(example = 23)]
    pub count: u64,
    /// Next page number, if any.
    #[schema(example = 3)]
    pub next: Option<u64>,
    /// Previous page number, if any.
    #[schema(example = 1)]
    pub previous: Option<u64>,
    pub results: Vec<TaskView>,
}
