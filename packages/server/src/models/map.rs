use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::ImageView;

/// Query parameters for the detection map.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct MapQuery {
    #[param(example = "55.75")]
    pub lat: Option<String>,
    #[param(example = "37.61")]
    pub lon: Option<String>,
    #[param(example = "2")]
    pub radius_km: Option<String>,
}

/// One detection with its image.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct DetectionView {
    pub id: i32,
    pub image: ImageView,
    /// Parent task.
    pub image_location_id: i32,
    pub lat: f64,
    pub lon: f64,
    pub created_at: DateTime<Utc>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MapResponse {
    pub data: Vec<DetectionView>,
}
