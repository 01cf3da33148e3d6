use common::TaskStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recognition_task")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// Primary image. Not owned: deletion checks for other references first.
    pub file_id: i32,
    #[sea_orm(belongs_to, from = "file_id", to = "id")]
    pub file: HasOne<super::uploaded_file::Entity>,

    pub status: TaskStatus,

    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,

    /// Camera metadata supplied at submission.
    pub height: Option<f64>,
    pub angle: Option<f64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_reason: Option<String>,

    /// lat/lon were written by a recognition callback.
    pub coordinates_recognized: bool,
    /// address was derived from callback coordinates.
    pub address_recognized: bool,

    #[sea_orm(has_many)]
    pub detections: HasMany<super::detected_sub_image::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
