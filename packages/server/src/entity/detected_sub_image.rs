use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A secondary finding reported for a task's image.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "detected_sub_image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub task_id: i32,
    #[sea_orm(belongs_to, from = "task_id", to = "id")]
    pub task: HasOne<super::recognition_task::Entity>,

    /// Owned crop of the detection.
    pub file_id: i32,
    #[sea_orm(belongs_to, from = "file_id", to = "id")]
    pub file: HasOne<super::uploaded_file::Entity>,

    pub lat: f64,
    pub lon: f64,
    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,

    /// SHA-256 of `task_id:image_path`; guards against re-delivered callbacks.
    #[sea_orm(unique)]
    pub dedup_key: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
