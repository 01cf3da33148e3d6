use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A zip bundle awaiting expansion by the external batch worker.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upload_archive")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    /// Object key of the archive.
    pub filename: String,
    pub original_filename: String,
    #[sea_orm(column_type = "Text")]
    pub storage_url: String,

    pub metadata_filename: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub metadata_storage_url: Option<String>,

    /// `pending` until the batch worker picks it up.
    pub status: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
