use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "uploaded_file")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Object key in the blob store.
    #[sea_orm(unique)]
    pub filename: String,
    pub original_filename: Option<String>,
    pub file_path: String,
    /// Permanent (non-expiring) object URL.
    #[sea_orm(column_type = "Text")]
    pub storage_url: String,

    pub user_id: i32,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
