use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Local mirror of an identity-provider account.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    /// Identifier assigned by the identity provider.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub username: String,

    #[sea_orm(has_many)]
    pub tasks: HasMany<super::recognition_task::Entity>,
    #[sea_orm(has_many)]
    pub archives: HasMany<super::upload_archive::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
