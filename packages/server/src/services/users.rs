use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Set};

use crate::entity::user;
use crate::extractors::auth::AuthUser;

/// Mirrors the token's account into the local `user` table.
///
/// The username is refreshed on every call; `created_at` keeps its first value.
pub async fn ensure_user<C: ConnectionTrait>(conn: &C, auth_user: &AuthUser) -> Result<(), DbErr> {
    let model = user::ActiveModel {
        id: Set(auth_user.user_id),
        username: Set(auth_user.username.clone()),
        created_at: Set(Utc::now()),
    };

    user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Id)
                .update_column(user::Column::Username)
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(())
}
