use std::time::Duration;

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::entity::{detected_sub_image, recognition_task};

pub async fn init_db(db_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(60))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("geosight_server::entity::*")
        .sync(&db)
        .await?;

    ensure_indexes(&db).await;

    Ok(db)
}

/// Create secondary indexes that the entity registry does not manage.
///
/// Failures are logged and otherwise ignored.
pub async fn ensure_indexes(db: &DatabaseConnection) {
    // Listing: WHERE user_id = ? ORDER BY created_at DESC
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_recognition_task_user_created")
        .table(recognition_task::Entity)
        .col(recognition_task::Column::UserId)
        .col(recognition_task::Column::CreatedAt)
        .to_owned();
    create_index(db, "idx_recognition_task_user_created", stmt).await;

    // Cascades and view assembly: WHERE task_id IN (...)
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_detected_sub_image_task")
        .table(detected_sub_image::Entity)
        .col(detected_sub_image::Column::TaskId)
        .to_owned();
    create_index(db, "idx_detected_sub_image_task", stmt).await;
}

async fn create_index(db: &DatabaseConnection, name: &str, stmt: IndexCreateStatement) {
    let sql = db.get_database_backend().build(&stmt);
    match db.execute_raw(sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}
