use std::sync::Arc;

use common::storage::BlobStore;
use sea_orm::DatabaseConnection;

use crate::clients::geocoding::Geocoder;
use crate::clients::recognition::RecognitionDispatcher;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub blob_store: Arc<dyn BlobStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub dispatcher: Arc<dyn RecognitionDispatcher>,
}
