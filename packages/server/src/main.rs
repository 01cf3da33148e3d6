use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use common::config::{StorageAppConfig, StorageBackend};
use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::s3_store::S3BlobStore;
use tracing::{Level, info};

use geosight_server::clients::geocoding::{DisabledGeocoder, Geocoder, NominatimGeocoder};
use geosight_server::clients::recognition::HttpRecognitionClient;
use geosight_server::config::AppConfig;
use geosight_server::database::init_db;
use geosight_server::state::AppState;

async fn build_blob_store(config: &StorageAppConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StorageBackend::Filesystem => Arc::new(
            FilesystemBlobStore::new(
                PathBuf::from(&config.filesystem.base_path),
                config.filesystem.public_url.clone(),
                config.max_blob_size,
            )
            .await?,
        ),
        StorageBackend::S3 => Arc::new(S3BlobStore::new(&config.s3, config.max_blob_size)?),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = init_db(&config.database.url, config.database.max_connections).await?;
    let blob_store = build_blob_store(&config.storage).await?;
    info!(backend = ?config.storage.backend, "Blob store ready");

    let geocoder: Arc<dyn Geocoder> = if config.geocoding.enabled {
        Arc::new(NominatimGeocoder::new(&config.geocoding)?)
    } else {
        info!("Geocoding disabled");
        Arc::new(DisabledGeocoder)
    };
    let dispatcher = Arc::new(HttpRecognitionClient::new(
        &config.recognition,
        &config.server.public_url,
    )?);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState {
        db,
        config,
        blob_store,
        geocoder,
        dispatcher,
    };
    let app = geosight_server::build_router(state);

    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
