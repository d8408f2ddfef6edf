use catalog::{AssetCatalog, InMemoryCatalog, LocalCatalog};
use config::{AppConfig, StorageType};
use routes::AssetSettings;
use std::{error::Error, sync::Arc};

mod asset;
mod catalog;
mod config;
mod errors;
mod routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut config = AppConfig::from_env()?;
    config.resolve_asset_path()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let catalog: Arc<dyn AssetCatalog> = match config.storage_type {
        StorageType::Memory => Arc::new(InMemoryCatalog::new()),
        StorageType::Local => Arc::new(LocalCatalog::open(config.asset_path.clone())?),
    };

    let settings = AssetSettings {
        asset_path: config.asset_path.clone(),
        limits: config.limits,
    };
    let app = routes::router(catalog, settings, config.auth_token.clone());

    let addr = config.socket_addr()?;
    tracing::info!(
        "Serving slide assets from {} on {}",
        config.asset_path.display(),
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
