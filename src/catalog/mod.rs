mod in_memory;
mod local_fs;

pub use in_memory::InMemoryCatalog;
pub use local_fs::LocalCatalog;

use crate::{asset::SlideAsset, errors::ApiError};
use async_trait::async_trait;

/// Live assets, addressed by their display file name.
#[async_trait]
pub trait AssetCatalog: Send + Sync + 'static {
    /// Fails with `InvalidArgument` if the file name is already taken.
    async fn insert(&self, asset: SlideAsset) -> Result<(), ApiError>;
    async fn get(&self, filename: &str) -> Result<SlideAsset, ApiError>;
    /// All assets ordered by file name.
    async fn list(&self) -> Result<Vec<SlideAsset>, ApiError>;
    /// Drops the entry and hands the asset back; the file itself stays.
    async fn delete(&self, filename: &str) -> Result<SlideAsset, ApiError>;
}

fn duplicate(asset: &SlideAsset) -> ApiError {
    tracing::warn!("Asset '{}' already exists", asset.filename());
    ApiError::invalid("Asset filename already exists")
}

fn sorted(mut assets: Vec<SlideAsset>) -> Vec<SlideAsset> {
    assets.sort_by(|a, b| a.filename().cmp(b.filename()));
    assets
}
