use super::*;
use crate::asset::{ExportView, Exportable};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::{fs, sync::RwLock};

const META_EXT: &str = "meta";

/// Keeps the private view of every asset in a `<uid>.meta` file next to
/// the asset itself, so the catalog survives restarts.
pub struct LocalCatalog {
    asset_path: PathBuf,
    assets: RwLock<HashMap<String, SlideAsset>>,
}

impl LocalCatalog {
    pub fn open(asset_path: PathBuf) -> Result<Self, ApiError> {
        if !asset_path.exists() {
            std::fs::create_dir_all(&asset_path).map_err(|e| {
                tracing::error!("Could not create {}: {e}", asset_path.display());
                ApiError::internal("Failed to create asset directory")
            })?;
        }

        let entries = std::fs::read_dir(&asset_path).map_err(|e| {
            tracing::error!("Could not read {}: {e}", asset_path.display());
            ApiError::internal("Failed to read asset directory")
        })?;

        let mut assets = HashMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != META_EXT) {
                continue;
            }
            match load_meta(&path) {
                Ok(asset) => {
                    assets.insert(asset.filename().to_string(), asset);
                }
                Err(e) => tracing::warn!("Skipping {}: {e}", path.display()),
            }
        }
        tracing::info!(
            "Loaded {} asset(s) from {}",
            assets.len(),
            asset_path.display()
        );

        Ok(Self {
            asset_path,
            assets: RwLock::new(assets),
        })
    }

    fn meta_path(&self, asset: &SlideAsset) -> PathBuf {
        self.asset_path
            .join(format!("{}.{META_EXT}", asset.uid()))
    }
}

fn load_meta(path: &Path) -> Result<SlideAsset, ApiError> {
    let meta = std::fs::read_to_string(path).map_err(|e| ApiError::internal(e.to_string()))?;
    let meta: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&meta).map_err(|e| ApiError::internal(e.to_string()))?;

    let mut asset = SlideAsset::default();
    asset.import(ExportView::Private, &meta)?;
    if asset.filename().is_empty() || asset.full_path().is_none() {
        return Err(ApiError::internal("incomplete asset metadata"));
    }
    Ok(asset)
}

#[async_trait]
impl AssetCatalog for LocalCatalog {
    async fn insert(&self, asset: SlideAsset) -> Result<(), ApiError> {
        let mut assets = self.assets.write().await;
        if assets.contains_key(asset.filename()) {
            return Err(duplicate(&asset));
        }

        let meta = serde_json::Value::Object(asset.export(ExportView::Private));
        let meta_path = self.meta_path(&asset);
        fs::write(&meta_path, meta.to_string()).await.map_err(|e| {
            tracing::error!("Could not write {}: {e}", meta_path.display());
            ApiError::internal("Failed to record asset")
        })?;

        assets.insert(asset.filename().to_string(), asset);
        Ok(())
    }

    async fn get(&self, filename: &str) -> Result<SlideAsset, ApiError> {
        self.assets
            .read()
            .await
            .get(filename)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn list(&self) -> Result<Vec<SlideAsset>, ApiError> {
        Ok(sorted(self.assets.read().await.values().cloned().collect()))
    }

    async fn delete(&self, filename: &str) -> Result<SlideAsset, ApiError> {
        let mut assets = self.assets.write().await;
        let asset = assets.get(filename).ok_or(ApiError::NotFound)?;

        // A leftover sidecar would bring the asset back on the next open.
        let meta_path = self.meta_path(asset);
        match fs::remove_file(&meta_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!("Could not remove {}: {e}", meta_path.display());
                return Err(ApiError::internal("Failed to forget asset"));
            }
        }

        assets.remove(filename).ok_or(ApiError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        asset::tests::{samples, upload},
        config::Limits,
    };

    fn create(dir: &tempfile::TempDir, name: &str) -> SlideAsset {
        let file = upload(dir, name, samples::PNG);
        SlideAsset::create(&file, dir.path(), &Limits::default()).unwrap()
    }

    #[tokio::test]
    async fn reopening_restores_assets() {
        let dir = tempfile::tempdir().unwrap();
        let asset = create(&dir, "slide.png");

        let catalog = LocalCatalog::open(dir.path().to_path_buf()).unwrap();
        catalog.insert(asset.clone()).await.unwrap();
        assert!(dir.path().join(format!("{}.meta", asset.uid())).exists());
        drop(catalog);

        let reopened = LocalCatalog::open(dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.get("slide.png").await.unwrap(), asset);
    }

    #[tokio::test]
    async fn delete_drops_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = LocalCatalog::open(dir.path().to_path_buf()).unwrap();
        let asset = create(&dir, "slide.png");
        catalog.insert(asset.clone()).await.unwrap();

        assert!(matches!(
            catalog.insert(create(&dir, "slide.png")).await,
            Err(ApiError::InvalidArgument(_))
        ));

        let removed = catalog.delete("slide.png").await.unwrap();
        assert_eq!(removed, asset);
        assert!(!dir.path().join(format!("{}.meta", asset.uid())).exists());
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_keeps_entry_when_sidecar_stays() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = LocalCatalog::open(dir.path().to_path_buf()).unwrap();
        let asset = create(&dir, "slide.png");
        catalog.insert(asset.clone()).await.unwrap();

        // A non-empty directory in place of the sidecar cannot be unlinked.
        let meta_path = dir.path().join(format!("{}.meta", asset.uid()));
        std::fs::remove_file(&meta_path).unwrap();
        std::fs::create_dir(&meta_path).unwrap();
        std::fs::write(meta_path.join("inner"), b"x").unwrap();

        assert!(matches!(
            catalog.delete("slide.png").await,
            Err(ApiError::Internal(_))
        ));
        assert_eq!(catalog.get("slide.png").await.unwrap(), asset);
    }

    #[tokio::test]
    async fn delete_tolerates_missing_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = LocalCatalog::open(dir.path().to_path_buf()).unwrap();
        let asset = create(&dir, "slide.png");
        catalog.insert(asset.clone()).await.unwrap();
        std::fs::remove_file(dir.path().join(format!("{}.meta", asset.uid()))).unwrap();

        assert_eq!(catalog.delete("slide.png").await.unwrap(), asset);
        assert!(matches!(catalog.get("slide.png").await, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn broken_metadata_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("junk.meta"), "{ not json").unwrap();
        std::fs::write(dir.path().join("partial.meta"), r#"{"mime":"image/gif"}"#).unwrap();

        let catalog = LocalCatalog::open(dir.path().to_path_buf()).unwrap();
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("assets").join("slides");
        LocalCatalog::open(nested.clone()).unwrap();
        assert!(nested.is_dir());
    }
}
