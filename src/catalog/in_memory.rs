use super::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    assets: Arc<RwLock<HashMap<String, SlideAsset>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetCatalog for InMemoryCatalog {
    async fn insert(&self, asset: SlideAsset) -> Result<(), ApiError> {
        let mut assets = self.assets.write().await;
        if assets.contains_key(asset.filename()) {
            return Err(duplicate(&asset));
        }
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
        self.assets
            .write()
            .await
            .remove(filename)
            .ok_or(ApiError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{ExportView, Exportable};
    use serde_json::{Map, json};

    fn asset(filename: &str) -> SlideAsset {
        let mut asset = SlideAsset::default();
        let data: Map<_, _> = [
            ("mime".to_string(), json!("image/png")),
            ("filename".to_string(), json!(filename)),
        ]
        .into_iter()
        .collect();
        asset.import(ExportView::Public, &data).unwrap();
        asset
    }

    #[tokio::test]
    async fn insert_get_delete() {
        let catalog = InMemoryCatalog::new();
        catalog.insert(asset("b.png")).await.unwrap();
        catalog.insert(asset("a.png")).await.unwrap();

        assert_eq!(catalog.get("a.png").await.unwrap().filename(), "a.png");
        let names: Vec<_> = catalog
            .list()
            .await
            .unwrap()
            .iter()
            .map(|a| a.filename().to_string())
            .collect();
        assert_eq!(names, ["a.png", "b.png"]);

        catalog.delete("a.png").await.unwrap();
        assert!(matches!(catalog.get("a.png").await, Err(ApiError::NotFound)));
        assert!(matches!(catalog.delete("a.png").await, Err(ApiError::NotFound)));
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let catalog = InMemoryCatalog::new();
        catalog.insert(asset("a.png")).await.unwrap();
        assert!(matches!(
            catalog.insert(asset("a.png")).await,
            Err(ApiError::InvalidArgument(_))
        ));
        assert_eq!(catalog.list().await.unwrap().len(), 1);
    }
}
