use crate::{
    asset::{ExportView, Exportable, SlideAsset, UploadFile},
    catalog::AssetCatalog,
    config::Limits,
    errors::ApiError,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Multipart, Path, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use headers::HeaderMapExt;
use http::StatusCode;
use serde_json::Value;
use std::{io::Write, path::PathBuf, sync::Arc};

/// What the upload route needs to turn a file part into an asset.
#[derive(Debug, Clone)]
pub struct AssetSettings {
    pub asset_path: PathBuf,
    pub limits: Limits,
}

pub fn router(catalog: Arc<dyn AssetCatalog>, settings: AssetSettings, auth_token: String) -> Router {
    let auth_token: Arc<str> = auth_token.into();

    Router::new()
        .route("/file/{filename}", get(get_asset))
        .merge(
            Router::new()
                .route("/", get(health))
                .route("/upload", post(upload))
                .route("/assets", get(list_assets))
                .route("/assets/{filename}", delete(delete_asset))
                .layer(middleware::from_fn(move |req: Request, next: Next| {
                    require_token(auth_token.clone(), req, next)
                })),
        )
        .layer(Extension(catalog))
        .layer(Extension(Arc::new(settings)))
}

async fn require_token(token: Arc<str>, req: Request, next: Next) -> Response {
    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(given) if given == &*token => next.run(req).await,
        _ => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    }
}

async fn health() -> &'static str {
    "OK\nAPI Version: 1.0"
}

async fn upload(
    Extension(catalog): Extension<Arc<dyn AssetCatalog>>,
    Extension(settings): Extension<Arc<AssetSettings>>,
    multipart: Multipart,
) -> Result<Json<Vec<Value>>, ApiError> {
    // A request is applied whole or not at all.
    let mut created = Vec::new();
    if let Err(e) = create_parts(&settings, multipart, &mut created).await {
        discard(&*catalog, &[], created).await;
        return Err(e);
    }

    for (i, asset) in created.iter().enumerate() {
        if let Err(e) = catalog.insert(asset.clone()).await {
            discard(&*catalog, &created[..i], created.clone()).await;
            return Err(e);
        }
        tracing::debug!("Catalogued '{}' ({})", asset.filename(), asset.internal_name());
    }

    Ok(Json(
        created
            .iter()
            .map(|asset| Value::Object(asset.export(ExportView::Public)))
            .collect(),
    ))
}

async fn create_parts(
    settings: &Arc<AssetSettings>,
    mut multipart: Multipart,
    created: &mut Vec<SlideAsset>,
) -> Result<(), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        // Plain form fields carry no file.
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let settings = settings.clone();
        created.push(blocking(move || store_upload(&settings, name, &data)).await?);
    }
    Ok(())
}

/// Undo a partially applied upload: drop the `catalogued` entries and remove
/// every file in `assets`. Failures are logged so the original error reaches
/// the client.
async fn discard(catalog: &dyn AssetCatalog, catalogued: &[SlideAsset], assets: Vec<SlideAsset>) {
    for asset in catalogued {
        if let Err(e) = catalog.delete(asset.filename()).await {
            tracing::error!("Could not drop '{}' from the catalog: {e}", asset.filename());
        }
    }
    for asset in assets {
        let filename = asset.filename().to_string();
        if let Err(e) = blocking(move || asset.remove()).await {
            tracing::error!("Could not clean up asset '{filename}': {e}");
        }
    }
}

/// Stage `data` next to the assets and hand it to [`SlideAsset::create`].
///
/// Staging in the asset directory keeps the final move a same-device rename.
fn store_upload(settings: &AssetSettings, name: String, data: &Bytes) -> Result<SlideAsset, ApiError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("upload-")
        .tempfile_in(&settings.asset_path)
        .map_err(|e| {
            tracing::error!("Could not create temporary upload file: {e}");
            ApiError::internal("Failed to stage upload")
        })?;
    tmp.write_all(data).map_err(|e| {
        tracing::error!("Could not write temporary upload file: {e}");
        ApiError::internal("Failed to stage upload")
    })?;

    // Dropping the temp path cleans up whatever `create` left behind.
    let tmp_path = tmp.into_temp_path();
    let upload = UploadFile {
        tmp_path: tmp_path.to_path_buf(),
        name,
    };
    SlideAsset::create(&upload, &settings.asset_path, &settings.limits)
}

async fn get_asset(
    Path(filename): Path<String>,
    Extension(catalog): Extension<Arc<dyn AssetCatalog>>,
) -> Result<impl IntoResponse, ApiError> {
    let asset = catalog.get(&filename).await?;
    let path = asset.full_path().ok_or(ApiError::NotFound)?;
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        tracing::error!("Could not read {}: {e}", path.display());
        ApiError::NotFound
    })?;

    let mut response = Bytes::from(bytes).into_response();
    if let Some(mime) = asset.mime() {
        response
            .headers_mut()
            .typed_insert(headers::ContentType::from(mime.to_mime()));
    }

    Ok(response)
}

async fn list_assets(
    Extension(catalog): Extension<Arc<dyn AssetCatalog>>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let assets = catalog.list().await?;
    Ok(Json(
        assets
            .iter()
            .map(|asset| Value::Object(asset.export(ExportView::Public)))
            .collect(),
    ))
}

async fn delete_asset(
    Path(filename): Path<String>,
    Extension(catalog): Extension<Arc<dyn AssetCatalog>>,
) -> Result<StatusCode, ApiError> {
    let asset = catalog.delete(&filename).await?;
    blocking(move || asset.remove()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run filesystem work off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!("Blocking task failed: {e}");
        ApiError::internal("Worker failed")
    })?
}
