//! HTTP request handlers.

use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use tokio_util::io::ReaderStream;
use tracing::info;

use depot_protocol::{AgentDescriptor, DashboardEvent, Package};

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /packages — the current catalog.
pub async fn list_packages(State(state): State<AppState>) -> Json<Vec<Package>> {
    Json(state.catalog.list().await)
}

/// GET /agents — the current registry snapshot.
pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentDescriptor>> {
    Json(state.registry.snapshot().await)
}

/// POST /packages — multipart upload.
///
/// Expects a `file` binary part plus optional `name`/`version` text parts.
/// On success the record is persisted first and the new catalog is then
/// broadcast to every dashboard, so no dashboard ever sees a record that
/// is not durable.
pub async fn upload_package(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Package>> {
    let mut upload: Option<(String, NamedTempFile)> = None;
    let mut name: Option<String> = None;
    let mut version: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };
        match field_name.as_str() {
            "file" => {
                let original = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload.bin".to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;
                if data.len() as u64 > state.settings.max_upload_size {
                    return Err(ApiError::bad_request(format!(
                        "file exceeds upload limit of {} bytes",
                        state.settings.max_upload_size
                    )));
                }
                let tmp = state.catalog.spool(data.to_vec()).await?;
                upload = Some((original, tmp));
            }
            "name" => {
                name = Some(field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("failed to read name field: {e}"))
                })?);
            }
            "version" => {
                version = Some(field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("failed to read version field: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let Some((original, tmp)) = upload else {
        return Err(ApiError::bad_request("no file attached"));
    };

    let package = state.catalog.ingest(tmp, &original, name, version).await?;
    info!(
        package_id = %package.id,
        filename = %package.filename,
        size_bytes = package.size_bytes,
        "Package uploaded"
    );

    let packages = state.catalog.list().await;
    state
        .hub
        .broadcast(DashboardEvent::Packages { packages })
        .await;

    Ok(Json(package))
}

/// GET /packages/{filename} — serve a stored package binary.
///
/// Only catalogued filenames are served; this is the target of the `url`
/// field in install commands.
pub async fn download_package(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let Some(package) = state.catalog.get_by_filename(&filename).await else {
        return Err(ApiError::not_found(format!("package file {filename}")));
    };

    let path = state.catalog.path_for(&package);
    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::internal(format!("opening {}: {e}", path.display())))?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let safe_filename = package.filename.replace('"', "'");
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_LENGTH, package.size_bytes.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{safe_filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}
