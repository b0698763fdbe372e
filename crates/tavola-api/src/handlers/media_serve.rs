//! Derivative serving
//!
//! Serves a generated derivative by size label and base filename, with
//! immutable-style cache headers and mtime-based ETag revalidation. A missing
//! derivative falls back to a same-named original in the media key directory;
//! nothing is ever regenerated on the read path.

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tavola_core::{AppError, WEBP_LABEL};
use tokio_util::io::ReaderStream;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

const CACHE_CONTROL_VALUE: &str = "public, max-age=31536000";
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Deserialize)]
pub struct MediaKeyQuery {
    pub media_key: Option<String>,
}

/// Reject anything that could escape the media key directory.
fn validate_path_segment(value: &str, what: &str) -> Result<(), AppError> {
    if value.is_empty() || value.contains('/') || value.contains('\\') || value.contains("..") {
        return Err(AppError::InvalidInput(format!(
            "Invalid {} '{}'",
            what, value
        )));
    }
    Ok(())
}

/// Serve a generated derivative
///
/// `size` is a preset label or `webp`; `filename` is the base filename the
/// upload reported back. Optional `media_key` selects the directory,
/// defaulting to the configured key.
#[utoipa::path(
    get,
    path = "/media/{size}/{filename}",
    tag = "media",
    params(
        ("size" = String, Path, description = "Derivative size label"),
        ("filename" = String, Path, description = "Base filename returned by the upload"),
        ("media_key" = Option<String>, Query, description = "Media key directory")
    ),
    responses(
        (status = 200, description = "Derivative file", content_type = "application/octet-stream"),
        (status = 304, description = "Not modified"),
        (status = 400, description = "Invalid size label or filename", body = ErrorResponse),
        (status = 404, description = "No derivative or original found", body = ErrorResponse)
    )
)]
pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path((size, filename)): Path<(String, String)>,
    Query(query): Query<MediaKeyQuery>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    if size != WEBP_LABEL && !state.generator.presets().contains_label(&size) {
        return Err(HttpAppError(AppError::InvalidInput(format!(
            "Unknown size label '{}'",
            size
        ))));
    }
    validate_path_segment(&filename, "filename").map_err(HttpAppError::from)?;

    let media_key = query
        .media_key
        .unwrap_or_else(|| state.media.default_media_key.clone());
    validate_path_segment(&media_key, "media key").map_err(HttpAppError::from)?;

    let directory = state.media.media_root.join(&media_key);

    // Derivatives are stored label-prefixed; for webp the base filename
    // already carries the .webp extension.
    let derivative_path = directory.join(format!("{}_{}", size, filename));
    if let Some(response) = try_serve(&derivative_path, content_type_for(&size), &headers).await? {
        return Ok(response);
    }

    // Fallback: an original dropped next to the derivatives, served as-is.
    let original_path = directory.join(&filename);
    if let Some(response) =
        try_serve(&original_path, content_type_for_filename(&filename), &headers).await?
    {
        tracing::debug!(
            path = %original_path.display(),
            size = %size,
            "Derivative missing, served original"
        );
        return Ok(response);
    }

    Err(HttpAppError(AppError::NotFound(format!(
        "No '{}' derivative for '{}'",
        size, filename
    ))))
}

fn content_type_for(size: &str) -> &'static str {
    if size == WEBP_LABEL {
        "image/webp"
    } else {
        // Sized derivatives are always encoded as JPEG regardless of the
        // source format the base filename suggests.
        "image/jpeg"
    }
}

fn content_type_for_filename(filename: &str) -> &'static str {
    match FsPath::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Serve `path` if it exists. `Ok(None)` means not found so the caller can
/// try the next candidate; IO failures other than not-found are storage
/// errors.
async fn try_serve(
    path: &PathBuf,
    content_type: &'static str,
    request_headers: &HeaderMap,
) -> Result<Option<Response>, HttpAppError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(HttpAppError(AppError::Storage(format!(
                "Failed to stat {}: {}",
                path.display(),
                e
            ))));
        }
    };

    let modified = metadata
        .modified()
        .map_err(|e| AppError::Storage(format!("No modification time: {}", e)))?;
    let mtime_secs = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let etag = format!("\"{:x}-{:x}\"", mtime_secs, metadata.len());

    // Strong-compare against If-None-Match for 304 revalidation.
    if let Some(candidate) = request_headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    {
        if candidate
            .split(',')
            .any(|tag| tag.trim().trim_start_matches("W/") == etag)
        {
            let response = Response::builder()
                .status(StatusCode::NOT_MODIFIED)
                .header(header::ETAG, &etag)
                .header(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)
                .body(Body::empty())
                .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;
            return Ok(Some(response));
        }
    }

    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(HttpAppError(AppError::Storage(format!(
                "Failed to open {}: {}",
                path.display(),
                e
            ))));
        }
    };

    let expires = (Utc::now() + Duration::days(365)).format(HTTP_DATE_FORMAT);
    let last_modified = chrono::DateTime::<Utc>::from(modified).format(HTTP_DATE_FORMAT);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, metadata.len())
        .header(header::CACHE_CONTROL, CACHE_CONTROL_VALUE)
        .header(header::ETAG, etag)
        .header(header::EXPIRES, expires.to_string())
        .header(header::LAST_MODIFIED, last_modified.to_string())
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(Some(response))
}
