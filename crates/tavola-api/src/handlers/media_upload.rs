//! Upload handler
//!
//! Receives one multipart image, validates it, parks it in temp storage,
//! generates the derivative set under the media key's directory, and always
//! discards the temp file afterwards.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tavola_core::{AppError, WEBP_LABEL};
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Media key the derivatives were filed under
    pub media_key: String,
    /// Directory the derivative set was written to
    pub directory: String,
    pub original_filename: String,
    /// Collision-resistant name the upload was held under in temp storage
    pub generated_filename: String,
    /// Size label to serve path for every generated derivative
    pub derivatives: BTreeMap<String, String>,
}

struct UploadField {
    filename: String,
    content_type: String,
    data: bytes::Bytes,
}

/// Media keys become one path segment under the media root, so they must be a
/// bare directory name.
fn validate_media_key(key: &str) -> Result<(), AppError> {
    if key.is_empty()
        || key.contains('/')
        || key.contains('\\')
        || key.contains("..")
        || key.starts_with('.')
    {
        return Err(AppError::InvalidInput(format!(
            "Invalid media key '{}': must be a plain directory name",
            key
        )));
    }
    Ok(())
}

/// Strip any client-supplied directory components; only the final filename
/// component is trusted.
fn sanitize_filename(raw: &str) -> Result<String, AppError> {
    let name = Path::new(raw)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::InvalidInput(format!("Invalid filename: {}", raw)))?;
    if name == ".." || name.is_empty() {
        return Err(AppError::InvalidInput(format!("Invalid filename: {}", raw)));
    }
    Ok(name.to_string())
}

/// Upload an image and generate its derivative set
///
/// Accepts multipart form data with a required `file` field and an optional
/// `media_key` field selecting the destination directory.
#[utoipa::path(
    post,
    path = "/api/v0/media",
    tag = "media",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Derivatives generated", body = UploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported media type", body = ErrorResponse),
        (status = 500, description = "Image processing failed", body = ErrorResponse),
        (status = 503, description = "Storage unavailable", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_media"))]
pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let mut file: Option<UploadField> = None;
    let mut media_key: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .ok_or_else(|| {
                        AppError::InvalidInput("File field is missing a filename".to_string())
                    })?
                    .to_string();
                let content_type = field
                    .content_type()
                    .ok_or_else(|| {
                        AppError::InvalidInput("File field is missing a content type".to_string())
                    })?
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read file field: {}", e))
                })?;
                file = Some(UploadField {
                    filename,
                    content_type,
                    data,
                });
            }
            Some("media_key") => {
                let value = field.text().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read media_key field: {}", e))
                })?;
                let value = value.trim().to_string();
                if !value.is_empty() {
                    media_key = Some(value);
                }
            }
            _ => {
                // Unknown fields are ignored, matching lenient form clients.
            }
        }
    }

    let file = file
        .ok_or_else(|| AppError::InvalidInput("Missing required field 'file'".to_string()))?;
    let media_key = media_key.unwrap_or_else(|| state.media.default_media_key.clone());
    validate_media_key(&media_key).map_err(HttpAppError::from)?;

    let filename = sanitize_filename(&file.filename).map_err(HttpAppError::from)?;

    state
        .media
        .validator()
        .validate_all(&filename, &file.content_type, file.data.len())
        .map_err(HttpAppError::from)?;

    let upload = state.temp_store.store(&filename, &file.data).await?;

    let output_directory = state.media.media_root.join(&media_key);
    let generator = state.generator.clone();
    let input_path = upload.path.clone();
    let out_dir = output_directory.clone();
    let base_filename = filename.clone();

    let result = tokio::task::spawn_blocking(move || {
        generator.generate(&input_path, &out_dir, &base_filename)
    })
    .await;

    // The temp file is single-use; discard it whether generation worked or not.
    state.temp_store.discard(&upload).await;

    let generated = match result {
        Ok(inner) => inner?,
        Err(e) => {
            return Err(HttpAppError(AppError::Internal(format!(
                "Derivative generation task failed: {}",
                e
            ))));
        }
    };

    let stem = Path::new(&filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename.as_str());
    let derivatives = generated
        .keys()
        .map(|label| {
            let serve_filename = if label == WEBP_LABEL {
                format!("{}.webp", stem)
            } else {
                filename.clone()
            };
            (
                label.clone(),
                format!("/media/{}/{}?media_key={}", label, serve_filename, media_key),
            )
        })
        .collect();

    tracing::info!(
        media_key = %media_key,
        original_filename = %filename,
        derivative_count = generated.len(),
        "Upload processed"
    );

    Ok(Json(UploadResponse {
        media_key,
        directory: output_directory.display().to_string(),
        original_filename: filename,
        generated_filename: upload.generated_filename,
        derivatives,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_media_key() {
        assert!(validate_media_key("general").is_ok());
        assert!(validate_media_key("menu-2024").is_ok());
        assert!(validate_media_key("").is_err());
        assert!(validate_media_key("a/b").is_err());
        assert!(validate_media_key("..").is_err());
        assert!(validate_media_key(".hidden").is_err());
        assert!(validate_media_key("a\\b").is_err());
    }

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("dish.jpg").unwrap(), "dish.jpg");
        assert_eq!(sanitize_filename("/etc/dish.jpg").unwrap(), "dish.jpg");
        assert_eq!(sanitize_filename("../../dish.jpg").unwrap(), "dish.jpg");
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("").is_err());
    }
}
