//! OpenAPI documentation

use utoipa::OpenApi;

use crate::error;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tavola API",
        version = "0.1.0",
        description = "Restaurant media pipeline: image upload, derivative generation, and cache-friendly serving. All API endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::media_upload::upload_media,
        handlers::media_serve::serve_media,
        handlers::presets::list_presets,
        handlers::health::health,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::media_upload::UploadResponse,
        handlers::presets::PresetsResponse,
        handlers::health::HealthResponse,
        tavola_core::DerivativePreset,
    )),
    tags(
        (name = "media", description = "Upload and serving endpoints"),
        (name = "system", description = "Operational endpoints")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_contains_routes() {
        let spec = ApiDoc::openapi();
        assert!(spec.paths.paths.contains_key("/api/v0/media"));
        assert!(spec.paths.paths.contains_key("/media/{size}/{filename}"));
        assert!(spec.paths.paths.contains_key("/api/v0/presets"));
        assert!(spec.paths.paths.contains_key("/health"));
    }
}
