//! Preset table introspection

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use tavola_core::{DerivativePreset, WEBP_HEIGHT, WEBP_LABEL, WEBP_WIDTH};
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct PresetsResponse {
    /// Sized presets, generated as progressive JPEG
    pub presets: Vec<DerivativePreset>,
    /// The always-on modern-format rendition
    pub webp: DerivativePreset,
}

/// List the active derivative preset table
#[utoipa::path(
    get,
    path = "/api/v0/presets",
    tag = "media",
    responses(
        (status = 200, description = "Active preset table", body = PresetsResponse)
    )
)]
pub async fn list_presets(State(state): State<Arc<AppState>>) -> Json<PresetsResponse> {
    Json(PresetsResponse {
        presets: state.generator.presets().to_vec(),
        webp: DerivativePreset::new(WEBP_LABEL, WEBP_WIDTH, WEBP_HEIGHT),
    })
}
