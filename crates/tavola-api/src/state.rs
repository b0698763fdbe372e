//! Shared application state

use std::path::PathBuf;
use std::sync::Arc;

use tavola_core::Config;
use tavola_processing::{DerivativeGenerator, TempStore, UploadValidator};

/// Upload constraints and storage roots, denormalized from Config so handlers
/// never re-parse environment-shaped strings.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    pub default_media_key: String,
    pub media_root: PathBuf,
}

impl MediaConfig {
    pub fn validator(&self) -> UploadValidator {
        UploadValidator::new(
            self.max_file_size,
            self.allowed_extensions.clone(),
            self.allowed_content_types.clone(),
        )
    }
}

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub media: MediaConfig,
    pub temp_store: TempStore,
    pub generator: Arc<DerivativeGenerator>,
    pub is_production: bool,
}
