//! Core types shared across the Tavola media pipeline: configuration,
//! the error taxonomy, and the derivative preset table.

pub mod config;
pub mod error;
pub mod presets;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use presets::{DerivativePreset, PresetError, PresetSet, WEBP_HEIGHT, WEBP_LABEL, WEBP_WIDTH};
