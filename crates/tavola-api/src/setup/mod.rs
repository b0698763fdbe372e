//! Application setup and initialization
//!
//! All initialization logic lives here so main.rs stays a thin entrypoint and
//! integration tests can build the full router in-process.

pub mod routes;
pub mod server;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tavola_core::Config;
use tavola_processing::{sweep, DerivativeGenerator, TempStore};

use crate::state::{AppState, MediaConfig};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    let presets = config.preset_set()?;
    let generator = Arc::new(DerivativeGenerator::new(
        presets,
        config.jpeg_quality,
        config.webp_quality,
    ));

    let temp_store = TempStore::new(config.temp_storage_path.clone())
        .await
        .context("Failed to initialize temp storage")?;

    let media_root = PathBuf::from(&config.media_storage_path);
    tokio::fs::create_dir_all(&media_root)
        .await
        .with_context(|| format!("Failed to create media root {}", media_root.display()))?;

    let state = Arc::new(AppState {
        media: MediaConfig {
            max_file_size: config.max_file_size_bytes,
            allowed_extensions: config.allowed_extensions.clone(),
            allowed_content_types: config.allowed_content_types.clone(),
            default_media_key: config.default_media_key.clone(),
            media_root,
        },
        temp_store,
        generator,
        is_production: config.is_production(),
        config: config.clone(),
    });

    tracing::info!(
        presets = state.generator.presets().len(),
        temp_root = %state.temp_store.root().display(),
        media_root = %state.media.media_root.display(),
        "Configuration loaded and validated successfully"
    );

    spawn_retention_task(&config, state.clone());

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Periodic retention sweep over the temp tree and every media key
/// directory. Disabled when the interval is zero.
fn spawn_retention_task(config: &Config, state: Arc<AppState>) {
    let interval_secs = config.retention_sweep_interval_secs;
    if interval_secs == 0 {
        tracing::debug!("Retention sweep task disabled");
        return;
    }
    let max_age_days = config.retention_max_age_days;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        // The first tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            run_sweep(&state, max_age_days).await;
        }
    });
    tracing::info!(
        interval_secs,
        max_age_days,
        "Retention sweep task started"
    );
}

async fn run_sweep(state: &AppState, max_age_days: u64) {
    let mut targets = vec![state.temp_store.root().to_path_buf()];
    match tokio::fs::read_dir(&state.media.media_root).await {
        Ok(mut entries) => {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                    targets.push(entry.path());
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to list media root for retention sweep");
        }
    }

    for target in targets {
        let dir = target.clone();
        let result =
            tokio::task::spawn_blocking(move || sweep(&dir, max_age_days)).await;
        match result {
            Ok(Ok(stats)) if stats.removed > 0 => {
                tracing::info!(
                    directory = %target.display(),
                    removed = stats.removed,
                    "Retention sweep removed expired files"
                );
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, directory = %target.display(), "Retention sweep failed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Retention sweep task panicked");
            }
        }
    }
}
