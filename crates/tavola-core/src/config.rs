//! Configuration module
//!
//! All settings are read from the environment (with a `.env` file honored in
//! development). Limits default to the production values; paths default to a
//! local `uploads/` tree.

use std::env;

use crate::presets::PresetSet;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_MAX_FILE_SIZE_MB: usize = 10;
const DEFAULT_JPEG_QUALITY: u8 = 85;
const DEFAULT_WEBP_QUALITY: f32 = 80.0;
const DEFAULT_RETENTION_MAX_AGE_DAYS: u64 = 30;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    /// Hard cap on an uploaded file, in bytes
    pub max_file_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    /// Root for transient upload files, deleted after each request
    pub temp_storage_path: String,
    /// Root for generated derivatives, one subdirectory per media key
    pub media_storage_path: String,
    /// Media key used when the caller supplies none
    pub default_media_key: String,
    pub jpeg_quality: u8,
    pub webp_quality: f32,
    /// Age threshold for the retention sweep
    pub retention_max_age_days: u64,
    /// Interval between scheduled sweeps; 0 disables the background task
    pub retention_sweep_interval_secs: u64,
    /// Raw `DERIVATIVE_PRESETS` override, if set
    pub derivative_presets: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB);

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| "jpeg,jpg,png,gif,webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let allowed_content_types = env::var("ALLOWED_CONTENT_TYPES")
            .unwrap_or_else(|_| "image/jpeg,image/png,image/gif,image/webp".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .collect();

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            allowed_extensions,
            allowed_content_types,
            temp_storage_path: env::var("TEMP_STORAGE_PATH")
                .unwrap_or_else(|_| "uploads/tmp".to_string()),
            media_storage_path: env::var("MEDIA_STORAGE_PATH")
                .unwrap_or_else(|_| "uploads/media".to_string()),
            default_media_key: env::var("DEFAULT_MEDIA_KEY")
                .unwrap_or_else(|_| "general".to_string()),
            jpeg_quality: env::var("JPEG_QUALITY")
                .unwrap_or_else(|_| DEFAULT_JPEG_QUALITY.to_string())
                .parse()
                .unwrap_or(DEFAULT_JPEG_QUALITY),
            webp_quality: env::var("WEBP_QUALITY")
                .unwrap_or_else(|_| DEFAULT_WEBP_QUALITY.to_string())
                .parse()
                .unwrap_or(DEFAULT_WEBP_QUALITY),
            retention_max_age_days: env::var("RETENTION_MAX_AGE_DAYS")
                .unwrap_or_else(|_| DEFAULT_RETENTION_MAX_AGE_DAYS.to_string())
                .parse()
                .unwrap_or(DEFAULT_RETENTION_MAX_AGE_DAYS),
            retention_sweep_interval_secs: env::var("RETENTION_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .unwrap_or(0),
            derivative_presets: env::var("DERIVATIVE_PRESETS").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Fail fast on misconfiguration.
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o.trim() == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(anyhow::anyhow!("JPEG_QUALITY must be in 1..=100"));
        }
        if !(1.0..=100.0).contains(&self.webp_quality) {
            return Err(anyhow::anyhow!("WEBP_QUALITY must be in 1..=100"));
        }
        if self.allowed_extensions.is_empty() || self.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_EXTENSIONS and ALLOWED_CONTENT_TYPES must not be empty"
            ));
        }
        if self.default_media_key.trim().is_empty() {
            return Err(anyhow::anyhow!("DEFAULT_MEDIA_KEY must not be empty"));
        }
        // Parse eagerly so a bad override is rejected at startup, not first upload.
        self.preset_set()?;
        Ok(())
    }

    /// The preset table: `DERIVATIVE_PRESETS` override if set, else the standard table.
    pub fn preset_set(&self) -> Result<PresetSet, anyhow::Error> {
        match &self.derivative_presets {
            Some(spec) => PresetSet::parse(spec)
                .map_err(|e| anyhow::anyhow!("invalid DERIVATIVE_PRESETS: {}", e)),
            None => Ok(PresetSet::standard()),
        }
    }
}
