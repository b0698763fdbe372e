//! Derivative generator
//!
//! Takes one source image and materializes the full derivative set for it:
//! every configured sized preset as a progressive JPEG, plus one WebP
//! rendition. Generation is all-or-nothing; a failure part-way through
//! removes everything already written so the output directory never holds a
//! partial set.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tavola_core::{PresetSet, WEBP_HEIGHT, WEBP_LABEL, WEBP_WIDTH};

use crate::encode;
use crate::fit::CoverFit;

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("failed to read source image {path}: {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode source image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode '{label}' derivative: {source}")]
    Encode {
        label: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write derivative {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Generates the derivative set for uploaded images.
///
/// Presets and encode qualities are fixed at construction; handlers share one
/// instance for the life of the process.
#[derive(Debug, Clone)]
pub struct DerivativeGenerator {
    presets: PresetSet,
    jpeg_quality: u8,
    webp_quality: f32,
}

impl DerivativeGenerator {
    pub fn new(presets: PresetSet, jpeg_quality: u8, webp_quality: f32) -> Self {
        Self {
            presets,
            jpeg_quality,
            webp_quality,
        }
    }

    pub fn presets(&self) -> &PresetSet {
        &self.presets
    }

    /// Generate every derivative of the image at `input_path` into
    /// `output_directory`, returning a label-to-path mapping. Sized
    /// derivatives are named `<label>_<base_filename>`; the WebP rendition is
    /// named `webp_<stem>.webp` where `stem` is `base_filename` without its
    /// extension.
    ///
    /// Blocking; callers on an async runtime should wrap this in
    /// `spawn_blocking`.
    pub fn generate(
        &self,
        input_path: &Path,
        output_directory: &Path,
        base_filename: &str,
    ) -> Result<BTreeMap<String, PathBuf>, GeneratorError> {
        let mut written: Vec<PathBuf> = Vec::new();

        match self.generate_inner(input_path, output_directory, base_filename, &mut written) {
            Ok(derivatives) => {
                tracing::info!(
                    input = %input_path.display(),
                    output_directory = %output_directory.display(),
                    count = derivatives.len(),
                    "Generated derivative set"
                );
                Ok(derivatives)
            }
            Err(e) => {
                Self::discard_partial(&written);
                Err(e)
            }
        }
    }

    fn generate_inner(
        &self,
        input_path: &Path,
        output_directory: &Path,
        base_filename: &str,
        written: &mut Vec<PathBuf>,
    ) -> Result<BTreeMap<String, PathBuf>, GeneratorError> {
        let data = std::fs::read(input_path).map_err(|source| GeneratorError::ReadSource {
            path: input_path.to_path_buf(),
            source,
        })?;

        // Decode once; every derivative resizes from the same source frame.
        let img = image::ImageReader::new(Cursor::new(&data))
            .with_guessed_format()
            .map_err(|source| GeneratorError::ReadSource {
                path: input_path.to_path_buf(),
                source,
            })?
            .decode()
            .map_err(|source| GeneratorError::Decode {
                path: input_path.to_path_buf(),
                source,
            })?;

        std::fs::create_dir_all(output_directory).map_err(|source| GeneratorError::OutputDir {
            path: output_directory.to_path_buf(),
            source,
        })?;

        let mut derivatives = BTreeMap::new();

        for preset in self.presets.iter() {
            let path = output_directory.join(format!("{}_{}", preset.label, base_filename));
            self.write_jpeg_derivative(&img, preset.label.as_str(), preset.width, preset.height, &path, written)?;
            derivatives.insert(preset.label.clone(), path);
        }

        let stem = Path::new(base_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(base_filename);
        let webp_path = output_directory.join(format!("{}_{}.webp", WEBP_LABEL, stem));
        self.write_webp_derivative(&img, &webp_path, written)?;
        derivatives.insert(WEBP_LABEL.to_string(), webp_path);

        Ok(derivatives)
    }

    fn write_jpeg_derivative(
        &self,
        img: &DynamicImage,
        label: &str,
        width: u32,
        height: u32,
        path: &Path,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), GeneratorError> {
        let resized = CoverFit::cover(img, width, height);
        let encoded = encode::encode_jpeg(&resized, self.jpeg_quality).map_err(|source| {
            GeneratorError::Encode {
                label: label.to_string(),
                source,
            }
        })?;

        std::fs::write(path, &encoded).map_err(|source| GeneratorError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        written.push(path.to_path_buf());

        tracing::debug!(
            label = %label,
            width,
            height,
            size_bytes = encoded.len(),
            path = %path.display(),
            "Wrote JPEG derivative"
        );
        Ok(())
    }

    fn write_webp_derivative(
        &self,
        img: &DynamicImage,
        path: &Path,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), GeneratorError> {
        let resized = CoverFit::cover(img, WEBP_WIDTH, WEBP_HEIGHT);
        let encoded = encode::encode_webp(&resized, self.webp_quality).map_err(|source| {
            GeneratorError::Encode {
                label: WEBP_LABEL.to_string(),
                source,
            }
        })?;

        std::fs::write(path, &encoded).map_err(|source| GeneratorError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        written.push(path.to_path_buf());

        tracing::debug!(
            label = WEBP_LABEL,
            width = WEBP_WIDTH,
            height = WEBP_HEIGHT,
            size_bytes = encoded.len(),
            path = %path.display(),
            "Wrote WebP derivative"
        );
        Ok(())
    }

    /// Best-effort rollback of derivatives written before a failure.
    fn discard_partial(written: &[PathBuf]) {
        for path in written {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "Failed to remove partial derivative"
                    );
                }
            }
        }
        if !written.is_empty() {
            tracing::warn!(
                count = written.len(),
                "Rolled back partial derivative set after failure"
            );
        }
    }
}
