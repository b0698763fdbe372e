//! Derivative preset table
//!
//! The preset table maps a size label to a target box. It is built once at
//! startup (from the standard table or a `DERIVATIVE_PRESETS` override) and
//! injected into the generator, so the mapping is immutable for the process
//! lifetime.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

/// Label reserved for the modern-format derivative. Not a sized preset:
/// exactly one WebP output is produced per upload at the fixed box below.
pub const WEBP_LABEL: &str = "webp";
pub const WEBP_WIDTH: u32 = 800;
pub const WEBP_HEIGHT: u32 = 600;

/// One target size for a generated derivative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DerivativePreset {
    /// Size label, used as the output filename prefix and the serve-path segment
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl DerivativePreset {
    pub fn new(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            width,
            height,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PresetError {
    #[error("preset table must not be empty")]
    Empty,

    #[error("duplicate preset label: {0}")]
    DuplicateLabel(String),

    #[error("invalid preset label '{0}': must be non-empty lowercase alphanumeric")]
    InvalidLabel(String),

    #[error("label '{0}' is reserved for the modern-format derivative")]
    ReservedLabel(String),

    #[error("preset '{label}' has zero dimension {width}x{height}")]
    ZeroDimension {
        label: String,
        width: u32,
        height: u32,
    },

    #[error("invalid preset spec entry '{0}': expected label:WIDTHxHEIGHT")]
    InvalidSpec(String),
}

/// Immutable, ordered set of derivative presets.
///
/// Cheap to clone; the backing slice is shared.
#[derive(Debug, Clone)]
pub struct PresetSet {
    presets: Arc<[DerivativePreset]>,
}

impl PresetSet {
    /// The standard five-size table used when no override is configured.
    pub fn standard() -> Self {
        let presets = vec![
            DerivativePreset::new("thumbnail", 150, 150),
            DerivativePreset::new("small", 400, 300),
            DerivativePreset::new("medium", 800, 600),
            DerivativePreset::new("large", 1200, 900),
            DerivativePreset::new("hero", 1920, 1080),
        ];
        // The standard table is statically valid.
        Self {
            presets: presets.into(),
        }
    }

    /// Build a set from explicit presets, validating labels and dimensions.
    pub fn new(presets: Vec<DerivativePreset>) -> Result<Self, PresetError> {
        if presets.is_empty() {
            return Err(PresetError::Empty);
        }

        let mut seen = Vec::with_capacity(presets.len());
        for preset in &presets {
            if preset.label.is_empty()
                || !preset
                    .label
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            {
                return Err(PresetError::InvalidLabel(preset.label.clone()));
            }
            if preset.label == WEBP_LABEL {
                return Err(PresetError::ReservedLabel(preset.label.clone()));
            }
            if preset.width == 0 || preset.height == 0 {
                return Err(PresetError::ZeroDimension {
                    label: preset.label.clone(),
                    width: preset.width,
                    height: preset.height,
                });
            }
            if seen.contains(&preset.label) {
                return Err(PresetError::DuplicateLabel(preset.label.clone()));
            }
            seen.push(preset.label.clone());
        }

        Ok(Self {
            presets: presets.into(),
        })
    }

    /// Parse a preset spec string: `label:WIDTHxHEIGHT` entries separated by commas,
    /// e.g. `thumbnail:150x150,small:400x300`.
    pub fn parse(spec: &str) -> Result<Self, PresetError> {
        let mut presets = Vec::new();
        for entry in spec.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (label, dims) = entry
                .split_once(':')
                .ok_or_else(|| PresetError::InvalidSpec(entry.to_string()))?;
            let (w, h) = dims
                .split_once('x')
                .ok_or_else(|| PresetError::InvalidSpec(entry.to_string()))?;
            let width = w
                .trim()
                .parse::<u32>()
                .map_err(|_| PresetError::InvalidSpec(entry.to_string()))?;
            let height = h
                .trim()
                .parse::<u32>()
                .map_err(|_| PresetError::InvalidSpec(entry.to_string()))?;
            presets.push(DerivativePreset::new(label.trim(), width, height));
        }
        Self::new(presets)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DerivativePreset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// True if `label` names a sized preset (the WebP label is separate).
    pub fn contains_label(&self, label: &str) -> bool {
        self.presets.iter().any(|p| p.label == label)
    }

    pub fn to_vec(&self) -> Vec<DerivativePreset> {
        self.presets.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table() {
        let set = PresetSet::standard();
        assert_eq!(set.len(), 5);
        assert!(set.contains_label("thumbnail"));
        assert!(set.contains_label("hero"));
        assert!(!set.contains_label("webp"));

        let hero = set.iter().find(|p| p.label == "hero").unwrap();
        assert_eq!((hero.width, hero.height), (1920, 1080));
    }

    #[test]
    fn test_parse_spec() {
        let set = PresetSet::parse("thumbnail:150x150, small:400x300").unwrap();
        assert_eq!(set.len(), 2);
        let small = set.iter().find(|p| p.label == "small").unwrap();
        assert_eq!((small.width, small.height), (400, 300));
    }

    #[test]
    fn test_parse_rejects_malformed_entries() {
        assert!(matches!(
            PresetSet::parse("thumbnail"),
            Err(PresetError::InvalidSpec(_))
        ));
        assert!(matches!(
            PresetSet::parse("thumbnail:150"),
            Err(PresetError::InvalidSpec(_))
        ));
        assert!(matches!(
            PresetSet::parse("thumbnail:axb"),
            Err(PresetError::InvalidSpec(_))
        ));
        assert!(matches!(PresetSet::parse(""), Err(PresetError::Empty)));
    }

    #[test]
    fn test_new_rejects_duplicates_and_reserved() {
        let dup = vec![
            DerivativePreset::new("small", 400, 300),
            DerivativePreset::new("small", 200, 150),
        ];
        assert!(matches!(
            PresetSet::new(dup),
            Err(PresetError::DuplicateLabel(_))
        ));

        let reserved = vec![DerivativePreset::new("webp", 800, 600)];
        assert!(matches!(
            PresetSet::new(reserved),
            Err(PresetError::ReservedLabel(_))
        ));
    }

    #[test]
    fn test_new_rejects_bad_labels_and_dims() {
        assert!(matches!(
            PresetSet::new(vec![DerivativePreset::new("Thumb Nail", 10, 10)]),
            Err(PresetError::InvalidLabel(_))
        ));
        assert!(matches!(
            PresetSet::new(vec![DerivativePreset::new("tiny", 0, 10)]),
            Err(PresetError::ZeroDimension { .. })
        ));
    }
}
