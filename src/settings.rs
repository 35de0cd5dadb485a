//! Scene measurements and tessellation preferences
//!
//! Loaded from a JSON file next to the scene; every field has a default so
//! partial files are fine.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::scene::SceneError;

/// Precision preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrecisionPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl PrecisionPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrecisionPreset::Low => "low",
            PrecisionPreset::Medium => "medium",
            PrecisionPreset::High => "high",
        }
    }

    /// Scale of the constraint's chord tolerance (1.0 = default)
    pub fn chord_scale(&self) -> f64 {
        match self {
            PrecisionPreset::Low => 2.0,
            PrecisionPreset::Medium => 1.0,
            PrecisionPreset::High => 0.5,
        }
    }

    /// Scale of the maximum distance between an arc and its tessellation
    pub fn arc_scale(&self) -> f64 {
        match self {
            PrecisionPreset::Low => 2.0,
            PrecisionPreset::Medium => 1.0,
            PrecisionPreset::High => 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Precision preset
    pub precision: PrecisionPreset,

    // === Scene ===
    /// Grid square size in pixels
    pub grid_size: f64,
    /// Scene units (e.g. feet) per grid square
    pub grid_distance: f64,
    /// Largest radius a source can have in the scene, in pixels
    pub max_radius: f64,

    // === Tessellation ===
    /// Maximum distance between a circle and its polygon approximation, in pixels
    pub circle_epsilon: f64,
    /// Constraint chord tolerance as a fraction of the grid size
    pub precision_factor: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            precision: PrecisionPreset::Medium,

            grid_size: 100.0,
            grid_distance: 5.0,
            max_radius: 10_000.0,

            circle_epsilon: 1.0,
            precision_factor: 0.0825,
        }
    }
}

impl Settings {
    /// Pixels per scene unit
    pub fn distance_pixels(&self) -> f64 {
        self.grid_size / self.grid_distance
    }

    /// Maximum chord length between adjacent constraint vertices
    pub fn constraint_precision(&self) -> f64 {
        self.grid_size * self.precision_factor * self.precision.chord_scale()
    }

    /// Effective circle tessellation tolerance
    pub fn arc_epsilon(&self) -> f64 {
        self.circle_epsilon * self.precision.arc_scale()
    }

    /// Load settings from a JSON file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };

        let settings: Settings = serde_json::from_str(&json)?;
        settings.validate()?;
        log::info!("Loaded settings from {} ({} precision)", path.display(), settings.precision.as_str());
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SceneError> {
        let positive = [
            ("grid_size", self.grid_size),
            ("grid_distance", self.grid_distance),
            ("max_radius", self.max_radius),
            ("circle_epsilon", self.circle_epsilon),
            ("precision_factor", self.precision_factor),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SceneError::InvalidValue(format!("settings.{name} must be positive, got {value}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_derived_values() {
        let settings = Settings::default();
        assert_eq!(settings.distance_pixels(), 20.0);
        assert!((settings.constraint_precision() - 8.25).abs() < 1e-12);
        assert_eq!(settings.arc_epsilon(), 1.0);
    }

    #[test]
    fn test_preset_scales_precision() {
        let low = Settings {
            precision: PrecisionPreset::Low,
            ..Settings::default()
        };
        let high = Settings {
            precision: PrecisionPreset::High,
            ..Settings::default()
        };
        assert!(low.constraint_precision() > high.constraint_precision());
        assert!(low.arc_epsilon() > high.arc_epsilon());
    }

    #[test]
    fn test_preset_names_are_lowercase() {
        let preset: PrecisionPreset = serde_json::from_str(r#""low""#).unwrap();
        assert_eq!(preset, PrecisionPreset::Low);
        assert_eq!(serde_json::to_string(&PrecisionPreset::High).unwrap(), r#""high""#);
        assert!(serde_json::from_str::<PrecisionPreset>(r#""High""#).is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"grid_size": 50.0, "precision": "high"}"#).unwrap();
        assert_eq!(settings.grid_size, 50.0);
        assert_eq!(settings.grid_distance, 5.0);
        assert_eq!(settings.precision, PrecisionPreset::High);
    }

    #[test]
    fn test_missing_file_is_default() {
        let settings = Settings::load(Path::new("/nonexistent/ray-limits/settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let settings = Settings {
            grid_size: 0.0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(SceneError::InvalidValue(_))));
    }
}
