//! TOML configuration
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields the stock settings.

use crate::coords::{OverlayMapping, DEFAULT_BASELINE_OFFSET, DEFAULT_RENDER_SCALE};
use crate::error::PdfStudioError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub editor: EditorConfig,
    pub watermark: WatermarkConfig,
    pub upload: UploadConfig,
    pub remote: RemoteConfig,
}

impl StudioConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PdfStudioError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PdfStudioError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self, PdfStudioError> {
        let config: Self = toml::from_str(s)
            .map_err(|e| PdfStudioError::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PdfStudioError> {
        let positive = [
            ("editor.render_scale", self.editor.render_scale),
            ("editor.font_size", self.editor.font_size),
            ("watermark.font_size", self.watermark.font_size),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(PdfStudioError::Config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.watermark.opacity) {
            return Err(PdfStudioError::Config(format!(
                "watermark.opacity must be between 0 and 1, got {}",
                self.watermark.opacity
            )));
        }
        if self.watermark.color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(PdfStudioError::Config(
                "watermark.color components must be between 0 and 1".into(),
            ));
        }
        if self.upload.max_size_mb == 0 {
            return Err(PdfStudioError::Config(
                "upload.max_size_mb must be at least 1".into(),
            ));
        }
        if self.remote.base_url.trim().is_empty() {
            return Err(PdfStudioError::Config("remote.base_url is empty".into()));
        }
        Ok(())
    }
}

/// Overlay editing surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Canvas pixels per PDF point
    pub render_scale: f64,
    /// Overlay pixels between a text box's top edge and its baseline
    pub baseline_offset: f64,
    pub font_size: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            render_scale: DEFAULT_RENDER_SCALE,
            baseline_offset: DEFAULT_BASELINE_OFFSET,
            font_size: 14.0,
        }
    }
}

impl EditorConfig {
    pub fn overlay_mapping(&self) -> OverlayMapping {
        OverlayMapping::new(self.render_scale, self.baseline_offset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub font_size: f64,
    pub opacity: f64,
    pub rotation_degrees: f64,
    pub color: [f64; 3],
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            font_size: 50.0,
            opacity: 0.3,
            rotation_degrees: -45.0,
            color: [0.85, 0.2, 0.2],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_size_mb: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { max_size_mb: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Processing server for unlock, protect, compress, OCR and conversions
    pub base_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
        }
    }
}
