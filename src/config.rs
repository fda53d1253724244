use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

/// Top-level configuration for a [`crate::TableExtractor`].
///
/// Every section has defaults, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub preprocess: PreprocessConfig,
    pub detect: DetectConfig,
    pub ocr: OcrConfig,
    pub structure: StructureConfig,
}

impl ExtractorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| TableError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.preprocess.validate()?;
        self.detect.validate()?;
        self.structure.validate()
    }
}

/// Preprocessing steps and their parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub grayscale: bool,
    pub deskew: bool,
    pub denoise: bool,
    pub contrast: bool,

    /// Advisory budget; exceeding it only logs a warning.
    pub max_processing_ms: u64,

    pub canny_low: f32,
    pub canny_high: f32,
    pub hough_vote_threshold: u32,
    pub hough_suppression_radius: u32,
    /// Lines further than this from horizontal are ignored when estimating skew.
    pub max_skew_degrees: f32,
    /// Skew at or below this angle is left uncorrected.
    pub min_skew_degrees: f32,

    /// Intensity standard deviation above which the strong denoiser runs.
    pub noise_std_threshold: f64,
    pub strong_blur_sigma: f32,
    pub light_blur_sigma: f32,
    pub median_radius: u32,

    pub clahe_tile_grid: u32,
    pub clahe_clip_limit: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            grayscale: true,
            deskew: true,
            denoise: true,
            contrast: true,
            max_processing_ms: 200,
            canny_low: 50.0,
            canny_high: 150.0,
            hough_vote_threshold: 100,
            hough_suppression_radius: 8,
            max_skew_degrees: 45.0,
            min_skew_degrees: 0.5,
            noise_std_threshold: 30.0,
            strong_blur_sigma: 1.1,
            light_blur_sigma: 0.8,
            median_radius: 1,
            clahe_tile_grid: 8,
            clahe_clip_limit: 2.0,
        }
    }
}

impl PreprocessConfig {
    fn validate(&self) -> Result<()> {
        if self.strong_blur_sigma <= 0.0 || self.light_blur_sigma <= 0.0 {
            return Err(TableError::Config("blur sigmas must be positive".into()));
        }
        if self.canny_low > self.canny_high {
            return Err(TableError::Config(format!(
                "canny_low ({}) must not exceed canny_high ({})",
                self.canny_low, self.canny_high
            )));
        }
        if self.clahe_tile_grid == 0 {
            return Err(TableError::Config("clahe_tile_grid must be at least 1".into()));
        }
        if self.clahe_clip_limit <= 0.0 {
            return Err(TableError::Config("clahe_clip_limit must be positive".into()));
        }
        if !(0.0..=90.0).contains(&self.max_skew_degrees) {
            return Err(TableError::Config("max_skew_degrees must be within [0, 90]".into()));
        }
        Ok(())
    }
}

/// Table detector tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Text detection model for the learned tier; the tier is skipped when unset.
    pub model_path: Option<PathBuf>,
    /// Pixels added around the region found by the learned tier.
    pub model_padding: u32,

    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Minimum contour bounding-box area as a fraction of the image area.
    pub min_area_ratio: f64,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub approx_epsilon_ratio: f64,
    pub min_vertices: usize,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            model_padding: 10,
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            min_area_ratio: 0.01,
            approx_epsilon_ratio: 0.02,
            min_vertices: 4,
        }
    }
}

impl DetectConfig {
    fn validate(&self) -> Result<()> {
        if self.blur_sigma <= 0.0 {
            return Err(TableError::Config("detect.blur_sigma must be positive".into()));
        }
        if !(self.min_area_ratio > 0.0 && self.min_area_ratio < 1.0) {
            return Err(TableError::Config("detect.min_area_ratio must be within (0, 1)".into()));
        }
        if self.approx_epsilon_ratio <= 0.0 {
            return Err(TableError::Config("detect.approx_epsilon_ratio must be positive".into()));
        }
        Ok(())
    }
}

/// Recognition backends, tried in the listed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub backends: Vec<BackendConfig>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backends: vec![
                BackendConfig::Ocrs(OcrsConfig::default()),
                BackendConfig::Tesseract(TesseractConfig::default()),
            ],
        }
    }
}

/// Engine-specific backend parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Ocrs(OcrsConfig),
    Tesseract(TesseractConfig),
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Ocrs(_) => "ocrs",
            BackendConfig::Tesseract(_) => "tesseract",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrsConfig {
    /// Defaults to `~/.cache/ocrs/text-detection.rten`.
    pub detection_model: Option<PathBuf>,
    /// Defaults to `~/.cache/ocrs/text-recognition.rten`.
    pub recognition_model: Option<PathBuf>,
    /// ocrs reports no per-word score, so every fragment gets this one.
    pub assumed_confidence: f32,
}

impl Default for OcrsConfig {
    fn default() -> Self {
        Self {
            detection_model: None,
            recognition_model: None,
            assumed_confidence: 0.9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Tesseract language codes, e.g. `eng` or `kor+eng`.
    pub language: String,
    pub tessdata_dir: Option<PathBuf>,
    /// Page segmentation mode; 6 assumes a uniform block of text.
    pub page_segmentation_mode: u32,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            tessdata_dir: None,
            page_segmentation_mode: 6,
        }
    }
}

/// Row/column band thresholds in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub row_threshold: f32,
    pub col_threshold: f32,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            row_threshold: 10.0,
            col_threshold: 10.0,
        }
    }
}

impl StructureConfig {
    fn validate(&self) -> Result<()> {
        if !(self.row_threshold >= 0.0 && self.col_threshold >= 0.0) {
            return Err(TableError::Config(
                "structure thresholds must be non-negative numbers".into(),
            ));
        }
        Ok(())
    }
}
