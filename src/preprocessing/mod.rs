//! Image normalization ahead of detection and recognition.
//!
//! The [`Preprocessor`] runs an ordered list of [`PreprocessStep`]s. The
//! default list (grayscale, deskew, denoise, contrast) is built from
//! [`PreprocessConfig`]; any step can be disabled there, and callers can
//! replace the list entirely with [`Preprocessor::with_steps`].

pub mod clahe;
pub mod deskew;
pub mod filters;
pub mod steps;

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::config::PreprocessConfig;
use crate::error::{Result, TableError};
use crate::telemetry::Telemetry;
use steps::{ContrastStep, DenoiseStep, DeskewStep, GrayscaleStep};

/// Trait that all preprocessing steps implement
pub trait PreprocessStep: Send + Sync {
    /// Produce a new image from `image`; never mutates the input.
    /// Steps may note what they did in `report`.
    fn apply(&self, image: &DynamicImage, report: &mut PreprocessReport) -> Result<DynamicImage>;

    /// Human-readable name for this step (used in logs)
    fn name(&self) -> &str;
}

/// What a preprocessing run did and how long it took.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreprocessReport {
    /// Mean intensity of the output.
    pub mean: f64,
    /// Intensity standard deviation of the output.
    pub std_dev: f64,
    pub elapsed: Duration,
    /// Elapsed time went over the configured budget.
    pub budget_exceeded: bool,
    /// Rotation applied by the deskew step, in degrees.
    pub skew_angle: Option<f32>,
    /// The denoiser chose the strong (blur + median) path.
    pub strong_denoise: bool,
    /// Names of the steps that ran, in order.
    pub steps: Vec<String>,
}

/// Ordered, configurable preprocessing chain.
pub struct Preprocessor {
    steps: Vec<Arc<dyn PreprocessStep>>,
    budget: Duration,
    telemetry: Telemetry,
}

impl Preprocessor {
    pub fn new(config: &PreprocessConfig, telemetry: Telemetry) -> Self {
        let mut steps: Vec<Arc<dyn PreprocessStep>> = Vec::new();
        if config.grayscale {
            steps.push(Arc::new(GrayscaleStep));
        }
        if config.deskew {
            steps.push(Arc::new(DeskewStep::from_config(config)));
        }
        if config.denoise {
            steps.push(Arc::new(DenoiseStep::from_config(config)));
        }
        if config.contrast {
            steps.push(Arc::new(ContrastStep {
                tile_grid: config.clahe_tile_grid,
                clip_limit: config.clahe_clip_limit,
            }));
        }

        Self {
            steps,
            budget: Duration::from_millis(config.max_processing_ms),
            telemetry,
        }
    }

    /// Replace the step list.
    pub fn with_steps(mut self, steps: Vec<Arc<dyn PreprocessStep>>) -> Self {
        self.steps = steps;
        self
    }

    /// Append a step to the end of the list.
    pub fn add_step(mut self, step: Arc<dyn PreprocessStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order.
    pub fn process(&self, image: &DynamicImage) -> Result<DynamicImage> {
        self.process_with_report(image).map(|(img, _)| img)
    }

    /// Run every step and report timing and image statistics.
    pub fn process_with_report(
        &self,
        image: &DynamicImage,
    ) -> Result<(DynamicImage, PreprocessReport)> {
        let _span = self.telemetry.span().enter();
        validate_image(image)?;

        let start = Instant::now();
        let mut report = PreprocessReport::default();
        let mut current = image.clone();

        for step in &self.steps {
            tracing::debug!(step = step.name(), "running preprocessing step");
            current = step.apply(&current, &mut report)?;
            validate_image(&current).map_err(|e| {
                TableError::Preprocessing(format!("step '{}' produced {}", step.name(), e))
            })?;
            report.steps.push(step.name().to_string());
        }

        report.elapsed = start.elapsed();
        let (mean, std_dev) = filters::intensity_stats(&current.to_luma8());
        report.mean = mean;
        report.std_dev = std_dev;

        if report.elapsed > self.budget {
            report.budget_exceeded = true;
            tracing::warn!(
                elapsed_ms = report.elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.budget.as_millis() as u64,
                "preprocessing exceeded time budget"
            );
        }

        self.telemetry.record("preprocess_ms", report.elapsed.as_secs_f64() * 1000.0);
        if let Some(angle) = report.skew_angle {
            self.telemetry.record("skew_degrees", angle as f64);
        }

        Ok((current, report))
    }
}

fn validate_image(image: &DynamicImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(TableError::Preprocessing(format!(
            "image dimensions must be non-zero (got {}x{})",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// Decode an encoded image buffer (PNG, JPEG, TIFF, ...).
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(TableError::Preprocessing("empty image buffer".into()));
    }
    let image = image::load_from_memory(bytes)?;
    validate_image(&image)?;
    Ok(image)
}

/// Wrap a raw interleaved 8-bit pixel buffer.
///
/// `channels` must be 1 (gray), 3 (RGB) or 4 (RGBA), and `data` must hold
/// exactly `width * height * channels` bytes.
pub fn image_from_raw(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<DynamicImage> {
    if width == 0 || height == 0 {
        return Err(TableError::Preprocessing(format!(
            "image dimensions must be non-zero (got {width}x{height})"
        )));
    }
    let expected = width as usize * height as usize * channels as usize;
    if data.len() != expected {
        return Err(TableError::Preprocessing(format!(
            "buffer holds {} bytes, expected {expected} for {width}x{height}x{channels}",
            data.len()
        )));
    }

    let image = match channels {
        1 => GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
        other => {
            return Err(TableError::Preprocessing(format!(
                "unsupported channel count {other}"
            )));
        }
    };
    image.ok_or_else(|| TableError::Preprocessing("pixel buffer does not match dimensions".into()))
}
