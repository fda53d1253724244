use image::DynamicImage;

use crate::config::PreprocessConfig;
use crate::error::Result;
use crate::preprocessing::clahe::clahe;
use crate::preprocessing::deskew::{self, DeskewParams};
use crate::preprocessing::{PreprocessReport, PreprocessStep, filters};

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PreprocessStep for GrayscaleStep {
    fn apply(&self, image: &DynamicImage, _report: &mut PreprocessReport) -> Result<DynamicImage> {
        match image {
            DynamicImage::ImageLuma8(_) => Ok(image.clone()),
            _ => Ok(DynamicImage::ImageLuma8(filters::to_grayscale(image))),
        }
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Detect dominant line angle and rotate it back to horizontal
pub struct DeskewStep {
    pub params: DeskewParams,
}

impl DeskewStep {
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            params: DeskewParams {
                canny_low: config.canny_low,
                canny_high: config.canny_high,
                vote_threshold: config.hough_vote_threshold,
                suppression_radius: config.hough_suppression_radius,
                max_angle_degrees: config.max_skew_degrees,
                min_correction_degrees: config.min_skew_degrees,
            },
        }
    }
}

impl PreprocessStep for DeskewStep {
    fn apply(&self, image: &DynamicImage, report: &mut PreprocessReport) -> Result<DynamicImage> {
        let gray = filters::to_grayscale(image);
        match deskew::correct_skew(&gray, &self.params) {
            Some((rotated, angle)) => {
                report.skew_angle = Some(angle);
                Ok(DynamicImage::ImageLuma8(rotated))
            }
            // Nothing to correct: hand back the input untouched.
            None => Ok(image.clone()),
        }
    }

    fn name(&self) -> &str {
        "Skew Correction"
    }
}

/// Blur strength chosen from the intensity spread of the image
pub struct DenoiseStep {
    pub noise_std_threshold: f64,
    pub strong_sigma: f32,
    pub light_sigma: f32,
    pub median_radius: u32,
}

impl DenoiseStep {
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            noise_std_threshold: config.noise_std_threshold,
            strong_sigma: config.strong_blur_sigma,
            light_sigma: config.light_blur_sigma,
            median_radius: config.median_radius,
        }
    }
}

impl PreprocessStep for DenoiseStep {
    fn apply(&self, image: &DynamicImage, report: &mut PreprocessReport) -> Result<DynamicImage> {
        let gray = filters::to_grayscale(image);
        let (mean, std) = filters::intensity_stats(&gray);

        let denoised = if std > self.noise_std_threshold {
            // Gaussian for general noise, then median for salt-and-pepper
            let blurred = filters::apply_blur(&gray, self.strong_sigma);
            report.strong_denoise = true;
            filters::apply_median(&blurred, self.median_radius)
        } else {
            filters::apply_blur(&gray, self.light_sigma)
        };

        tracing::trace!(mean, std, strong = report.strong_denoise, "denoised");
        Ok(DynamicImage::ImageLuma8(denoised))
    }

    fn name(&self) -> &str {
        "Noise Removal"
    }
}

/// Tiled adaptive histogram equalization
pub struct ContrastStep {
    pub tile_grid: u32,
    pub clip_limit: f32,
}

impl PreprocessStep for ContrastStep {
    fn apply(&self, image: &DynamicImage, _report: &mut PreprocessReport) -> Result<DynamicImage> {
        let gray = filters::to_grayscale(image);
        Ok(DynamicImage::ImageLuma8(clahe(&gray, self.tile_grid, self.clip_limit)))
    }

    fn name(&self) -> &str {
        "Contrast Enhancement"
    }
}
