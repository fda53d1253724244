use image::{GrayImage, Luma};
use imageproc::hough::{LineDetectionOptions, detect_lines};

use crate::geometry::median;
use crate::preprocessing::filters;

/// Parameters for skew estimation.
#[derive(Debug, Clone)]
pub struct DeskewParams {
    pub canny_low: f32,
    pub canny_high: f32,
    pub vote_threshold: u32,
    pub suppression_radius: u32,
    /// Only lines within this many degrees of horizontal are considered.
    pub max_angle_degrees: f32,
    /// Skew at or below this magnitude is not corrected.
    pub min_correction_degrees: f32,
}

impl Default for DeskewParams {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            vote_threshold: 100,
            suppression_radius: 8,
            max_angle_degrees: 45.0,
            min_correction_degrees: 0.5,
        }
    }
}

/// Median deviation from horizontal of the straight lines found in `img`.
///
/// Positive angles mean lines descend to the right (y grows downwards).
/// Returns `None` when no line falls inside the angle window.
pub fn estimate_skew_angle(img: &GrayImage, params: &DeskewParams) -> Option<f32> {
    let edges = filters::detect_edges(img, params.canny_low, params.canny_high);
    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold: params.vote_threshold,
            suppression_radius: params.suppression_radius,
        },
    );

    // angle_in_degrees is the clockwise angle of the line normal, so a
    // horizontal line sits at 90.
    let mut angles: Vec<f32> = lines
        .iter()
        .map(|line| line.angle_in_degrees as f32 - 90.0)
        .filter(|deviation| deviation.abs() < params.max_angle_degrees)
        .collect();

    tracing::trace!(lines = lines.len(), candidates = angles.len(), "hough lines for skew");
    median(&mut angles)
}

/// Rotate about the image center so that lines at `angle_degrees` become
/// horizontal. Samples outside the source replicate the nearest edge pixel.
pub fn rotate_replicate(img: &GrayImage, angle_degrees: f32) -> GrayImage {
    let (width, height) = img.dimensions();
    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;

    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let src_x = cx + cos * dx - sin * dy;
        let src_y = cy + sin * dx + cos * dy;
        Luma([sample_bilinear_clamped(img, src_x, src_y)])
    })
}

fn sample_bilinear_clamped(img: &GrayImage, x: f32, y: f32) -> u8 {
    let max_x = (img.width() - 1) as f32;
    let max_y = (img.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let x0 = x0 as u32;
    let y0 = y0 as u32;
    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);

    let p = |px: u32, py: u32| img.get_pixel(px, py)[0] as f32;
    let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
    let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;
    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}

/// Estimate the skew and rotate if it is significant.
///
/// Returns the corrected image and the applied angle, or `None` when the
/// image is left as is (no lines found, or skew below the threshold).
pub fn correct_skew(img: &GrayImage, params: &DeskewParams) -> Option<(GrayImage, f32)> {
    let angle = estimate_skew_angle(img, params)?;
    if angle.abs() <= params.min_correction_degrees {
        tracing::trace!(angle, "skew below threshold, skipping correction");
        return None;
    }
    tracing::debug!(angle, "applying deskew correction");
    Some((rotate_replicate(img, angle), angle))
}
