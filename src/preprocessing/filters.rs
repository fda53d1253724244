//! Thin wrappers over the imageproc filters the stages share.

use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;
use imageproc::filter::{gaussian_blur_f32, median_filter};

use crate::geometry::mean_std;

/// 8-bit luma view of any input; already-gray images are copied as is.
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_luma8(),
    }
}

/// Gaussian smoothing. A non-positive or non-finite sigma leaves the image unchanged.
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    if !(sigma.is_finite() && sigma > 0.0) {
        return img.clone();
    }
    gaussian_blur_f32(img, sigma)
}

/// Median filter over a `(2r+1) x (2r+1)` window, for impulse noise.
pub fn apply_median(img: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return img.clone();
    }
    median_filter(img, radius, radius)
}

/// Binary Canny edge map. Hysteresis thresholds given in the wrong order are swapped.
pub fn detect_edges(img: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (low, high) = if low <= high { (low, high) } else { (high, low) };
    canny(img, low, high)
}

pub fn intensity_stats(img: &GrayImage) -> (f64, f64) {
    mean_std(img.pixels().map(|p| p[0] as f64))
}
