//! Table region detection and cropping.
//!
//! Detection is a chain of [`DetectorTier`]s tried in order. The first tier
//! that returns at least one box wins; if none does, the whole image is
//! returned as a single region, so detection never comes back empty.

pub mod contours;
pub mod model;

use std::time::Instant;

use image::DynamicImage;

use crate::config::DetectConfig;
use crate::error::TableError;
use crate::models::BoundingBox;
use crate::telemetry::Telemetry;
use contours::ContourDetector;
use model::TextLayoutDetector;

/// Name reported when the whole-image fallback was used.
pub const WHOLE_IMAGE_TIER: &str = "whole-image";

/// One strategy level in the detection chain.
pub trait DetectorTier: Send + Sync {
    fn name(&self) -> &str;

    /// `None` (or an empty list) hands over to the next tier.
    fn try_detect(&self, image: &DynamicImage) -> Option<Vec<BoundingBox>>;
}

/// Boxes found plus which tier found them.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub boxes: Vec<BoundingBox>,
    pub tier: String,
    /// Nothing specific was found; the whole image stands in for the table.
    pub degraded: bool,
}

/// Tiered table detector.
pub struct TableDetector {
    tiers: Vec<Box<dyn DetectorTier>>,
    model_error: Option<TableError>,
    telemetry: Telemetry,
}

impl TableDetector {
    /// Learned tier (when configured and loadable) followed by the contour tier.
    pub fn new(config: &DetectConfig, telemetry: Telemetry) -> Self {
        let mut tiers: Vec<Box<dyn DetectorTier>> = Vec::new();
        let mut model_error = None;

        if let Some(path) = &config.model_path {
            match TextLayoutDetector::load(path, config.model_padding) {
                Ok(detector) => {
                    tracing::info!(model = %path.display(), "learned table detector loaded");
                    tiers.push(Box::new(detector));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "learned table detector unavailable");
                    model_error = Some(e);
                }
            }
        }
        tiers.push(Box::new(ContourDetector::from_config(config)));

        Self {
            tiers,
            model_error,
            telemetry,
        }
    }

    /// Detector with an explicit tier list (the whole-image fallback is implicit).
    pub fn with_tiers(tiers: Vec<Box<dyn DetectorTier>>, telemetry: Telemetry) -> Self {
        Self {
            tiers,
            model_error: None,
            telemetry,
        }
    }

    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Why the configured learned tier could not be loaded, if it failed.
    pub fn model_error(&self) -> Option<&TableError> {
        self.model_error.as_ref()
    }

    /// Candidate table boxes; never empty.
    pub fn detect(&self, image: &DynamicImage) -> Vec<BoundingBox> {
        self.detect_with_outcome(image).boxes
    }

    pub fn detect_with_outcome(&self, image: &DynamicImage) -> Detection {
        let _span = self.telemetry.span().enter();
        let start = Instant::now();

        let detection = self
            .tiers
            .iter()
            .find_map(|tier| {
                let boxes = tier.try_detect(image).filter(|b| !b.is_empty())?;
                Some(Detection {
                    boxes,
                    tier: tier.name().to_string(),
                    degraded: false,
                })
            })
            .unwrap_or_else(|| whole_image(image));

        if detection.degraded {
            tracing::warn!("no table found, treating the whole image as one table");
        } else {
            tracing::debug!(tier = %detection.tier, boxes = detection.boxes.len(), "tables detected");
        }
        self.telemetry.record("detect_ms", start.elapsed().as_secs_f64() * 1000.0);
        self.telemetry.record("tables", detection.boxes.len() as f64);
        detection
    }
}

fn whole_image(image: &DynamicImage) -> Detection {
    // Degenerate dimensions still get a valid (if unusable) box.
    let full = BoundingBox::full_image(image.width().max(1), image.height().max(1));
    Detection {
        boxes: full.into_iter().collect(),
        tier: WHOLE_IMAGE_TIER.to_string(),
        degraded: true,
    }
}

/// Crop each box out of `image`, after clamping it to the image bounds.
///
/// Boxes that clamp to nothing are dropped, so the result can be shorter
/// than `boxes`.
pub fn extract_table_regions(image: &DynamicImage, boxes: &[BoundingBox]) -> Vec<DynamicImage> {
    extract_regions_with_boxes(image, boxes)
        .into_iter()
        .map(|(_, region)| region)
        .collect()
}

/// Like [`extract_table_regions`], keeping the clamped box next to each crop.
pub fn extract_regions_with_boxes(
    image: &DynamicImage,
    boxes: &[BoundingBox],
) -> Vec<(BoundingBox, DynamicImage)> {
    let (width, height) = (image.width(), image.height());
    boxes
        .iter()
        .filter_map(|bbox| {
            let clamped = bbox.clamp_to(width, height)?;
            let crop = image.crop_imm(
                clamped.x1() as u32,
                clamped.y1() as u32,
                clamped.width(),
                clamped.height(),
            );
            Some((clamped, crop))
        })
        .collect()
}
