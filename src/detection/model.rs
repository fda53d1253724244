use std::path::Path;

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;

use crate::detection::DetectorTier;
use crate::error::{Result, TableError};
use crate::models::BoundingBox;

/// Learned detection tier backed by an ocrs text-detection model.
///
/// The model locates word regions; the table region is their padded union.
pub struct TextLayoutDetector {
    engine: OcrEngine,
    padding: u32,
}

impl TextLayoutDetector {
    /// Load the detection model. Fails if the file is missing or unreadable.
    pub fn load(model_path: &Path, padding: u32) -> Result<Self> {
        if !model_path.exists() {
            return Err(TableError::backend_init(
                "text-layout",
                format!("model not found at {}", model_path.display()),
            ));
        }

        let detection_model =
            Model::load_file(model_path).map_err(|e| TableError::backend_init("text-layout", e))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: None,
            ..Default::default()
        })
        .map_err(|e| TableError::backend_init("text-layout", e))?;

        Ok(Self { engine, padding })
    }

    fn detect_region(&self, image: &DynamicImage) -> Result<Option<BoundingBox>> {
        let rgb = image.to_rgb8();
        let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|e| TableError::Detection(e.to_string()))?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|e| TableError::Detection(e.to_string()))?;
        let words = self
            .engine
            .detect_words(&input)
            .map_err(|e| TableError::Detection(e.to_string()))?;

        let corners = words
            .iter()
            .map(|word| word.corners().map(|p| (p.x, p.y)));
        Ok(padded_union(corners, self.padding))
    }
}

/// Axis-aligned box around every corner, grown by `padding` on each side.
///
/// `None` when there are no corners.
pub(crate) fn padded_union(
    corners: impl IntoIterator<Item = [(f32, f32); 4]>,
    padding: u32,
) -> Option<BoundingBox> {
    let (l, t, r, b) = corners
        .into_iter()
        .flatten()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .fold(None, |acc: Option<(f32, f32, f32, f32)>, (x, y)| {
            Some(match acc {
                Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
                None => (x, y, x, y),
            })
        })?;

    let pad = padding as f32;
    BoundingBox::new(
        (l - pad).floor() as i32,
        (t - pad).floor() as i32,
        (r + pad).ceil() as i32,
        (b + pad).ceil() as i32,
    )
}

impl DetectorTier for TextLayoutDetector {
    fn name(&self) -> &str {
        "text-layout"
    }

    fn try_detect(&self, image: &DynamicImage) -> Option<Vec<BoundingBox>> {
        match self.detect_region(image) {
            Ok(region) => region.map(|b| vec![b]),
            Err(e) => {
                tracing::warn!(error = %e, "learned detector failed, falling through");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(l: f32, t: f32, r: f32, b: f32) -> [(f32, f32); 4] {
        [(l, t), (r, t), (r, b), (l, b)]
    }

    #[test]
    fn union_covers_all_words_plus_padding() {
        let words = vec![rect(40.0, 30.0, 90.0, 45.0), rect(120.5, 60.0, 180.2, 75.7)];
        let bbox = padded_union(words, 10).unwrap();
        assert_eq!((bbox.x1(), bbox.y1(), bbox.x2(), bbox.y2()), (30, 20, 191, 86));
    }

    #[test]
    fn rotated_corners_are_bounded() {
        let tilted = [(50.0, 20.0), (100.0, 30.0), (95.0, 55.0), (45.0, 45.0)];
        let bbox = padded_union([tilted], 0).unwrap();
        assert_eq!((bbox.x1(), bbox.y1(), bbox.x2(), bbox.y2()), (45, 20, 100, 55));
    }

    #[test]
    fn no_words_means_no_region() {
        assert!(padded_union(Vec::new(), 10).is_none());
    }

    #[test]
    fn single_point_needs_padding_to_form_a_box() {
        let point = [(10.0, 10.0); 4];
        assert!(padded_union([point], 0).is_none());
        assert_eq!(padded_union([point], 2).map(|b| b.area()), Some(16));
    }
}
