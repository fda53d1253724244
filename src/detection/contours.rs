use image::{DynamicImage, GrayImage};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length};

use crate::config::DetectConfig;
use crate::detection::DetectorTier;
use crate::models::BoundingBox;
use crate::preprocessing::filters;

/// Geometric table finder: edges, outer contours, rectangular-ish filter.
#[derive(Debug, Clone)]
pub struct ContourDetector {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    pub min_area_ratio: f64,
    pub approx_epsilon_ratio: f64,
    pub min_vertices: usize,
}

impl ContourDetector {
    pub fn from_config(config: &DetectConfig) -> Self {
        Self {
            blur_sigma: config.blur_sigma,
            canny_low: config.canny_low,
            canny_high: config.canny_high,
            min_area_ratio: config.min_area_ratio,
            approx_epsilon_ratio: config.approx_epsilon_ratio,
            min_vertices: config.min_vertices,
        }
    }

    /// Candidate boxes sorted by area, largest first.
    pub fn find_tables(&self, gray: &GrayImage) -> Vec<BoundingBox> {
        let (width, height) = gray.dimensions();
        let min_area = width as f64 * height as f64 * self.min_area_ratio;

        let blurred = filters::apply_blur(gray, self.blur_sigma);
        let edges = filters::detect_edges(&blurred, self.canny_low, self.canny_high);
        let contours: Vec<Contour<i32>> = find_contours(&edges);

        let mut boxes: Vec<BoundingBox> = contours
            .iter()
            // Outermost borders only
            .filter(|c| c.parent.is_none() && matches!(c.border_type, BorderType::Outer))
            .filter_map(|c| {
                let bbox = bounding_rect(c)?;
                if (bbox.area() as f64) <= min_area {
                    return None;
                }
                let epsilon = self.approx_epsilon_ratio * arc_length(&c.points, true);
                let approx = approximate_polygon_dp(&c.points, epsilon, true);
                (approx.len() >= self.min_vertices).then_some(bbox)
            })
            .collect();

        boxes.sort_by(|a, b| b.area().cmp(&a.area()));
        tracing::debug!(
            contours = contours.len(),
            kept = boxes.len(),
            "contour table candidates"
        );
        boxes
    }
}

impl DetectorTier for ContourDetector {
    fn name(&self) -> &str {
        "contour"
    }

    fn try_detect(&self, image: &DynamicImage) -> Option<Vec<BoundingBox>> {
        let boxes = self.find_tables(&filters::to_grayscale(image));
        (!boxes.is_empty()).then_some(boxes)
    }
}

/// Pixel-inclusive bounding rectangle of a contour, as `(x1, y1, x2, y2)` with
/// exclusive right/bottom edges.
fn bounding_rect(contour: &Contour<i32>) -> Option<BoundingBox> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    BoundingBox::new(min_x, min_y, max_x + 1, max_y + 1)
}
