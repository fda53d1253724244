use serde::{Deserialize, Serialize};

use crate::geometry::Quad;

/// Engine identifier of the placeholder fragment emitted when no backend ran.
pub const SENTINEL_SOURCE: &str = "none";

/// Axis-aligned table region in source-image pixel coordinates.
///
/// Always satisfies `x2 > x1` and `y2 > y1`. Coordinates may lie outside the
/// image; the region extractor clamps them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BoxCorners")]
pub struct BoundingBox {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

impl BoundingBox {
    /// Returns `None` unless the box has positive width and height.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
        if x2 > x1 && y2 > y1 {
            Some(Self { x1, y1, x2, y2 })
        } else {
            None
        }
    }

    /// Box covering a whole `width` x `height` image.
    pub fn full_image(width: u32, height: u32) -> Option<Self> {
        Self::new(0, 0, clamp_to_i32(width), clamp_to_i32(height))
    }

    pub fn x1(&self) -> i32 {
        self.x1
    }

    pub fn y1(&self) -> i32 {
        self.y1
    }

    pub fn x2(&self) -> i32 {
        self.x2
    }

    pub fn y2(&self) -> i32 {
        self.y2
    }

    pub fn width(&self) -> u32 {
        (self.x2 - self.x1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1) as u32
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Clamp into `[0, width] x [0, height]`; `None` if nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Self> {
        let w = clamp_to_i32(width);
        let h = clamp_to_i32(height);
        Self::new(
            self.x1.clamp(0, w),
            self.y1.clamp(0, h),
            self.x2.clamp(0, w),
            self.y2.clamp(0, h),
        )
    }
}

/// Unchecked wire form of a [`BoundingBox`].
#[derive(Deserialize)]
struct BoxCorners {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

impl TryFrom<BoxCorners> for BoundingBox {
    type Error = String;

    fn try_from(c: BoxCorners) -> Result<Self, Self::Error> {
        BoundingBox::new(c.x1, c.y1, c.x2, c.y2).ok_or_else(|| {
            format!(
                "bounding box ({}, {})-({}, {}) has no area",
                c.x1, c.y1, c.x2, c.y2
            )
        })
    }
}

fn clamp_to_i32(v: u32) -> i32 {
    v.min(i32::MAX as u32) as i32
}

/// A recognized text span, normalized to the same shape for every engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    pub quad: Quad,
    pub text: String,
    /// Always within `[0, 1]`.
    pub confidence: f32,
    /// Identifier of the engine that produced the fragment.
    pub source: String,
}

impl TextFragment {
    /// Placeholder covering a whole image, used when no engine produced output.
    pub fn placeholder(width: u32, height: u32) -> Self {
        Self {
            quad: Quad::from_rect(0.0, 0.0, width as f32, height as f32),
            text: String::new(),
            confidence: 0.0,
            source: SENTINEL_SOURCE.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == SENTINEL_SOURCE
    }
}

/// Dense `rows x cols` grid of cell strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableGrid {
    row_count: usize,
    col_count: usize,
    cells: Vec<Vec<String>>,
}

impl TableGrid {
    /// Grid with every cell set to the empty string.
    pub fn new(row_count: usize, col_count: usize) -> Self {
        Self {
            row_count,
            col_count,
            cells: vec![vec![String::new(); col_count]; row_count],
        }
    }

    /// The `1x1` grid returned when there is nothing to analyze.
    pub fn empty() -> Self {
        Self::new(1, 1)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.cells.get(row)?.get(col).map(String::as_str)
    }

    /// Overwrite a cell. Returns false if the index is out of range.
    pub fn set(&mut self, row: usize, col: usize, text: impl Into<String>) -> bool {
        match self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(cell) => {
                *cell = text.into();
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.cells
    }

    /// True if every cell is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().flatten().all(|c| c.trim().is_empty())
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_boxes_are_rejected() {
        assert!(BoundingBox::new(10, 10, 10, 20).is_none());
        assert!(BoundingBox::new(10, 10, 5, 20).is_none());
        assert!(BoundingBox::full_image(0, 10).is_none());
    }

    #[test]
    fn clamp_trims_to_image() {
        let bbox = BoundingBox::new(-5, 20, 120, 90).unwrap();
        let clamped = bbox.clamp_to(100, 50).unwrap();
        assert_eq!((clamped.x1(), clamped.y1(), clamped.x2(), clamped.y2()), (0, 20, 100, 50));
        assert_eq!(clamped.area(), 3000);
    }

    #[test]
    fn clamp_outside_is_none() {
        let bbox = BoundingBox::new(150, 0, 200, 10).unwrap();
        assert!(bbox.clamp_to(100, 100).is_none());
    }

    #[test]
    fn deserialization_enforces_positive_size() {
        let ok: BoundingBox = toml::from_str("x1 = 1\ny1 = 2\nx2 = 11\ny2 = 7\n").unwrap();
        assert_eq!((ok.width(), ok.height()), (10, 5));

        let flat = toml::from_str::<BoundingBox>("x1 = 5\ny1 = 0\nx2 = 5\ny2 = 9\n");
        assert!(flat.is_err());
        let inverted = toml::from_str::<BoundingBox>("x1 = 0\ny1 = 9\nx2 = 4\ny2 = 1\n");
        assert!(inverted.is_err());
    }

    #[test]
    fn grid_set_out_of_range_is_refused() {
        let mut grid = TableGrid::new(2, 3);
        assert!(grid.set(1, 2, "x"));
        assert!(!grid.set(2, 0, "y"));
        assert_eq!(grid.get(1, 2), Some("x"));
        assert_eq!(grid.into_rows().len(), 2);
    }
}
