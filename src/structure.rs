//! Row/column reconstruction from unordered text fragments.

use image::Rgb;

use crate::config::StructureConfig;
use crate::geometry::{CoordinateCluster, cluster_coordinates, find_cluster_index};
use crate::models::{TableGrid, TextFragment};
use crate::telemetry::Telemetry;

/// Groups fragments into row and column bands and lays them out on a grid.
#[derive(Debug, Clone)]
pub struct StructureAnalyzer {
    row_threshold: f32,
    col_threshold: f32,
    telemetry: Telemetry,
}

impl StructureAnalyzer {
    pub fn new(config: &StructureConfig, telemetry: Telemetry) -> Self {
        Self {
            row_threshold: config.row_threshold,
            col_threshold: config.col_threshold,
            telemetry,
        }
    }

    /// Row bands over the fragments' top-left y coordinates.
    pub fn row_bands(&self, fragments: &[TextFragment]) -> Vec<CoordinateCluster> {
        let ys: Vec<f32> = fragments.iter().map(|f| f.quad.top_left().y).collect();
        cluster_coordinates(&ys, self.row_threshold)
    }

    /// Column bands over the fragments' top-left x coordinates.
    pub fn col_bands(&self, fragments: &[TextFragment]) -> Vec<CoordinateCluster> {
        let xs: Vec<f32> = fragments.iter().map(|f| f.quad.top_left().x).collect();
        cluster_coordinates(&xs, self.col_threshold)
    }

    /// Place every fragment into the `rows x cols` grid its bands define.
    ///
    /// When two fragments land in the same cell the later one wins.
    pub fn analyze(&self, fragments: &[TextFragment]) -> TableGrid {
        let _span = self.telemetry.span().enter();
        if fragments.is_empty() {
            tracing::debug!("no fragments, returning empty grid");
            return TableGrid::empty();
        }

        let rows = self.row_bands(fragments);
        let cols = self.col_bands(fragments);
        // Only NaN coordinates can leave a band list empty.
        if rows.is_empty() || cols.is_empty() {
            tracing::warn!("fragments carry no usable coordinates, returning empty grid");
            return TableGrid::empty();
        }

        let mut grid = TableGrid::new(rows.len(), cols.len());
        let mut placed = 0usize;
        for fragment in fragments {
            let corner = fragment.quad.top_left();
            let (Some(row), Some(col)) = (
                find_cluster_index(corner.y, &rows),
                find_cluster_index(corner.x, &cols),
            ) else {
                continue;
            };
            grid.set(row, col, fragment.text.clone());
            placed += 1;
        }

        tracing::debug!(
            rows = grid.row_count(),
            cols = grid.col_count(),
            placed,
            "table structure built"
        );
        self.telemetry.record("rows", grid.row_count() as f64);
        self.telemetry.record("cols", grid.col_count() as f64);
        grid
    }
}

/// Colour used when drawing band boundaries into debug images.
pub(crate) const BAND_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
