//! Shared geometry and 1-D clustering helpers.

use serde::{Deserialize, Serialize};

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Four ordered corner points: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    /// Build a quad from an axis-aligned rectangle.
    pub fn from_rect(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Quad([
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ])
    }

    /// Build a quad from `[x, y]` pairs in TL, TR, BR, BL order.
    pub fn from_points(points: [(f32, f32); 4]) -> Self {
        Quad(points.map(|(x, y)| Point::new(x, y)))
    }

    pub fn top_left(&self) -> Point {
        self.0[0]
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.0
    }

    /// Smallest axis-aligned rectangle `(left, top, right, bottom)` containing the quad.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        let mut left = f32::MAX;
        let mut top = f32::MAX;
        let mut right = f32::MIN;
        let mut bottom = f32::MIN;
        for p in &self.0 {
            left = left.min(p.x);
            top = top.min(p.y);
            right = right.max(p.x);
            bottom = bottom.max(p.y);
        }
        (left, top, right, bottom)
    }
}

/// A band of scalar coordinates that all belong to one row or one column.
///
/// Values are kept sorted ascending; consecutive values differ by at most the
/// threshold the cluster was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateCluster {
    values: Vec<f32>,
}

impl CoordinateCluster {
    fn start(value: f32) -> Self {
        Self { values: vec![value] }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> f32 {
        self.values.first().copied().unwrap_or(f32::NAN)
    }

    pub fn max(&self) -> f32 {
        self.values.last().copied().unwrap_or(f32::NAN)
    }

    /// Inclusive span membership test.
    pub fn contains(&self, value: f32) -> bool {
        self.min() <= value && value <= self.max()
    }
}

/// Single-linkage clustering of scalars along one axis.
///
/// The values are sorted and walked in order; a new cluster starts whenever
/// the gap to the previous value exceeds `threshold`. NaN values are skipped.
pub fn cluster_coordinates(values: &[f32], threshold: f32) -> Vec<CoordinateCluster> {
    let mut sorted: Vec<f32> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f32::total_cmp);

    let mut clusters: Vec<CoordinateCluster> = Vec::new();
    for value in sorted {
        match clusters.last_mut() {
            Some(current) if value - current.max() <= threshold => current.values.push(value),
            _ => clusters.push(CoordinateCluster::start(value)),
        }
    }
    clusters
}

/// Index of the first cluster whose span contains `value`.
pub fn find_cluster_index(value: f32, clusters: &[CoordinateCluster]) -> Option<usize> {
    clusters.iter().position(|c| c.contains(value))
}

/// Mean and population standard deviation of a sample.
pub fn mean_std(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut count = 0u64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for v in values {
        count += 1;
        sum += v;
        sum_sq += v * v;
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
    (mean, variance.sqrt())
}

/// Median of a sample; `None` when empty.
pub fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clusters_split_on_large_gaps() {
        let clusters = cluster_coordinates(&[100.0, 5.0, 52.0, 7.0, 50.0], 10.0);
        let spans: Vec<(f32, f32)> = clusters.iter().map(|c| (c.min(), c.max())).collect();
        assert_eq!(spans, vec![(5.0, 7.0), (50.0, 52.0), (100.0, 100.0)]);
    }

    #[test]
    fn gap_equal_to_threshold_stays_in_cluster() {
        let clusters = cluster_coordinates(&[0.0, 10.0, 20.0], 10.0);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn empty_input_gives_no_clusters() {
        assert!(cluster_coordinates(&[], 10.0).is_empty());
        assert!(cluster_coordinates(&[f32::NAN], 10.0).is_empty());
    }

    #[test]
    fn cluster_lookup_is_inclusive() {
        let clusters = cluster_coordinates(&[5.0, 7.0, 50.0], 10.0);
        assert_eq!(find_cluster_index(5.0, &clusters), Some(0));
        assert_eq!(find_cluster_index(7.0, &clusters), Some(0));
        assert_eq!(find_cluster_index(30.0, &clusters), None);
        assert_eq!(find_cluster_index(50.0, &clusters), Some(1));
    }

    #[test]
    fn median_of_even_and_odd_samples() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn mean_std_of_constant_sample() {
        let (mean, std) = mean_std([4.0, 4.0, 4.0].into_iter());
        assert_eq!(mean, 4.0);
        assert_eq!(std, 0.0);
    }
}
