//! Grid reconstruction shared by the identity and answer decoders.
//!
//! Mark centres are collapsed into row and column lines with a greedy 1-D
//! clustering pass, and marks are then indexed relative to the first line
//! using the median spacing between lines.

use float_ord::FloatOrd;

use crate::{
    classify::Mark,
    stats::{mean, median_gap},
};

/// Lower bound of the clustering tolerance, in pixels.
pub const MIN_TOLERANCE: f64 = 10.0;
/// Fraction of the estimated bubble diameter accepted as positional jitter.
pub const TOLERANCE_FACTOR: f64 = 0.6;

/// One logical row or column: the mean of a run of nearby coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterLine {
    pub position: f64,
    pub members: usize,
}

/// Greedy left-to-right clustering.
///
/// Values are sorted and a new cluster starts whenever the distance to the
/// previous value exceeds `tolerance`. Decisions are never revisited.
pub fn cluster_1d(values: &[f64], tolerance: f64) -> Vec<ClusterLine> {
    let mut sorted = values.iter().copied().map(FloatOrd).collect::<Vec<_>>();
    sorted.sort();

    let mut lines = Vec::new();
    let mut current: Vec<f64> = Vec::new();
    for FloatOrd(value) in sorted {
        if let Some(&last) = current.last() {
            if value - last > tolerance {
                lines.push(collapse(&current));
                current.clear();
            }
        }
        current.push(value);
    }
    if !current.is_empty() {
        lines.push(collapse(&current));
    }
    lines
}

fn collapse(values: &[f64]) -> ClusterLine {
    ClusterLine {
        position: values.iter().sum::<f64>() / values.len() as f64,
        members: values.len(),
    }
}

pub fn positions(lines: &[ClusterLine]) -> Vec<f64> {
    lines.iter().map(|line| line.position).collect()
}

/// Square root of the mean mark area, an estimate of one bubble's diameter.
pub fn estimated_diameter(marks: &[Mark]) -> f64 {
    let areas = marks.iter().map(|mark| mark.area).collect::<Vec<_>>();
    mean(&areas).unwrap_or(0.0).sqrt()
}

/// Clustering tolerance for a set of marks: `max(10, 0.6 * diameter)`.
pub fn tolerance(marks: &[Mark]) -> f64 {
    MIN_TOLERANCE.max(estimated_diameter(marks) * TOLERANCE_FACTOR)
}

/// Grid index of `position` relative to `origin`, rounding half to even.
pub fn grid_index(position: f64, origin: f64, step: f64) -> i64 {
    ((position - origin) / step).round_ties_even() as i64
}

/// Highest-density marked bubble. Equal densities resolve to the topmost,
/// then leftmost mark so the result never depends on input order.
pub fn best_mark<'a>(marks: impl IntoIterator<Item = &'a Mark>) -> Option<&'a Mark> {
    marks
        .into_iter()
        .filter(|mark| mark.marked)
        .max_by(|a, b| {
            FloatOrd(a.density)
                .cmp(&FloatOrd(b.density))
                .then_with(|| FloatOrd(b.y).cmp(&FloatOrd(a.y)))
                .then_with(|| FloatOrd(b.x).cmp(&FloatOrd(a.x)))
        })
}

/// A run of adjacent answer columns read as one independent group of questions.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Column line positions, ascending and never empty.
    columns: Vec<f64>,
}

impl Block {
    /// `None` for an empty column list.
    pub fn new(mut columns: Vec<f64>) -> Option<Self> {
        if columns.is_empty() {
            return None;
        }
        columns.sort_by_key(|x| FloatOrd(*x));
        Some(Self { columns })
    }

    pub fn columns(&self) -> &[f64] {
        &self.columns
    }

    pub fn start(&self) -> f64 {
        self.columns[0]
    }

    pub fn end(&self) -> f64 {
        self.columns[self.columns.len() - 1]
    }

    /// Horizontal span widened by `tolerance` on both sides.
    pub fn contains(&self, x: f64, tolerance: f64) -> bool {
        x >= self.start() - tolerance && x <= self.end() + tolerance
    }

    /// Median spacing between the block's columns, `fallback` with one column.
    pub fn column_step(&self, fallback: f64) -> f64 {
        median_gap(&self.columns).unwrap_or(fallback)
    }
}

/// Gap above which two neighbouring column lines belong to different blocks:
/// `max(2.5 * median gap, 3 * diameter)`.
pub fn block_separation(columns: &[f64], diameter: f64) -> f64 {
    let min_separation = diameter * 3.0;
    match median_gap(columns) {
        Some(gap) => (gap * 2.5).max(min_separation),
        None => min_separation,
    }
}

/// Splits ascending column lines wherever the gap exceeds `separation`.
pub fn segment_blocks(columns: &[f64], separation: f64) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Vec<f64> = Vec::new();
    for &x in columns {
        if let Some(&last) = current.last() {
            if x - last > separation {
                blocks.push(Block {
                    columns: std::mem::take(&mut current),
                });
            }
        }
        current.push(x);
    }
    if !current.is_empty() {
        blocks.push(Block { columns: current });
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(x: f64, y: f64, density: f64) -> Mark {
        Mark::new(x, y, 400.0, density, 0.32)
    }

    #[test]
    fn clusters_nearby_positions() {
        let lines = cluster_1d(&[110.0, 12.0, 55.0, 10.0, 58.0], 15.0);
        assert_eq!(positions(&lines), vec![11.0, 56.5, 110.0]);
        assert_eq!(lines[0].members, 2);
        assert_eq!(lines[2].members, 1);
    }

    #[test]
    fn clustering_chains_through_close_neighbours() {
        let lines = cluster_1d(&[0.0, 8.0, 16.0, 24.0], 10.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].position, 12.0);
    }

    #[test]
    fn clustering_empty() {
        assert!(cluster_1d(&[], 10.0).is_empty());
    }

    #[test]
    fn tolerance_has_floor() {
        assert_eq!(tolerance(&[Mark::new(0.0, 0.0, 25.0, 0.5, 0.32)]), 10.0);
        let tol = tolerance(&[Mark::new(0.0, 0.0, 900.0, 0.5, 0.32)]);
        assert!((tol - 18.0).abs() < 1e-9);
    }

    #[test]
    fn splits_two_blocks() {
        let blocks = segment_blocks(&[10.0, 40.0, 70.0, 300.0, 330.0, 360.0], 100.0);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].columns(), [10.0, 40.0, 70.0]);
        assert_eq!(blocks[1].columns(), [300.0, 330.0, 360.0]);
    }

    #[test]
    fn block_needs_a_column() {
        assert_eq!(Block::new(Vec::new()), None);
        let block = Block::new(vec![70.0, 10.0, 40.0]).unwrap();
        assert_eq!((block.start(), block.end()), (10.0, 70.0));
        assert_eq!(block.column_step(100.0), 30.0);
    }

    #[test]
    fn separation_uses_larger_bound() {
        let columns = [10.0, 40.0, 70.0, 300.0, 330.0, 360.0];
        assert_eq!(block_separation(&columns, 20.0), 75.0);
        assert_eq!(block_separation(&columns, 40.0), 120.0);
        assert_eq!(block_separation(&[10.0], 20.0), 60.0);
    }

    #[test]
    fn block_step_falls_back_with_one_column() {
        let block = Block::new(vec![50.0]).unwrap();
        assert_eq!(block.column_step(100.0), 100.0);
        assert!(block.contains(60.0, 12.0));
        assert!(!block.contains(63.0, 12.0));
    }

    #[test]
    fn index_rounds_half_to_even() {
        assert_eq!(grid_index(150.0, 100.0, 20.0), 2);
        assert_eq!(grid_index(170.0, 100.0, 20.0), 4);
        assert_eq!(grid_index(131.0, 100.0, 20.0), 2);
    }

    #[test]
    fn best_mark_ignores_input_order() {
        let a = mark(10.0, 10.0, 0.6);
        let b = mark(10.0, 50.0, 0.9);
        let c = mark(10.0, 90.0, 0.1);
        assert_eq!(best_mark(&[a, b, c]), Some(&b));
        assert_eq!(best_mark(&[c, b, a]), Some(&b));
        assert_eq!(best_mark(&[c]), None);
    }

    #[test]
    fn best_mark_breaks_density_ties_by_position() {
        let upper = mark(10.0, 10.0, 0.8);
        let lower = mark(10.0, 50.0, 0.8);
        assert_eq!(best_mark(&[upper, lower]), Some(&upper));
        assert_eq!(best_mark(&[lower, upper]), Some(&upper));
    }
}
