//! Summary statistics of output grids.

use nalgebra::DMatrix;

use crate::domain::{OutputSeries, is_missing};

/// Statistics over the non-missing cells of one grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridStats {
    pub valid: usize,
    pub missing: usize,
    /// NaN when no cell is valid (same for `max` and `mean`).
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl GridStats {
    pub fn of(grid: &DMatrix<f64>, sentinel: f64) -> Self {
        let mut valid = 0usize;
        let mut missing = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;

        for &v in grid.iter() {
            if is_missing(v, sentinel) || !v.is_finite() {
                missing += 1;
                continue;
            }
            valid += 1;
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }

        if valid == 0 {
            return Self {
                valid,
                missing,
                min: f64::NAN,
                max: f64::NAN,
                mean: f64::NAN,
            };
        }
        Self {
            valid,
            missing,
            min,
            max,
            mean: sum / valid as f64,
        }
    }
}

/// Stats for every frame of a series, in order.
pub fn series_stats(series: &OutputSeries) -> Vec<GridStats> {
    series.iter().map(|f| GridStats::of(&f.grid, series.missing())).collect()
}
