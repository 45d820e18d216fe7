//! Cell-wise evaluation of one frame and reduction of several.
//!
//! Cells are independent, so both passes can run on the rayon pool.

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::domain::{Band, RasterFrame, Unit, is_missing};
use crate::engine::Reducer;
use crate::error::{EngineError, UnitError};
use crate::models::{ModelSet, contributions};
use crate::units::UnitConverter;

/// Combined rate grid for one frame.
///
/// A cell is `missing_out` when any layer's input is missing there, or when the
/// combined rate is not finite.
pub(crate) fn evaluate_frame<C>(
    models: &ModelSet,
    frame: &RasterFrame,
    converter: &C,
    missing_out: f64,
    parallel: bool,
) -> Result<DMatrix<f64>, EngineError>
where
    C: UnitConverter + ?Sized,
{
    let (nrows, ncols) = frame.shape()?;

    // One converted column per layer; NaN marks missing or unconvertible cells.
    let mut inputs: Vec<Vec<f64>> = Vec::with_capacity(models.len());
    for layer in models {
        let band = frame.band(&layer.variable).ok_or_else(|| EngineError::MissingVariable {
            variable: layer.variable.clone(),
            time: frame.time(),
        })?;
        let converted = convert_band(band, frame.missing(), &layer.unit, converter, parallel).map_err(|source| {
            EngineError::Unit {
                variable: layer.variable.clone(),
                source,
            }
        })?;
        inputs.push(converted);
    }

    let data = fill_cells(nrows * ncols, parallel, |idx, _| {
        if inputs.iter().any(|col| col[idx].is_nan()) {
            return missing_out;
        }
        let combined = contributions(models.iter().map(|l| &l.model).zip(inputs.iter().map(|col| col[idx]))).combined();
        if combined.is_finite() { combined } else { missing_out }
    });

    Ok(DMatrix::from_vec(nrows, ncols, data))
}

/// Cell-wise reduction of per-frame combined grids of equal shape.
///
/// A cell missing in any grid stays missing; a non-finite reduction becomes
/// missing.
pub(crate) fn reduce_grids(grids: &[DMatrix<f64>], reducer: &Reducer, missing: f64, parallel: bool) -> DMatrix<f64> {
    let Some(first) = grids.first() else {
        return DMatrix::zeros(0, 0);
    };
    let (nrows, ncols) = first.shape();

    let data = fill_cells(nrows * ncols, parallel, |idx, buf| {
        buf.clear();
        for grid in grids {
            let v = grid.as_slice()[idx];
            if is_missing(v, missing) {
                return missing;
            }
            buf.push(v);
        }
        let reduced = reducer.reduce(buf);
        if reduced.is_finite() { reduced } else { missing }
    });

    DMatrix::from_vec(nrows, ncols, data)
}

fn convert_band<C>(band: &Band, missing: f64, target: &Unit, converter: &C, parallel: bool) -> Result<Vec<f64>, UnitError>
where
    C: UnitConverter + ?Sized,
{
    let cells = band.grid.as_slice();
    let convert = |&v: &f64| -> Result<f64, UnitError> {
        if is_missing(v, missing) || v.is_nan() {
            Ok(f64::NAN)
        } else if band.unit == *target {
            Ok(v)
        } else {
            converter.convert(v, &band.unit, target)
        }
    };

    if parallel {
        cells.par_iter().map(convert).collect()
    } else {
        cells.iter().map(convert).collect()
    }
}

/// Evaluate `f(cell_index, scratch)` for every cell, in parallel or not.
fn fill_cells<F>(n: usize, parallel: bool, f: F) -> Vec<f64>
where
    F: Fn(usize, &mut Vec<f64>) -> f64 + Sync + Send,
{
    if parallel {
        (0..n).into_par_iter().map_init(Vec::new, |buf, idx| f(idx, buf)).collect()
    } else {
        let mut buf = Vec::new();
        (0..n).map(|idx| f(idx, &mut buf)).collect()
    }
}
