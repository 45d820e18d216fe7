//! Least-squares calibration of a model set.
//!
//! Given:
//! - a model set with some free (bounded) parameters
//! - observations `(x_i, r_i)`
//!
//! we minimize `Σ (rate(x_i) - r_i)^2` over the free parameters, where
//! `rate` is the combined rate of every layer fed the same input. Constants
//! are never touched and the input model set is never mutated.

use log::{debug, info, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::domain::Observation;
use crate::error::FitError;
use crate::fit::{DEFAULT_LBFGS_MEM, Lbfgs, LeastSquaresSolver};
use crate::models::ModelSet;

/// Solver stopping rules, loadable from a run config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    pub max_iter: usize,
    /// L-BFGS stops once the gradient norm falls below this.
    pub grad_tol: f64,
    /// ... or once the change in cost does.
    pub cost_tol: f64,
    /// Number of correction pairs kept by L-BFGS.
    pub memory: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iter: 500,
            grad_tol: 1e-12,
            cost_tol: 1e-24,
            memory: DEFAULT_LBFGS_MEM,
        }
    }
}

/// Result of a successful fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    pub models: ModelSet,
    pub sse: f64,
    pub rmse: f64,
    /// Number of observations.
    pub n: usize,
    pub iterations: usize,
}

/// Fit with the default L-BFGS solver.
pub fn fit(models: &ModelSet, observations: &[Observation], opts: &FitOptions) -> Result<FitOutcome, FitError> {
    fit_with(models, observations, &Lbfgs(*opts))
}

/// Fit with any solver.
pub fn fit_with<S>(models: &ModelSet, observations: &[Observation], solver: &S) -> Result<FitOutcome, FitError>
where
    S: LeastSquaresSolver + ?Sized,
{
    if observations.is_empty() {
        return Err(FitError::NoObservations);
    }
    if let Some((index, o)) = observations
        .iter()
        .enumerate()
        .find(|(_, o)| !o.input.is_finite() || !o.rate.is_finite())
    {
        return Err(FitError::NonFiniteObservation {
            index,
            input: o.input,
            rate: o.rate,
        });
    }
    for layer in models {
        layer.model.validate()?;
    }

    let free = models.free_params();
    if free.is_empty() {
        return Err(FitError::NoFreeParameters);
    }
    let x0: Vec<f64> = free.iter().map(|p| p.value).collect();
    let bounds: Vec<(f64, f64)> = free.iter().map(|p| (p.lower, p.upper)).collect();

    info!(
        "fitting {} free parameter(s) to {} observation(s)",
        free.len(),
        observations.len()
    );

    let residuals = |x: &[f64]| -> DVector<f64> {
        match models.with_free_values(x) {
            Ok(trial) => DVector::from_iterator(
                observations.len(),
                observations.iter().map(|o| trial.rate(o.input) - o.rate),
            ),
            Err(_) => DVector::from_element(observations.len(), f64::NAN),
        }
    };

    let solution = solver.solve(&residuals, &x0, &bounds).inspect_err(|e| {
        warn!("fit failed: {e}");
    })?;

    let fitted = models.with_free_values(&solution.x)?;
    for layer in &fitted {
        layer.model.validate().inspect_err(|e| {
            warn!("solver returned an invalid `{}` model: {e}", layer.variable);
        })?;
    }
    let n = observations.len();
    let rmse = (solution.cost / n as f64).sqrt();
    debug!(
        "fit converged in {} iteration(s): sse={:.3e} rmse={:.3e}",
        solution.iterations, solution.cost, rmse
    );

    Ok(FitOutcome {
        models: fitted,
        sse: solution.cost,
        rmse,
        n,
        iterations: solution.iterations,
    })
}
