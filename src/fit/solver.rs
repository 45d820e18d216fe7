//! Bounded least squares on top of `argmin`.
//!
//! The fitter only sees the [`LeastSquaresSolver`] seam. The default
//! implementation minimizes the sum of squared residuals with L-BFGS and a
//! More–Thuente line search:
//!
//! - free parameters are rescaled to `[0, 1]` by their bounds, so a rate near
//!   0.3 and an enthalpy near 1e5 move on comparable scales
//! - trial points are clamped back into the box before the residuals run
//! - the gradient `2 Jᵀ r` uses a central-difference Jacobian
//! - the best point seen is kept even when the line search gives up

use std::sync::{Mutex, PoisonError};

use argmin::core::{CostFunction, Error, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use log::debug;
use nalgebra::DVector;
use ndarray::Array1;

use crate::error::FitError;
use crate::fit::FitOptions;

/// Parameter vector in unit-scaled coordinates.
pub type Theta = Array1<f64>;
pub type Grad = Array1<f64>;

pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, f64>;
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, f64>;

/// Default L-BFGS history size.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Residual vector as a function of the free parameters.
pub type Residuals<'a> = dyn Fn(&[f64]) -> DVector<f64> + Sync + 'a;

/// Largest projected-gradient component (unit-scaled) accepted as a
/// stationary point when the solver stops without converging.
const STATIONARY_TOL: f64 = 1e-6;

/// Minimizer output.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub x: Vec<f64>,
    /// Sum of squared residuals at `x`.
    pub cost: f64,
    pub iterations: usize,
}

/// A bounded nonlinear least-squares minimizer.
pub trait LeastSquaresSolver {
    /// Minimize `|residuals(x)|^2` from `x0` with `x[j]` kept in `bounds[j]`.
    fn solve(&self, residuals: &Residuals<'_>, x0: &[f64], bounds: &[(f64, f64)]) -> Result<Solution, FitError>;
}

/// The default solver: L-BFGS over the sum of squares.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Lbfgs(pub FitOptions);

impl LeastSquaresSolver for Lbfgs {
    fn solve(&self, residuals: &Residuals<'_>, x0: &[f64], bounds: &[(f64, f64)]) -> Result<Solution, FitError> {
        let opts = &self.0;
        let tracker = Mutex::new(Tracker::default());
        let problem = SumOfSquares::new(residuals, bounds, &tracker);

        let u0 = problem.to_unit(x0);
        let start = problem.to_params(&u0);
        let start_cost = residuals(&start).norm_squared();
        if !start_cost.is_finite() {
            return Err(FitError::NonFiniteStart);
        }
        if start_cost == 0.0 {
            return Ok(Solution {
                x: start,
                cost: 0.0,
                iterations: 0,
            });
        }

        let solver = build_lbfgs(opts)?;
        let run = Executor::new(problem, solver)
            .configure(|state| state.param(u0).max_iters(opts.max_iter as u64))
            .run();

        let (converged, iterations) = match run {
            Ok(result) => {
                let state = result.state();
                let converged = !matches!(
                    state.get_termination_status(),
                    TerminationStatus::Terminated(TerminationReason::MaxItersReached)
                );
                (converged, state.get_iter() as usize)
            }
            Err(e) => {
                debug!("solver stopped early: {e}");
                (false, lock(&tracker).gradients)
            }
        };

        let Some((x, cost)) = lock(&tracker).best.take() else {
            return Err(FitError::NonFiniteStart);
        };
        if converged || problem.is_stationary(&x, cost) {
            return Ok(Solution { x, cost, iterations });
        }
        Err(FitError::NonConvergence { iterations, sse: cost })
    }
}

/// L-BFGS with More–Thuente line search and the configured tolerances.
pub fn build_lbfgs(opts: &FitOptions) -> Result<LbfgsMoreThuente, FitError> {
    let solver = LbfgsMoreThuente::new(MoreThuenteLS::new(), opts.memory.max(1))
        .with_tolerance_grad(opts.grad_tol)?
        .with_tolerance_cost(opts.cost_tol)?;
    Ok(solver)
}

#[derive(Debug, Default)]
struct Tracker {
    /// Lowest finite cost seen, in parameter space.
    best: Option<(Vec<f64>, f64)>,
    gradients: usize,
}

fn lock(tracker: &Mutex<Tracker>) -> std::sync::MutexGuard<'_, Tracker> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `x = offset + width * u`, clamped into the bounds.
#[derive(Debug, Clone, Copy)]
struct Scale {
    lower: f64,
    upper: f64,
    offset: f64,
    width: f64,
}

impl Scale {
    fn new((lower, upper): (f64, f64)) -> Self {
        let width = upper - lower;
        if width.is_finite() && width > 0.0 {
            Self {
                lower,
                upper,
                offset: lower,
                width,
            }
        } else {
            // Unbounded side or a pinned value: no rescaling.
            Self {
                lower,
                upper,
                offset: 0.0,
                width: 1.0,
            }
        }
    }

    fn to_param(self, u: f64) -> f64 {
        (self.offset + self.width * u).clamp(self.lower, self.upper)
    }

    fn to_unit(self, x: f64) -> f64 {
        (x - self.offset) / self.width
    }
}

/// The sum of squared residuals as an `argmin` problem over unit-scaled
/// parameters.
#[derive(Clone, Copy)]
struct SumOfSquares<'a> {
    residuals: &'a Residuals<'a>,
    bounds: &'a [(f64, f64)],
    tracker: &'a Mutex<Tracker>,
}

impl<'a> SumOfSquares<'a> {
    fn new(residuals: &'a Residuals<'a>, bounds: &'a [(f64, f64)], tracker: &'a Mutex<Tracker>) -> Self {
        Self {
            residuals,
            bounds,
            tracker,
        }
    }

    fn scales(&self) -> impl Iterator<Item = Scale> + 'a {
        self.bounds.iter().copied().map(Scale::new)
    }

    fn to_params(&self, u: &Theta) -> Vec<f64> {
        self.scales().zip(u.iter()).map(|(s, &v)| s.to_param(v)).collect()
    }

    fn to_unit(&self, x: &[f64]) -> Theta {
        self.scales().zip(x).map(|(s, &v)| s.to_unit(s.to_param(s.to_unit(v)))).collect()
    }

    fn residuals_at(&self, u: &Theta) -> DVector<f64> {
        (self.residuals)(&self.to_params(u))
    }

    /// `2 Jᵀ r` with a central-difference Jacobian in unit coordinates.
    fn sse_gradient(&self, u: &Theta) -> Option<Grad> {
        let r = self.residuals_at(u);
        if r.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let h0 = f64::EPSILON.cbrt();
        let mut shifted = u.clone();
        let mut grad = Grad::zeros(u.len());

        for j in 0..u.len() {
            let h = h0 * u[j].abs().max(1.0);
            shifted[j] = u[j] + h;
            let up = self.residuals_at(&shifted);
            shifted[j] = u[j] - h;
            let down = self.residuals_at(&shifted);
            shifted[j] = u[j];

            grad[j] = r
                .iter()
                .zip(up.iter().zip(down.iter()))
                .map(|(ri, (a, b))| {
                    let d = (a - b) / (2.0 * h);
                    if d.is_finite() { 2.0 * ri * d } else { 0.0 }
                })
                .sum();
        }
        Some(grad)
    }

    /// Projected-gradient test: components held at a bound by a gradient
    /// pointing out of the box do not count.
    fn is_stationary(&self, x: &[f64], cost: f64) -> bool {
        let Some(grad) = self.sse_gradient(&self.to_unit(x)) else {
            return false;
        };
        let largest = grad
            .iter()
            .zip(x.iter().zip(self.bounds))
            .map(|(&g, (&xi, &(lo, hi)))| {
                let blocked = (xi <= lo && g > 0.0) || (xi >= hi && g < 0.0);
                if blocked { 0.0 } else { g.abs() }
            })
            .fold(0.0_f64, f64::max);
        largest <= STATIONARY_TOL * (1.0 + cost)
    }
}

impl CostFunction for SumOfSquares<'_> {
    type Param = Theta;
    type Output = f64;

    fn cost(&self, u: &Self::Param) -> Result<Self::Output, Error> {
        let x = self.to_params(u);
        let cost = (self.residuals)(&x).norm_squared();
        if !cost.is_finite() {
            return Err(Error::msg(format!("non-finite sum of squares at {x:?}")));
        }
        let mut tracker = lock(self.tracker);
        if tracker.best.as_ref().is_none_or(|(_, best)| cost < *best) {
            tracker.best = Some((x, cost));
        }
        Ok(cost)
    }
}

impl Gradient for SumOfSquares<'_> {
    type Param = Theta;
    type Gradient = Grad;

    fn gradient(&self, u: &Self::Param) -> Result<Self::Gradient, Error> {
        lock(self.tracker).gradients += 1;
        self.sse_gradient(u)
            .ok_or_else(|| Error::msg("non-finite residuals in gradient"))
    }
}
