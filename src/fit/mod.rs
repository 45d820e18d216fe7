//! Parameter fitting.
//!
//! Responsibilities:
//!
//! - fit the free parameters of a model set to observations (automatic)
//! - minimize bounded sums of squares through `argmin` (solver)
//! - expose the free-parameter vector for interactive tuning (manual)

pub mod fitter;
pub mod manual;
pub mod solver;

pub use fitter::*;
pub use manual::*;
pub use solver::*;
