//! The one place where model kinds are combined into a cell rate.
//!
//! ```text
//! growth_total = Σ_growth max(rate(x), 0)
//! stress_total = Σ_stress conditional_rate(x)     (each ≤ 0)
//! combined     = growth_total + stress_total
//! ```
//!
//! Both the aggregation engine and the fitter go through [`contributions`],
//! so a fitted model set reproduces exactly what the engine will compute.

use crate::models::{Model, ModelKind};

/// Per-cell totals by combination class.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Contributions {
    pub growth: f64,
    pub stress: f64,
}

impl Contributions {
    pub fn combined(&self) -> f64 {
        self.growth + self.stress
    }
}

/// Accumulate `(model, converted input)` pairs. NaN anywhere stays NaN.
pub fn contributions<'a, I>(pairs: I) -> Contributions
where
    I: IntoIterator<Item = (&'a Model, f64)>,
{
    let mut out = Contributions::default();
    for (model, x) in pairs {
        match model.kind() {
            ModelKind::Growth => {
                let r = model.rate(x);
                // `f64::max` would swallow NaN.
                out.growth += if r.is_nan() { r } else { r.max(0.0) };
            }
            ModelKind::LowerStress | ModelKind::UpperStress => {
                out.stress += model.conditional_rate(x);
            }
        }
    }
    out
}
