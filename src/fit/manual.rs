//! Interactive parameter tuning.
//!
//! [`ManualFit`] is a pure view over a model set's free parameters: callers
//! move a value vector around, preview the combined rate, and rebuild a new
//! model set once satisfied. [`ModelCell`] holds the latest accepted
//! snapshot so readers (an aggregation run, a plot) always see a whole one.

use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::Observation;
use crate::error::ModelError;
use crate::models::{FreeParam, ModelSet};

#[derive(Debug, Clone)]
pub struct ManualFit {
    base: ModelSet,
    params: Vec<FreeParam>,
}

impl ManualFit {
    pub fn new(base: ModelSet) -> Self {
        let params = base.free_params();
        Self { base, params }
    }

    /// Free parameters with names and bounds.
    pub fn parameters(&self) -> &[FreeParam] {
        &self.params
    }

    /// Current values, in [`ManualFit::parameters`] order.
    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }

    pub fn base(&self) -> &ModelSet {
        &self.base
    }

    /// Combined rate at `x` with `values` substituted. NaN when `values`
    /// does not fit the parameter vector.
    pub fn evaluate(&self, values: &[f64], x: f64) -> f64 {
        match self.base.with_free_values(values) {
            Ok(models) => models.rate(x),
            Err(_) => f64::NAN,
        }
    }

    /// Sum of squared residuals of `values` against `observations`.
    pub fn sse(&self, values: &[f64], observations: &[Observation]) -> Result<f64, ModelError> {
        let models = self.base.with_free_values(values)?;
        Ok(observations
            .iter()
            .map(|o| {
                let r = models.rate(o.input) - o.rate;
                r * r
            })
            .sum())
    }

    /// A new, validated model set carrying `values`.
    pub fn rebuild(&self, values: &[f64]) -> Result<ModelSet, ModelError> {
        let models = self.base.with_free_values(values)?;
        for layer in &models {
            layer.model.validate()?;
        }
        Ok(models)
    }
}

/// Shared, swappable pointer to the latest model set.
#[derive(Debug, Default)]
pub struct ModelCell {
    inner: RwLock<Arc<ModelSet>>,
}

impl ModelCell {
    pub fn new(models: ModelSet) -> Self {
        Self {
            inner: RwLock::new(Arc::new(models)),
        }
    }

    /// The current snapshot. Later swaps do not affect it.
    pub fn snapshot(&self) -> Arc<ModelSet> {
        // The guarded value is a single Arc, so a poisoned lock still holds a whole snapshot.
        Arc::clone(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a new snapshot, returning the previous one.
    pub fn replace(&self, models: ModelSet) -> Arc<ModelSet> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(models))
    }

    /// Rebuild the current snapshot with new free values and swap it in.
    /// On error the cell is unchanged.
    pub fn update(&self, values: &[f64]) -> Result<Arc<ModelSet>, ModelError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(ManualFit::new((**guard).clone()).rebuild(values)?);
        *guard = Arc::clone(&next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Layer, LinearGrowth, Model, Param, Stress};

    fn models() -> ModelSet {
        ModelSet::new(vec![
            Layer::new(
                "tas",
                "°C",
                Model::Linear(LinearGrowth::new(Param::free(0.1, 0.0, 1.0), 5.0)),
            ),
            Layer::new(
                "tas",
                "°C",
                Model::LowerStress(Stress::new(0.0, Param::free(-0.1, -1.0, 0.0))),
            ),
        ])
    }

    #[test]
    fn exposes_free_parameters() {
        let manual = ManualFit::new(models());
        let names: Vec<&str> = manual.parameters().iter().map(|p| p.name).collect();
        assert_eq!(names, ["slope", "mortality_rate"]);
        assert_eq!(manual.values(), vec![0.1, -0.1]);
    }

    #[test]
    fn evaluate_does_not_touch_base() {
        let manual = ManualFit::new(models());
        assert!((manual.evaluate(&[0.5, -0.1], 7.0) - 1.0).abs() < 1e-12);
        assert!((manual.evaluate(&[0.5, -0.2], -1.0) - (-0.2)).abs() < 1e-12);
        assert_eq!(manual.values(), vec![0.1, -0.1]);
        assert!(manual.evaluate(&[0.5], 7.0).is_nan());
    }

    #[test]
    fn sse_against_observations() {
        let manual = ManualFit::new(models());
        let obs = [Observation::new(7.0, 1.0), Observation::new(9.0, 2.0)];
        assert!(manual.sse(&[0.5, -0.1], &obs).unwrap().abs() < 1e-20);
    }

    #[test]
    fn rebuild_rejects_positive_mortality() {
        let manual = ManualFit::new(models());
        assert!(matches!(
            manual.rebuild(&[0.5, 0.3]),
            Err(ModelError::OutOfBounds { name: "mortality_rate", .. })
        ));
    }

    #[test]
    fn cell_swaps_whole_snapshots() {
        let cell = ModelCell::new(models());
        let before = cell.snapshot();

        let after = cell.update(&[0.4, -0.2]).unwrap();
        assert_eq!(after.free_params()[0].value, 0.4);
        assert_eq!(before.free_params()[0].value, 0.1);
        assert_eq!(cell.snapshot().free_params()[1].value, -0.2);

        assert!(cell.update(&[2.0, -0.2]).is_err());
        assert_eq!(cell.snapshot().free_params()[0].value, 0.4);

        let previous = cell.replace(models());
        assert_eq!(previous.free_params()[0].value, 0.4);
        assert_eq!(cell.snapshot().free_params()[0].value, 0.1);
    }
}
