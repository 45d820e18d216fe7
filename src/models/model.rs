//! Rate models.
//!
//! A [`Model`] maps one unit-converted scalar input to a rate. Every model is
//! one of three kinds, which decides how it is combined with others (see
//! [`crate::models::contributions`]):
//!
//! - `Growth`: contributes `max(rate, 0)`
//! - `LowerStress`: contributes `mortality_rate * (threshold - x)` while
//!   `x < threshold`
//! - `UpperStress`: contributes `mortality_rate * (x - threshold)` while
//!   `x > threshold`
//!
//! Models are immutable values; [`Model::with_values`] builds a new one.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::math::SchoolfieldTerms;
use crate::models::Param;

/// Combination class of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Growth,
    LowerStress,
    UpperStress,
}

impl ModelKind {
    pub fn is_stress(self) -> bool {
        matches!(self, ModelKind::LowerStress | ModelKind::UpperStress)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Model {
    /// Schoolfield intrinsic growth (input in Kelvin).
    Schoolfield(Schoolfield),
    /// Degree-day style growth, `slope * (x - base)`.
    Linear(LinearGrowth),
    LowerStress(Stress),
    UpperStress(Stress),
}

/// Schoolfield growth parameters. Temperatures in K, enthalpies in J/mol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schoolfield {
    pub p: Param,
    pub delta_h_a: Param,
    pub delta_h_l: Param,
    pub t_half_l: Param,
    pub delta_h_h: Param,
    pub t_half_h: Param,
    pub t_ref: Param,
}

impl Schoolfield {
    pub const PARAM_NAMES: [&'static str; 7] =
        ["p", "delta_h_a", "delta_h_l", "t_half_l", "delta_h_h", "t_half_h", "t_ref"];

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        p: impl Into<Param>,
        delta_h_a: impl Into<Param>,
        delta_h_l: impl Into<Param>,
        t_half_l: impl Into<Param>,
        delta_h_h: impl Into<Param>,
        t_half_h: impl Into<Param>,
        t_ref: impl Into<Param>,
    ) -> Self {
        Self {
            p: p.into(),
            delta_h_a: delta_h_a.into(),
            delta_h_l: delta_h_l.into(),
            t_half_l: t_half_l.into(),
            delta_h_h: delta_h_h.into(),
            t_half_h: t_half_h.into(),
            t_ref: t_ref.into(),
        }
    }

    pub fn terms(&self) -> SchoolfieldTerms {
        SchoolfieldTerms {
            p: self.p.value,
            delta_h_a: self.delta_h_a.value,
            delta_h_l: self.delta_h_l.value,
            t_half_l: self.t_half_l.value,
            delta_h_h: self.delta_h_h.value,
            t_half_h: self.t_half_h.value,
            t_ref: self.t_ref.value,
        }
    }

    fn params(&self) -> [Param; 7] {
        [
            self.p,
            self.delta_h_a,
            self.delta_h_l,
            self.t_half_l,
            self.delta_h_h,
            self.t_half_h,
            self.t_ref,
        ]
    }

    fn from_params(p: [Param; 7]) -> Self {
        let [p, delta_h_a, delta_h_l, t_half_l, delta_h_h, t_half_h, t_ref] = p;
        Self {
            p,
            delta_h_a,
            delta_h_l,
            t_half_l,
            delta_h_h,
            t_half_h,
            t_ref,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGrowth {
    pub slope: Param,
    pub base: Param,
}

impl LinearGrowth {
    pub const PARAM_NAMES: [&'static str; 2] = ["slope", "base"];

    pub fn new(slope: impl Into<Param>, base: impl Into<Param>) -> Self {
        Self {
            slope: slope.into(),
            base: base.into(),
        }
    }
}

/// Threshold stress. `mortality_rate` is non-positive, so a satisfied
/// condition always contributes a non-positive rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stress {
    pub threshold: Param,
    pub mortality_rate: Param,
}

impl Stress {
    pub const PARAM_NAMES: [&'static str; 2] = ["threshold", "mortality_rate"];

    pub fn new(threshold: impl Into<Param>, mortality_rate: impl Into<Param>) -> Self {
        Self {
            threshold: threshold.into(),
            mortality_rate: mortality_rate.into(),
        }
    }

    /// Mortality from the fraction surviving one unit of threshold exceedance:
    /// `mortality_rate = ln(survival)`.
    pub fn from_survival(threshold: impl Into<Param>, survival: f64) -> Result<Self, ModelError> {
        if !(survival > 0.0 && survival <= 1.0) {
            return Err(ModelError::BadSurvival(survival));
        }
        Ok(Self::new(threshold, survival.ln()))
    }
}

impl Model {
    pub fn kind(&self) -> ModelKind {
        match self {
            Model::Schoolfield(_) | Model::Linear(_) => ModelKind::Growth,
            Model::LowerStress(_) => ModelKind::LowerStress,
            Model::UpperStress(_) => ModelKind::UpperStress,
        }
    }

    /// Short identifier used in logs and parameter listings.
    pub fn name(&self) -> &'static str {
        match self {
            Model::Schoolfield(_) => "schoolfield",
            Model::Linear(_) => "linear",
            Model::LowerStress(_) => "lower_stress",
            Model::UpperStress(_) => "upper_stress",
        }
    }

    /// Raw model rate. May be negative; NaN where undefined.
    ///
    /// For stress kinds this is the same as [`Model::conditional_rate`].
    pub fn rate(&self, x: f64) -> f64 {
        match self {
            Model::Schoolfield(m) => m.terms().rate(x),
            Model::Linear(m) => m.slope.value * (x - m.base.value),
            Model::LowerStress(_) | Model::UpperStress(_) => self.conditional_rate(x),
        }
    }

    /// Whether the model applies at `x`. Growth always applies.
    pub fn condition(&self, x: f64) -> bool {
        match self {
            Model::Schoolfield(_) | Model::Linear(_) => true,
            Model::LowerStress(s) => x < s.threshold.value,
            Model::UpperStress(s) => x > s.threshold.value,
        }
    }

    /// Rate when [`Model::condition`] holds, exactly 0 otherwise. NaN input
    /// stays NaN.
    pub fn conditional_rate(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        match self {
            Model::Schoolfield(_) | Model::Linear(_) => self.rate(x),
            Model::LowerStress(s) if self.condition(x) => s.mortality_rate.value * (s.threshold.value - x),
            Model::UpperStress(s) if self.condition(x) => s.mortality_rate.value * (x - s.threshold.value),
            Model::LowerStress(_) | Model::UpperStress(_) => 0.0,
        }
    }

    /// All parameters in declaration order.
    pub fn params(&self) -> Vec<(&'static str, Param)> {
        match self {
            Model::Schoolfield(m) => Schoolfield::PARAM_NAMES.into_iter().zip(m.params()).collect(),
            Model::Linear(m) => LinearGrowth::PARAM_NAMES.into_iter().zip([m.slope, m.base]).collect(),
            Model::LowerStress(s) | Model::UpperStress(s) => Stress::PARAM_NAMES
                .into_iter()
                .zip([s.threshold, s.mortality_rate])
                .collect(),
        }
    }

    /// Rebuild with new values for every parameter (same order as
    /// [`Model::params`]); bounds are kept.
    pub fn with_values(&self, values: &[f64]) -> Result<Model, ModelError> {
        let current = self.params();
        if values.len() != current.len() {
            return Err(ModelError::ParameterCount {
                expected: current.len(),
                found: values.len(),
            });
        }
        let updated = |i: usize| current[i].1.with_value(values[i]);

        let model = match self {
            Model::Schoolfield(_) => Model::Schoolfield(Schoolfield::from_params(std::array::from_fn(updated))),
            Model::Linear(_) => Model::Linear(LinearGrowth {
                slope: updated(0),
                base: updated(1),
            }),
            Model::LowerStress(_) => Model::LowerStress(Stress {
                threshold: updated(0),
                mortality_rate: updated(1),
            }),
            Model::UpperStress(_) => Model::UpperStress(Stress {
                threshold: updated(0),
                mortality_rate: updated(1),
            }),
        };
        Ok(model)
    }

    /// Check parameter values and bounds.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (name, p) in self.params() {
            p.validate(name)?;
        }
        match self {
            Model::Schoolfield(m) => {
                for (name, p) in [("t_half_l", m.t_half_l), ("t_half_h", m.t_half_h), ("t_ref", m.t_ref)] {
                    let lowest = p.bounds.map_or(p.value, |(lo, _)| lo.min(p.value));
                    if lowest <= 0.0 {
                        return Err(ModelError::NonPositiveTemperature { name, value: lowest });
                    }
                }
            }
            Model::LowerStress(s) | Model::UpperStress(s) => {
                let highest = s.mortality_rate.bounds.map_or(s.mortality_rate.value, |(_, hi)| hi);
                if highest > 0.0 {
                    return Err(ModelError::PositiveMortality(highest));
                }
            }
            Model::Linear(_) => {}
        }
        Ok(())
    }
}
