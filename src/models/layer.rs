//! Layers and model sets.

use serde::{Deserialize, Serialize};

use crate::domain::Unit;
use crate::error::{EngineError, ModelError};
use crate::models::{Contributions, Model, ModelKind, contributions};

/// A model bound to the variable it reads and the unit it expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub variable: String,
    pub unit: Unit,
    pub model: Model,
}

impl Layer {
    pub fn new(variable: impl Into<String>, unit: impl Into<Unit>, model: Model) -> Self {
        Self {
            variable: variable.into(),
            unit: unit.into(),
            model,
        }
    }
}

/// A free parameter as seen by the fitter and by interactive tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeParam {
    /// Index of the owning layer.
    pub layer: usize,
    pub variable: String,
    pub model: &'static str,
    pub name: &'static str,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Layers evaluated together on one cell. Order does not affect the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelSet {
    layers: Vec<Layer>,
}

impl ModelSet {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }

    /// A new set with `layer` appended.
    pub fn with_layer(&self, layer: Layer) -> Self {
        let mut layers = self.layers.clone();
        layers.push(layer);
        Self { layers }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    pub fn growth_count(&self) -> usize {
        self.layers
            .iter()
            .filter(|l| l.model.kind() == ModelKind::Growth)
            .count()
    }

    /// Non-empty, and every model valid.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.layers.is_empty() {
            return Err(EngineError::EmptyModelSet);
        }
        for layer in &self.layers {
            layer.model.validate().map_err(|source| EngineError::InvalidModel {
                variable: layer.variable.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Combined rate when every layer sees the same input `x`.
    pub fn rate(&self, x: f64) -> f64 {
        self.contributions(x).combined()
    }

    pub fn contributions(&self, x: f64) -> Contributions {
        contributions(self.layers.iter().map(|l| (&l.model, x)))
    }

    /// Combined rate with one input per layer (`inputs[i]` feeds layer `i`).
    pub fn rate_with(&self, inputs: &[f64]) -> f64 {
        debug_assert_eq!(inputs.len(), self.layers.len());
        contributions(self.layers.iter().map(|l| &l.model).zip(inputs.iter().copied())).combined()
    }

    /// Free parameters, layer by layer in declaration order.
    pub fn free_params(&self) -> Vec<FreeParam> {
        let mut out = Vec::new();
        for (idx, layer) in self.layers.iter().enumerate() {
            for (name, p) in layer.model.params() {
                if let Some((lower, upper)) = p.bounds {
                    out.push(FreeParam {
                        layer: idx,
                        variable: layer.variable.clone(),
                        model: layer.model.name(),
                        name,
                        value: p.value,
                        lower,
                        upper,
                    });
                }
            }
        }
        out
    }

    /// Rebuild with new values for the free parameters (same order as
    /// [`ModelSet::free_params`]). Constants are untouched.
    pub fn with_free_values(&self, values: &[f64]) -> Result<ModelSet, ModelError> {
        let mut remaining = values;
        let mut layers = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            let params = layer.model.params();
            let n_free = params.iter().filter(|(_, p)| p.is_free()).count();
            if remaining.len() < n_free {
                return Err(ModelError::ParameterCount {
                    expected: self.free_params().len(),
                    found: values.len(),
                });
            }
            let (mine, rest) = remaining.split_at(n_free);
            remaining = rest;

            let mut free_iter = mine.iter().copied();
            let all: Vec<f64> = params
                .iter()
                .map(|(_, p)| {
                    if p.is_free() {
                        free_iter.next().unwrap_or(p.value)
                    } else {
                        p.value
                    }
                })
                .collect();

            layers.push(Layer {
                model: layer.model.with_values(&all)?,
                ..layer.clone()
            });
        }

        if !remaining.is_empty() {
            return Err(ModelError::ParameterCount {
                expected: values.len() - remaining.len(),
                found: values.len(),
            });
        }
        Ok(ModelSet { layers })
    }
}

impl<'a> IntoIterator for &'a ModelSet {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

impl FromIterator<Layer> for ModelSet {
    fn from_iter<T: IntoIterator<Item = Layer>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
