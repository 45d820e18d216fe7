//! Scalar model parameters.
//!
//! A parameter is either constant or free. Free parameters carry closed
//! bounds and are the only ones the fitter moves.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<(f64, f64)>,
}

impl Param {
    /// A constant the fitter never touches.
    pub const fn fixed(value: f64) -> Self {
        Self { value, bounds: None }
    }

    /// A free parameter constrained to `[lower, upper]`.
    pub const fn free(value: f64, lower: f64, upper: f64) -> Self {
        Self {
            value,
            bounds: Some((lower, upper)),
        }
    }

    pub fn is_free(&self) -> bool {
        self.bounds.is_some()
    }

    /// Same bounds, new value.
    pub fn with_value(self, value: f64) -> Self {
        Self { value, ..self }
    }

    pub fn validate(&self, name: &'static str) -> Result<(), ModelError> {
        if !self.value.is_finite() {
            return Err(ModelError::NonFinite { name, value: self.value });
        }
        if let Some((lower, upper)) = self.bounds {
            if lower.is_nan() || upper.is_nan() || lower > upper {
                return Err(ModelError::BadBounds { name, lower, upper });
            }
            if self.value < lower || self.value > upper {
                return Err(ModelError::OutOfBounds {
                    name,
                    value: self.value,
                    lower,
                    upper,
                });
            }
        }
        Ok(())
    }
}

impl From<f64> for Param {
    fn from(value: f64) -> Self {
        Self::fixed(value)
    }
}
