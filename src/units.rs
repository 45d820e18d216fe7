//! Unit conversion seam.
//!
//! Unit tables are not this crate's business: the engine calls
//! [`UnitConverter::convert`] for each cell of a layer's grid and otherwise
//! treats units as opaque tags. Two small converters are provided for the
//! common cases.

use crate::domain::Unit;
use crate::error::UnitError;

/// Convert a scalar between two unit tags.
pub trait UnitConverter: Sync {
    fn convert(&self, value: f64, from: &Unit, to: &Unit) -> Result<f64, UnitError>;

    /// `Ok` if `from -> to` is supported. Used by pre-flight validation so an
    /// unsupported pair fails before any frame is evaluated.
    fn check(&self, from: &Unit, to: &Unit) -> Result<(), UnitError> {
        self.convert(0.0, from, to).map(|_| ())
    }
}

/// Only accepts identical tags; returns the value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityConverter;

impl UnitConverter for IdentityConverter {
    fn convert(&self, value: f64, from: &Unit, to: &Unit) -> Result<f64, UnitError> {
        if from == to {
            Ok(value)
        } else {
            Err(unsupported(from, to))
        }
    }
}

/// Temperature scales (Kelvin, Celsius, Fahrenheit).
///
/// Identical tags of any other kind pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemperatureConverter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    Kelvin,
    Celsius,
    Fahrenheit,
}

fn scale_of(unit: &Unit) -> Option<Scale> {
    match unit.as_str() {
        "K" | "kelvin" | "Kelvin" => Some(Scale::Kelvin),
        "°C" | "degC" | "C" | "celsius" | "Celsius" => Some(Scale::Celsius),
        "°F" | "degF" | "F" | "fahrenheit" | "Fahrenheit" => Some(Scale::Fahrenheit),
        _ => None,
    }
}

fn to_kelvin(value: f64, scale: Scale) -> f64 {
    match scale {
        Scale::Kelvin => value,
        Scale::Celsius => value + 273.15,
        Scale::Fahrenheit => (value - 32.0) * 5.0 / 9.0 + 273.15,
    }
}

fn from_kelvin(value: f64, scale: Scale) -> f64 {
    match scale {
        Scale::Kelvin => value,
        Scale::Celsius => value - 273.15,
        Scale::Fahrenheit => (value - 273.15) * 9.0 / 5.0 + 32.0,
    }
}

impl UnitConverter for TemperatureConverter {
    fn convert(&self, value: f64, from: &Unit, to: &Unit) -> Result<f64, UnitError> {
        if from == to {
            return Ok(value);
        }
        match (scale_of(from), scale_of(to)) {
            (Some(a), Some(b)) if a == b => Ok(value),
            (Some(a), Some(b)) => Ok(from_kelvin(to_kelvin(value, a), b)),
            _ => Err(unsupported(from, to)),
        }
    }
}

fn unsupported(from: &Unit, to: &Unit) -> UnitError {
    UnitError::Unsupported {
        from: from.to_string(),
        to: to.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_rejects_different_tags() {
        let c = IdentityConverter;
        assert_eq!(c.convert(3.0, &"K".into(), &"K".into()).unwrap(), 3.0);
        assert!(c.check(&"K".into(), &"°C".into()).is_err());
    }

    #[test]
    fn celsius_to_kelvin_and_back() {
        let c = TemperatureConverter;
        let k = c.convert(25.0, &"°C".into(), &"K".into()).unwrap();
        assert!((k - 298.15).abs() < 1e-12);
        let back = c.convert(k, &"K".into(), &"degC".into()).unwrap();
        assert!((back - 25.0).abs() < 1e-12);
    }

    #[test]
    fn fahrenheit_freezing_point() {
        let c = TemperatureConverter;
        let v = c.convert(32.0, &"°F".into(), &"°C".into()).unwrap();
        assert!(v.abs() < 1e-12);
    }

    #[test]
    fn unknown_units_are_unsupported() {
        let c = TemperatureConverter;
        assert_eq!(c.convert(1.0, &"mm".into(), &"mm".into()).unwrap(), 1.0);
        assert!(matches!(
            c.convert(1.0, &"mm".into(), &"K".into()),
            Err(UnitError::Unsupported { .. })
        ));
    }
}
