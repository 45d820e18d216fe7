//! Small shared value types.
//!
//! These are kept serializable so model sets, observations and configs can be
//! written to JSON/CSV and reloaded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque unit tag (e.g. `"K"`, `"°C"`, `"mm"`).
///
/// The engine never interprets units itself; it only compares tags and hands
/// them to a [`crate::units::UnitConverter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unit(String);

impl Unit {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Unit {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One observed `(input, rate)` pair used for fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub input: f64,
    pub rate: f64,
}

impl Observation {
    pub fn new(input: f64, rate: f64) -> Self {
        Self { input, rate }
    }
}

/// `true` if `value` is the missing-value sentinel.
///
/// A NaN sentinel matches every NaN cell; any other sentinel matches by
/// equality.
#[inline]
pub fn is_missing(value: f64, sentinel: f64) -> bool {
    if sentinel.is_nan() {
        value.is_nan()
    } else {
        value == sentinel
    }
}
