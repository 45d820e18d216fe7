//! Raster frames (engine input) and output series (engine result).

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use nalgebra::DMatrix;

use crate::domain::{Unit, is_missing};
use crate::error::EngineError;

/// A single named grid inside a frame, tagged with its native unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub grid: DMatrix<f64>,
    pub unit: Unit,
}

impl Band {
    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }
}

/// All environmental variables of one timestamp.
///
/// Every band in a frame must share one shape; this is checked by
/// [`RasterFrame::shape`] rather than on insert, so adapters can build frames
/// incrementally.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterFrame {
    time: NaiveDateTime,
    missing: f64,
    bands: BTreeMap<String, Band>,
}

impl RasterFrame {
    /// Create an empty frame with the given missing-value sentinel.
    pub fn new(time: NaiveDateTime, missing: f64) -> Self {
        Self {
            time,
            missing,
            bands: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with_band(mut self, name: impl Into<String>, grid: DMatrix<f64>, unit: impl Into<Unit>) -> Self {
        self.insert(name, grid, unit);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, grid: DMatrix<f64>, unit: impl Into<Unit>) {
        self.bands.insert(
            name.into(),
            Band {
                grid,
                unit: unit.into(),
            },
        );
    }

    pub fn time(&self) -> NaiveDateTime {
        self.time
    }

    pub fn missing(&self) -> f64 {
        self.missing
    }

    pub fn band(&self, name: &str) -> Option<&Band> {
        self.bands.get(name)
    }

    pub fn band_mut(&mut self, name: &str) -> Option<&mut Band> {
        self.bands.get_mut(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    pub fn is_missing(&self, value: f64) -> bool {
        is_missing(value, self.missing)
    }

    /// Common shape of all bands, or `ShapeMismatch` naming the first band
    /// that disagrees. A frame without bands has shape `(0, 0)`.
    pub fn shape(&self) -> Result<(usize, usize), EngineError> {
        let mut iter = self.bands.iter();
        let Some((_, first)) = iter.next() else {
            return Ok((0, 0));
        };
        let expected = first.shape();
        for (name, band) in iter {
            if band.shape() != expected {
                return Err(EngineError::ShapeMismatch {
                    variable: name.clone(),
                    time: self.time,
                    expected,
                    found: band.shape(),
                });
            }
        }
        Ok(expected)
    }
}

/// One aggregated rate grid.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFrame {
    pub time: NaiveDateTime,
    pub grid: DMatrix<f64>,
}

/// Result of a run: exactly one grid per output timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSeries {
    frames: Vec<OutputFrame>,
    shape: (usize, usize),
    missing: f64,
}

impl OutputSeries {
    pub(crate) fn with_capacity(n: usize, shape: (usize, usize), missing: f64) -> Self {
        Self {
            frames: Vec::with_capacity(n),
            shape,
            missing,
        }
    }

    pub(crate) fn push(&mut self, frame: OutputFrame) {
        debug_assert_eq!(frame.grid.shape(), self.shape);
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[OutputFrame] {
        &self.frames
    }

    pub fn get(&self, idx: usize) -> Option<&OutputFrame> {
        self.frames.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OutputFrame> {
        self.frames.iter()
    }

    /// Shape shared by every output grid (the source grid shape).
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Missing-value sentinel used in every output grid.
    pub fn missing(&self) -> f64 {
        self.missing
    }

    pub fn is_missing(&self, value: f64) -> bool {
        is_missing(value, self.missing)
    }

    pub fn into_frames(self) -> Vec<OutputFrame> {
        self.frames
    }
}

impl<'a> IntoIterator for &'a OutputSeries {
    type Item = &'a OutputFrame;
    type IntoIter = std::slice::Iter<'a, OutputFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
