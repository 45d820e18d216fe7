//! Seeded synthetic gridded series and observations.
//!
//! The same settings always produce the same data.

use std::f64::consts::TAU;

use chrono::{NaiveDateTime, TimeDelta};
use nalgebra::DMatrix;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Observation, RasterFrame, Unit};
use crate::engine::MemorySeries;
use crate::error::SampleError;
use crate::models::ModelSet;

/// One synthetic variable: a north-south gradient plus a cycle over frames
/// plus Gaussian noise.
#[derive(Debug, Clone)]
pub struct SeriesConfig {
    pub variable: String,
    pub unit: Unit,
    pub rows: usize,
    pub cols: usize,
    pub start: NaiveDateTime,
    pub step: TimeDelta,
    pub frames: usize,
    /// Field mean.
    pub mean: f64,
    /// Change per grid row.
    pub gradient: f64,
    /// Amplitude of the cycle across frames.
    pub amplitude: f64,
    /// Frames per full cycle.
    pub period: f64,
    pub noise_sd: f64,
    /// Probability that a cell is replaced by `missing`.
    pub missing_fraction: f64,
    pub missing: f64,
    pub seed: u64,
}

impl SeriesConfig {
    /// Daily near-surface temperature in Kelvin with a yearly cycle.
    pub fn temperature(rows: usize, cols: usize, start: NaiveDateTime, frames: usize) -> Self {
        Self {
            variable: "tas".to_string(),
            unit: Unit::from("K"),
            rows,
            cols,
            start,
            step: TimeDelta::days(1),
            frames,
            mean: 288.15,
            gradient: -0.5,
            amplitude: 8.0,
            period: 365.0,
            noise_sd: 1.0,
            missing_fraction: 0.0,
            missing: f64::NAN,
            seed: 42,
        }
    }
}

/// Generate a whole in-memory series for one variable.
pub fn synthetic_series(config: &SeriesConfig) -> Result<MemorySeries, SampleError> {
    let SeriesConfig { rows, cols, frames, .. } = *config;
    if rows == 0 || cols == 0 || frames == 0 {
        return Err(SampleError::EmptyShape { rows, cols, frames });
    }
    if !(config.missing_fraction >= 0.0 && config.missing_fraction <= 1.0) {
        return Err(SampleError::BadMissingFraction(config.missing_fraction));
    }
    let noise = noise(config.noise_sd)?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let centre = (rows as f64 - 1.0) / 2.0;
    let mut series = MemorySeries::default();
    for k in 0..frames {
        let time = i32::try_from(k)
            .ok()
            .and_then(|n| config.step.checked_mul(n))
            .and_then(|offset| config.start.checked_add_signed(offset))
            .ok_or(SampleError::TimeOverflow { frame: k })?;
        let cycle = if config.period > 0.0 {
            config.amplitude * (TAU * k as f64 / config.period).sin()
        } else {
            0.0
        };
        let grid = DMatrix::from_fn(rows, cols, |r, _| {
            if config.missing_fraction > 0.0 && rng.gen_bool(config.missing_fraction) {
                return config.missing;
            }
            config.mean + config.gradient * (r as f64 - centre) + cycle + noise.sample(&mut rng)
        });
        series.push(RasterFrame::new(time, config.missing).with_band(
            config.variable.clone(),
            grid,
            config.unit.clone(),
        ));
    }
    Ok(series)
}

/// Observations of `models` at `inputs`, with additive Gaussian noise on
/// the rate.
pub fn synthetic_observations(
    models: &ModelSet,
    inputs: &[f64],
    noise_sd: f64,
    seed: u64,
) -> Result<Vec<Observation>, SampleError> {
    let noise = noise(noise_sd)?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(inputs
        .iter()
        .map(|&x| Observation::new(x, models.rate(x) + noise.sample(&mut rng)))
        .collect())
}

fn noise(sd: f64) -> Result<Normal<f64>, SampleError> {
    if !(sd.is_finite() && sd >= 0.0) {
        return Err(SampleError::BadNoise(sd));
    }
    Normal::new(0.0, sd).map_err(|_| SampleError::BadNoise(sd))
}
