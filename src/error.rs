//! Error types.
//!
//! Each concern gets its own enum so callers can tell configuration problems
//! (fatal, reported before any output exists) apart from fit failures and file
//! problems. Per-cell numeric trouble is never an error: it degrades to the
//! missing-value sentinel inside the engine.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Error produced by an external frame source.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Invalid model parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("parameter `{name}` is not finite ({value})")]
    NonFinite { name: &'static str, value: f64 },

    #[error("parameter `{name}` has invalid bounds [{lower}, {upper}]")]
    BadBounds {
        name: &'static str,
        lower: f64,
        upper: f64,
    },

    #[error("parameter `{name}` = {value} lies outside its bounds [{lower}, {upper}]")]
    OutOfBounds {
        name: &'static str,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("stress mortality rate must be <= 0, got {0}")]
    PositiveMortality(f64),

    #[error("survival fraction must lie in (0, 1], got {0}")]
    BadSurvival(f64),

    #[error("temperature parameter `{name}` must be > 0 K, got {value}")]
    NonPositiveTemperature { name: &'static str, value: f64 },

    #[error("expected {expected} parameter values, got {found}")]
    ParameterCount { expected: usize, found: usize },
}

/// Unsupported or failed unit conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("no conversion from `{from}` to `{to}`")]
    Unsupported { from: String, to: String },
}

/// Invalid output timespan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    #[error("output timespan is empty")]
    EmptyTimespan,

    #[error("output timestamps must be strictly increasing ({prev} then {next})")]
    UnorderedTimespan {
        prev: NaiveDateTime,
        next: NaiveDateTime,
    },

    #[error("output step must be positive")]
    NonPositiveStep,

    #[error("output timestamp {index} is out of range")]
    OutOfRange { index: usize },
}

/// Failure of an aggregation run. Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model set has no layers")]
    EmptyModelSet,

    #[error("layer `{variable}`: {source}")]
    InvalidModel {
        variable: String,
        #[source]
        source: ModelError,
    },

    #[error("source series produced no frames")]
    EmptySource,

    #[error("variable `{variable}` missing from frame at {time}")]
    MissingVariable {
        variable: String,
        time: NaiveDateTime,
    },

    #[error("grid `{variable}` at {time} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        variable: String,
        time: NaiveDateTime,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("source frames out of order: {next} does not follow {prev}")]
    UnorderedSource {
        prev: NaiveDateTime,
        next: NaiveDateTime,
    },

    #[error("no source frames fall within the output step starting {0}")]
    EmptyPeriod(NaiveDateTime),

    #[error("layer `{variable}`: {source}")]
    Unit {
        variable: String,
        #[source]
        source: UnitError,
    },

    #[error("source error: {0}")]
    Source(#[source] SourceError),
}

/// Failure of a parameter fit. No updated model set is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("no observations to fit")]
    NoObservations,

    #[error("observation {index} is not finite (input={input}, rate={rate})")]
    NonFiniteObservation { index: usize, input: f64, rate: f64 },

    #[error("model set has no free parameters")]
    NoFreeParameters,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("residuals are not finite at the starting parameters")]
    NonFiniteStart,

    #[error("solver did not converge after {iterations} iterations (sse={sse})")]
    NonConvergence { iterations: usize, sse: f64 },

    #[error("solver setup failed: {0}")]
    Solver(String),
}

impl From<argmin::core::Error> for FitError {
    fn from(e: argmin::core::Error) -> Self {
        FitError::Solver(e.to_string())
    }
}

/// File ingest/export failure.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to open '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create '{}': {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CSV '{}': {message}", .path.display())]
    Csv { path: PathBuf, message: String },

    #[error("invalid JSON '{}': {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no valid observations in '{}'", .0.display())]
    NoRows(PathBuf),

    #[error("unsupported file version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

/// Invalid synthetic-data settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("grid and frame count must be non-zero (rows={rows}, cols={cols}, frames={frames})")]
    EmptyShape { rows: usize, cols: usize, frames: usize },

    #[error("noise standard deviation must be finite and non-negative, got {0}")]
    BadNoise(f64),

    #[error("missing fraction must lie in [0, 1], got {0}")]
    BadMissingFraction(f64),

    #[error("timestamp of frame {frame} overflows the calendar")]
    TimeOverflow { frame: usize },
}
