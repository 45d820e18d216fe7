//! The aggregation run.
//!
//! Walks the output timespan once, pulling source frames forward-only:
//!
//! 1. validate the model set and the first frame (variables, shape, units)
//! 2. per target, resolve the contributing frame(s) under the sub-period policy
//! 3. evaluate each contributing frame cell-wise and reduce
//! 4. emit one grid per target
//!
//! Any error aborts the run; the caller never sees a partial series.

use chrono::NaiveDateTime;
use log::{debug, info};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::{OutputFrame, OutputSeries, RasterFrame};
use crate::engine::evaluate::{evaluate_frame, reduce_grids};
use crate::engine::source::FrameStream;
use crate::engine::{OutputSpec, Reducer, SubPeriod};
use crate::error::{EngineError, SourceError};
use crate::models::ModelSet;
use crate::report::GridStats;
use crate::units::UnitConverter;

/// Engine tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Evaluate cells on the rayon pool.
    pub parallel: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Run the engine with default options.
pub fn mapgrowth<S, C>(
    models: &ModelSet,
    source: S,
    spec: &OutputSpec,
    converter: &C,
) -> Result<OutputSeries, EngineError>
where
    S: IntoIterator<Item = Result<RasterFrame, SourceError>>,
    C: UnitConverter + ?Sized,
{
    GrowthMapper::new(models, converter).run(source, spec)
}

/// A configured aggregation run over one model set.
pub struct GrowthMapper<'a, C: ?Sized> {
    models: &'a ModelSet,
    converter: &'a C,
    options: EngineOptions,
}

impl<'a, C> GrowthMapper<'a, C>
where
    C: UnitConverter + ?Sized,
{
    pub fn new(models: &'a ModelSet, converter: &'a C) -> Self {
        Self {
            models,
            converter,
            options: EngineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run<S>(&self, source: S, spec: &OutputSpec) -> Result<OutputSeries, EngineError>
    where
        S: IntoIterator<Item = Result<RasterFrame, SourceError>>,
    {
        self.models.validate()?;

        let mut stream = FrameStream::new(source.into_iter(), self.models);
        let first = stream.pull()?.ok_or(EngineError::EmptySource)?;
        self.check_units(&first)?;

        let shape = stream.shape().unwrap_or((0, 0));
        let missing = first.missing();
        info!(
            "mapgrowth: {} layer(s) ({} growth), {} output step(s), grid {}x{}, policy {:?}",
            self.models.len(),
            self.models.growth_count(),
            spec.len(),
            shape.0,
            shape.1,
            spec.policy()
        );

        let mut out = OutputSeries::with_capacity(spec.len(), shape, missing);
        match spec.policy() {
            SubPeriod::Nearest => self.run_nearest(first, &mut stream, spec, &mut out)?,
            SubPeriod::Window(reducer) => self.run_window(first, &mut stream, spec, reducer, &mut out)?,
        }

        info!(
            "mapgrowth: produced {} frame(s) from {} source frame(s)",
            out.len(),
            stream.visited()
        );
        Ok(out)
    }

    /// Every layer's unit must be reachable from the unit of its band.
    fn check_units(&self, frame: &RasterFrame) -> Result<(), EngineError> {
        for layer in self.models {
            let Some(band) = frame.band(&layer.variable) else {
                return Err(EngineError::MissingVariable {
                    variable: layer.variable.clone(),
                    time: frame.time(),
                });
            };
            self.converter
                .check(&band.unit, &layer.unit)
                .map_err(|source| EngineError::Unit {
                    variable: layer.variable.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    fn run_nearest<I>(
        &self,
        first: RasterFrame,
        stream: &mut FrameStream<'_, I>,
        spec: &OutputSpec,
        out: &mut OutputSeries,
    ) -> Result<(), EngineError>
    where
        I: Iterator<Item = Result<RasterFrame, SourceError>>,
    {
        let mut current = first;
        let mut ahead = stream.pull()?;
        // Consecutive targets often resolve to the same frame; the previous
        // output grid is reused then instead of evaluating again.
        let mut last_source: Option<NaiveDateTime> = None;

        for (i, &t) in spec.targets().iter().enumerate() {
            while let Some(next) = ahead.take() {
                if next.time() <= t {
                    current = next;
                    ahead = stream.pull()?;
                } else {
                    ahead = Some(next);
                    break;
                }
            }

            let chosen = match &ahead {
                Some(next) if (next.time() - t).abs() < (t - current.time()).abs() => next,
                _ => &current,
            };

            let grid = match out.frames().last() {
                Some(prev) if last_source == Some(chosen.time()) => prev.grid.clone(),
                _ => self.evaluate(chosen, out.missing())?,
            };
            last_source = Some(chosen.time());

            self.emit(i, t, 1, grid, out);
        }
        Ok(())
    }

    fn run_window<I>(
        &self,
        first: RasterFrame,
        stream: &mut FrameStream<'_, I>,
        spec: &OutputSpec,
        reducer: &Reducer,
        out: &mut OutputSeries,
    ) -> Result<(), EngineError>
    where
        I: Iterator<Item = Result<RasterFrame, SourceError>>,
    {
        let mut pending = Some(first);

        for (i, &t) in spec.targets().iter().enumerate() {
            let end = spec.period_end(i);
            let mut grids = Vec::new();

            loop {
                let frame = match pending.take() {
                    Some(frame) => frame,
                    None => match stream.pull()? {
                        Some(frame) => frame,
                        None => break,
                    },
                };
                if frame.time() < t {
                    continue;
                }
                if end.is_some_and(|end| frame.time() >= end) {
                    pending = Some(frame);
                    break;
                }
                grids.push(self.evaluate(&frame, out.missing())?);
            }

            if grids.is_empty() {
                return Err(EngineError::EmptyPeriod(t));
            }
            let grid = reduce_grids(&grids, reducer, out.missing(), self.options.parallel);
            self.emit(i, t, grids.len(), grid, out);
        }
        Ok(())
    }

    fn evaluate(&self, frame: &RasterFrame, missing: f64) -> Result<DMatrix<f64>, EngineError> {
        evaluate_frame(self.models, frame, self.converter, missing, self.options.parallel)
    }

    fn emit(&self, i: usize, time: NaiveDateTime, n_frames: usize, grid: DMatrix<f64>, out: &mut OutputSeries) {
        if log::log_enabled!(log::Level::Debug) {
            let stats = GridStats::of(&grid, out.missing());
            debug!(
                "step {i} ({time}): {n_frames} frame(s), {} missing cell(s), mean {:.6}",
                stats.missing, stats.mean
            );
        }
        out.push(OutputFrame { time, grid });
    }
}
