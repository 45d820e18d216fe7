//! Frame sources.
//!
//! A source is any one-shot iterator of `Result<RasterFrame, SourceError>`,
//! typically a raster reader outside this crate. [`FrameStream`] wraps it and
//! checks every frame it hands to the engine.

use chrono::NaiveDateTime;

use crate::domain::RasterFrame;
use crate::error::{EngineError, SourceError};
use crate::models::ModelSet;

/// In-memory series, mostly for tests and small synthetic runs.
#[derive(Debug, Clone, Default)]
pub struct MemorySeries {
    frames: Vec<RasterFrame>,
}

impl MemorySeries {
    pub fn new(frames: Vec<RasterFrame>) -> Self {
        Self { frames }
    }

    pub fn push(&mut self, frame: RasterFrame) {
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[RasterFrame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [RasterFrame] {
        &mut self.frames
    }
}

impl From<Vec<RasterFrame>> for MemorySeries {
    fn from(frames: Vec<RasterFrame>) -> Self {
        Self::new(frames)
    }
}

impl IntoIterator for MemorySeries {
    type Item = Result<RasterFrame, SourceError>;
    type IntoIter = std::iter::Map<std::vec::IntoIter<RasterFrame>, fn(RasterFrame) -> Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter().map(Ok as fn(RasterFrame) -> Self::Item)
    }
}

/// Forward-only, validating view over a source.
///
/// Every frame must carry each layer's variable, have bands of one shape equal
/// to the first frame's, and be strictly later than the previous frame.
pub(crate) struct FrameStream<'a, I> {
    inner: I,
    models: &'a ModelSet,
    shape: Option<(usize, usize)>,
    last: Option<NaiveDateTime>,
    exhausted: bool,
    visited: usize,
}

impl<'a, I> FrameStream<'a, I>
where
    I: Iterator<Item = Result<RasterFrame, SourceError>>,
{
    pub(crate) fn new(inner: I, models: &'a ModelSet) -> Self {
        Self {
            inner,
            models,
            shape: None,
            last: None,
            exhausted: false,
            visited: 0,
        }
    }

    /// Next checked frame; `Ok(None)` once the source is drained.
    pub(crate) fn pull(&mut self) -> Result<Option<RasterFrame>, EngineError> {
        if self.exhausted {
            return Ok(None);
        }
        let Some(item) = self.inner.next() else {
            self.exhausted = true;
            return Ok(None);
        };
        let frame = item.map_err(EngineError::Source)?;
        self.check(&frame)?;
        self.visited += 1;
        Ok(Some(frame))
    }

    /// Grid shape fixed by the first frame.
    pub(crate) fn shape(&self) -> Option<(usize, usize)> {
        self.shape
    }

    pub(crate) fn visited(&self) -> usize {
        self.visited
    }

    fn check(&mut self, frame: &RasterFrame) -> Result<(), EngineError> {
        let time = frame.time();
        if let Some(prev) = self.last {
            if time <= prev {
                return Err(EngineError::UnorderedSource { prev, next: time });
            }
        }

        for layer in self.models {
            if frame.band(&layer.variable).is_none() {
                return Err(EngineError::MissingVariable {
                    variable: layer.variable.clone(),
                    time,
                });
            }
        }

        let shape = frame.shape()?;
        match self.shape {
            None => self.shape = Some(shape),
            Some(expected) if expected != shape => {
                let variable = frame.variables().next().unwrap_or_default().to_string();
                return Err(EngineError::ShapeMismatch {
                    variable,
                    time,
                    expected,
                    found: shape,
                });
            }
            Some(_) => {}
        }

        self.last = Some(time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Layer, LinearGrowth, Model};
    use chrono::NaiveDate;
    use nalgebra::DMatrix;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 6, 1).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn models() -> ModelSet {
        ModelSet::new(vec![Layer::new("tas", "K", Model::Linear(LinearGrowth::new(1.0, 0.0)))])
    }

    fn frame(h: u32, rows: usize) -> RasterFrame {
        RasterFrame::new(at(h), f64::NAN).with_band("tas", DMatrix::zeros(rows, 2), "K")
    }

    #[test]
    fn yields_frames_then_stays_drained() {
        let models = models();
        let series = MemorySeries::new(vec![frame(0, 2), frame(1, 2)]);
        let mut stream = FrameStream::new(series.into_iter(), &models);
        assert!(stream.pull().unwrap().is_some());
        assert!(stream.pull().unwrap().is_some());
        assert!(stream.pull().unwrap().is_none());
        assert!(stream.pull().unwrap().is_none());
        assert_eq!(stream.visited(), 2);
        assert_eq!(stream.shape(), Some((2, 2)));
    }

    #[test]
    fn rejects_out_of_order_frames() {
        let models = models();
        let series = MemorySeries::new(vec![frame(2, 2), frame(1, 2)]);
        let mut stream = FrameStream::new(series.into_iter(), &models);
        stream.pull().unwrap();
        assert!(matches!(stream.pull(), Err(EngineError::UnorderedSource { .. })));
    }

    #[test]
    fn rejects_shape_change_between_frames() {
        let models = models();
        let series = MemorySeries::new(vec![frame(0, 2), frame(1, 3)]);
        let mut stream = FrameStream::new(series.into_iter(), &models);
        stream.pull().unwrap();
        assert!(matches!(stream.pull(), Err(EngineError::ShapeMismatch { .. })));
    }

    #[test]
    fn rejects_missing_variable() {
        let models = models();
        let bad = RasterFrame::new(at(0), f64::NAN).with_band("pr", DMatrix::zeros(2, 2), "mm");
        let mut stream = FrameStream::new(MemorySeries::new(vec![bad]).into_iter(), &models);
        match stream.pull() {
            Err(EngineError::MissingVariable { variable, .. }) => assert_eq!(variable, "tas"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn source_errors_are_wrapped() {
        let models = models();
        let failing = vec![Err::<RasterFrame, SourceError>("disk gone".into())];
        let mut stream = FrameStream::new(failing.into_iter(), &models);
        assert!(matches!(stream.pull(), Err(EngineError::Source(_))));
    }
}
