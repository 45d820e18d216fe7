//! Output timespan and sub-period policy.

use std::fmt;
use std::sync::Arc;

use chrono::{Months, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::SpecError;

/// Per-cell reduction of the combined values of several frames.
#[derive(Clone)]
pub enum Reducer {
    Mean,
    Sum,
    Min,
    Max,
    Custom(Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>),
}

impl Reducer {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        Reducer::Custom(Arc::new(f))
    }

    /// Reduce a non-empty slice. NaN for an empty one.
    pub fn reduce(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        match self {
            Reducer::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Reducer::Sum => values.iter().sum(),
            Reducer::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Reducer::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Reducer::Custom(f) => f(values),
        }
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Mean => f.write_str("Mean"),
            Reducer::Sum => f.write_str("Sum"),
            Reducer::Min => f.write_str("Min"),
            Reducer::Max => f.write_str("Max"),
            Reducer::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Which source frames feed one output step.
#[derive(Debug, Clone, Default)]
pub enum SubPeriod {
    /// The single frame closest in time to the target; ties go to the earlier
    /// frame.
    #[default]
    Nearest,
    /// Every frame in `[target, next target)`, reduced cell-wise.
    Window(Reducer),
}

/// Serializable sub-period choice for config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodPolicy {
    #[default]
    Nearest,
    Mean,
    Sum,
    Min,
    Max,
}

impl From<PeriodPolicy> for SubPeriod {
    fn from(value: PeriodPolicy) -> Self {
        match value {
            PeriodPolicy::Nearest => SubPeriod::Nearest,
            PeriodPolicy::Mean => SubPeriod::Window(Reducer::Mean),
            PeriodPolicy::Sum => SubPeriod::Window(Reducer::Sum),
            PeriodPolicy::Min => SubPeriod::Window(Reducer::Min),
            PeriodPolicy::Max => SubPeriod::Window(Reducer::Max),
        }
    }
}

/// Target timestamps (strictly increasing, non-empty) plus sub-period policy.
#[derive(Debug, Clone)]
pub struct OutputSpec {
    targets: Vec<NaiveDateTime>,
    policy: SubPeriod,
}

impl OutputSpec {
    pub fn new(targets: Vec<NaiveDateTime>) -> Result<Self, SpecError> {
        if targets.is_empty() {
            return Err(SpecError::EmptyTimespan);
        }
        for pair in targets.windows(2) {
            if pair[1] <= pair[0] {
                return Err(SpecError::UnorderedTimespan {
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(Self {
            targets,
            policy: SubPeriod::default(),
        })
    }

    /// `count` targets `start, start + step, ...`.
    pub fn regular(start: NaiveDateTime, step: TimeDelta, count: usize) -> Result<Self, SpecError> {
        if step <= TimeDelta::zero() {
            return Err(SpecError::NonPositiveStep);
        }
        let targets = (0..count)
            .map(|i| {
                i32::try_from(i)
                    .ok()
                    .and_then(|k| step.checked_mul(k))
                    .and_then(|offset| start.checked_add_signed(offset))
                    .ok_or(SpecError::OutOfRange { index: i })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(targets)
    }

    /// `count` targets one calendar month apart.
    pub fn monthly(start: NaiveDateTime, count: usize) -> Result<Self, SpecError> {
        let targets = (0..count)
            .map(|i| {
                u32::try_from(i)
                    .ok()
                    .and_then(|k| start.checked_add_months(Months::new(k)))
                    .ok_or(SpecError::OutOfRange { index: i })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(targets)
    }

    pub fn with_policy(mut self, policy: impl Into<SubPeriod>) -> Self {
        self.policy = policy.into();
        self
    }

    pub fn targets(&self) -> &[NaiveDateTime] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Always false for a constructed spec.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn policy(&self) -> &SubPeriod {
        &self.policy
    }

    /// Exclusive end of step `i`: the next target, or for the last step the
    /// previous step length added to it. `None` (open-ended) for a single
    /// target.
    pub fn period_end(&self, i: usize) -> Option<NaiveDateTime> {
        if let Some(next) = self.targets.get(i + 1) {
            return Some(*next);
        }
        let last = *self.targets.get(i)?;
        let prev = *self.targets.get(i.checked_sub(1)?)?;
        last.checked_add_signed(last - prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn rejects_empty_and_unordered_targets() {
        assert_eq!(OutputSpec::new(vec![]).unwrap_err(), SpecError::EmptyTimespan);
        assert!(matches!(
            OutputSpec::new(vec![day(2), day(2)]),
            Err(SpecError::UnorderedTimespan { .. })
        ));
    }

    #[test]
    fn regular_steps_are_evenly_spaced() {
        let spec = OutputSpec::regular(day(1), TimeDelta::days(2), 3).unwrap();
        assert_eq!(spec.targets(), &[day(1), day(3), day(5)]);
        assert!(OutputSpec::regular(day(1), TimeDelta::zero(), 3).is_err());
    }

    #[test]
    fn monthly_uses_calendar_months() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let spec = OutputSpec::monthly(start, 3).unwrap();
        assert_eq!(spec.targets()[1].date(), NaiveDate::from_ymd_opt(2021, 2, 28).unwrap());
        assert_eq!(spec.targets()[2].date(), NaiveDate::from_ymd_opt(2021, 3, 31).unwrap());
    }

    #[test]
    fn last_period_reuses_previous_step() {
        let spec = OutputSpec::new(vec![day(1), day(4), day(6)]).unwrap();
        assert_eq!(spec.period_end(0), Some(day(4)));
        assert_eq!(spec.period_end(2), Some(day(8)));
        let single = OutputSpec::new(vec![day(1)]).unwrap();
        assert_eq!(single.period_end(0), None);
    }

    #[test]
    fn reducers() {
        let v = [1.0, 4.0, 2.5];
        assert_eq!(Reducer::Mean.reduce(&v), 2.5);
        assert_eq!(Reducer::Sum.reduce(&v), 7.5);
        assert_eq!(Reducer::Min.reduce(&v), 1.0);
        assert_eq!(Reducer::Max.reduce(&v), 4.0);
        assert_eq!(Reducer::custom(|xs| xs[0]).reduce(&v), 1.0);
        assert!(Reducer::Mean.reduce(&[]).is_nan());
    }

    #[test]
    fn default_policy_is_nearest() {
        let spec = OutputSpec::new(vec![day(1)]).unwrap();
        assert!(matches!(spec.policy(), SubPeriod::Nearest));
        let spec = spec.with_policy(PeriodPolicy::Mean);
        assert!(matches!(spec.policy(), SubPeriod::Window(Reducer::Mean)));
    }
}
