use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use nalgebra::DMatrix;

use growth_maps::domain::{OutputSeries, RasterFrame};
use growth_maps::engine::{
    EngineOptions, GrowthMapper, MemorySeries, OutputSpec, PeriodPolicy, Reducer, SubPeriod, mapgrowth,
};
use growth_maps::error::EngineError;
use growth_maps::fit::{FitOptions, ModelCell, fit};
use growth_maps::models::{Layer, LinearGrowth, Model, ModelSet, Param, Schoolfield, Stress};
use growth_maps::units::{IdentityConverter, TemperatureConverter};

const SENTINEL: f64 = -9999.0;
const N: usize = 10;

fn day(d: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap() + TimeDelta::days(d)
}

/// Air temperature in °C, 10..~21 across the grid and rising by 1 per frame.
fn celsius(k: usize) -> DMatrix<f64> {
    DMatrix::from_fn(N, N, |r, c| 10.0 + 0.5 * r as f64 + 0.3 * c as f64 + k as f64)
}

fn frame(time: NaiveDateTime, grid: DMatrix<f64>) -> RasterFrame {
    RasterFrame::new(time, SENTINEL).with_band("tas", grid, "°C")
}

fn daily_series(n: usize) -> MemorySeries {
    (0..n).map(|k| frame(day(k as i64), celsius(k))).collect::<Vec<_>>().into()
}

fn daily_targets(n: usize) -> OutputSpec {
    OutputSpec::regular(day(0), TimeDelta::days(1), n).unwrap()
}

fn schoolfield() -> Model {
    Model::Schoolfield(Schoolfield::new(0.3, 2e4, -1e5, 150.0, 3e5, 400.0, 298.15))
}

fn growth_only() -> ModelSet {
    ModelSet::new(vec![Layer::new("tas", "K", schoolfield())])
}

fn run(models: &ModelSet, source: MemorySeries, spec: &OutputSpec) -> Result<OutputSeries, EngineError> {
    mapgrowth(models, source, spec, &TemperatureConverter)
}

#[test]
fn growth_only_grid_is_non_negative_with_sentinel_passthrough() {
    let mut source = daily_series(5);
    source.frames_mut()[2].band_mut("tas").unwrap().grid[(0, 0)] = SENTINEL;

    let out = run(&growth_only(), source, &daily_targets(5)).unwrap();

    assert_eq!(out.len(), 5);
    assert_eq!(out.shape(), (N, N));
    for (k, f) in out.iter().enumerate() {
        assert_eq!(f.time, day(k as i64));
        assert_eq!(f.grid.shape(), (N, N));
        for (idx, &v) in f.grid.iter().enumerate() {
            if k == 2 && idx == 0 {
                assert_eq!(v, SENTINEL);
            } else {
                assert!(v.is_finite() && v >= 0.0, "frame {k} cell {idx}: {v}");
            }
        }
    }
}

#[test]
fn output_matches_model_rate_per_cell() {
    let models = growth_only();
    let out = run(&models, daily_series(2), &daily_targets(2)).unwrap();
    let expected = models.rate(celsius(1)[(3, 4)] + 273.15);
    assert!((out.get(1).unwrap().grid[(3, 4)] - expected).abs() < 1e-12);
}

#[test]
fn lower_stress_below_all_inputs_changes_nothing() {
    let baseline = run(&growth_only(), daily_series(3), &daily_targets(3)).unwrap();

    let stressed = growth_only().with_layer(Layer::new(
        "tas",
        "°C",
        Model::LowerStress(Stress::new(-5.0, -0.2)),
    ));
    let out = run(&stressed, daily_series(3), &daily_targets(3)).unwrap();

    assert_eq!(out, baseline);
}

#[test]
fn combined_is_growth_plus_stress() {
    let models = growth_only().with_layer(Layer::new(
        "tas",
        "°C",
        Model::UpperStress(Stress::from_survival(15.0, 0.9).unwrap()),
    ));
    let out = run(&models, daily_series(3), &daily_targets(3)).unwrap();

    let growth = schoolfield();
    let stress = Model::UpperStress(Stress::from_survival(15.0, 0.9).unwrap());
    for (k, f) in out.iter().enumerate() {
        let input = celsius(k);
        for (idx, &v) in f.grid.iter().enumerate() {
            let x = input[idx];
            let expected = growth.rate(x + 273.15).max(0.0) + stress.conditional_rate(x);
            assert!((v - expected).abs() < 1e-12, "frame {k} cell {idx}");
        }
    }
    // Warm corner is stressed, cold corner is not.
    assert!(out.get(2).unwrap().grid[(N - 1, N - 1)] < growth.rate(celsius(2)[(N - 1, N - 1)] + 273.15));
}

#[test]
fn window_mean_averages_contributing_frames() {
    let models = ModelSet::new(vec![Layer::new(
        "tas",
        "°C",
        Model::Linear(LinearGrowth::new(0.1, 5.0)),
    )]);
    let frames: Vec<RasterFrame> = (0..6)
        .map(|k| frame(day(0) + TimeDelta::hours(12 * k as i64), celsius(k)))
        .collect();
    let spec = daily_targets(3).with_policy(PeriodPolicy::Mean);

    let out = mapgrowth(&models, MemorySeries::new(frames), &spec, &IdentityConverter).unwrap();

    assert_eq!(out.len(), 3);
    for (i, f) in out.iter().enumerate() {
        let a = celsius(2 * i);
        let b = celsius(2 * i + 1);
        for idx in 0..N * N {
            let expected = (0.1 * (a[idx] - 5.0) + 0.1 * (b[idx] - 5.0)) / 2.0;
            assert!((f.grid[idx] - expected).abs() < 1e-12);
        }
    }
}

#[test]
fn custom_reducer_applies_to_single_frame_windows() {
    let models = ModelSet::new(vec![Layer::new(
        "tas",
        "°C",
        Model::Linear(LinearGrowth::new(1.0, 0.0)),
    )]);
    let frames = vec![
        frame(day(0), DMatrix::from_element(1, 1, 3.0)),
        frame(day(1), DMatrix::from_element(1, 1, 3.0)),
    ];
    let spec = daily_targets(2).with_policy(SubPeriod::Window(Reducer::custom(|xs| xs.iter().sum::<f64>() * 10.0)));

    let out = mapgrowth(&models, MemorySeries::new(frames), &spec, &IdentityConverter).unwrap();

    assert_eq!(out.len(), 2);
    for f in out.iter() {
        assert_eq!(f.grid[(0, 0)], 30.0);
    }
}

#[test]
fn empty_window_aborts_the_run() {
    let source = MemorySeries::new(vec![frame(day(0), celsius(0)), frame(day(2), celsius(2))]);
    let spec = daily_targets(3).with_policy(PeriodPolicy::Max);

    let err = run(&growth_only(), source, &spec).unwrap_err();
    assert!(matches!(err, EngineError::EmptyPeriod(t) if t == day(1)));
}

#[test]
fn nearest_tie_takes_the_earlier_frame() {
    let models = ModelSet::new(vec![Layer::new(
        "tas",
        "°C",
        Model::Linear(LinearGrowth::new(1.0, 0.0)),
    )]);
    let source = MemorySeries::new(vec![frame(day(0), celsius(0)), frame(day(2), celsius(2))]);

    let out = mapgrowth(&models, source, &daily_targets(3), &IdentityConverter).unwrap();
    assert_eq!(out.get(0).unwrap().grid, celsius(0));
    assert_eq!(out.get(1).unwrap().grid, celsius(0));
    assert_eq!(out.get(2).unwrap().grid, celsius(2));
}

#[test]
fn coarse_frames_serve_several_targets() {
    let models = ModelSet::new(vec![Layer::new(
        "tas",
        "°C",
        Model::Linear(LinearGrowth::new(1.0, 0.0)),
    )]);
    let source = MemorySeries::new(vec![frame(day(0), celsius(0)), frame(day(1), celsius(1))]);
    let spec = OutputSpec::regular(day(0), TimeDelta::hours(6), 8).unwrap();

    let out = mapgrowth(&models, source, &spec, &IdentityConverter).unwrap();

    assert_eq!(out.len(), 8);
    for (i, f) in out.iter().enumerate() {
        let expected = if i < 3 { celsius(0) } else { celsius(1) };
        assert_eq!(f.grid, expected, "step {i}");
    }
}

#[test]
fn sequential_and_parallel_agree() {
    let models = growth_only();
    let spec = daily_targets(4);
    let par = GrowthMapper::new(&models, &TemperatureConverter)
        .run(daily_series(4), &spec)
        .unwrap();
    let seq = GrowthMapper::new(&models, &TemperatureConverter)
        .with_options(EngineOptions { parallel: false })
        .run(daily_series(4), &spec)
        .unwrap();
    assert_eq!(par, seq);
}

#[test]
fn missing_variable_is_fatal() {
    let models = ModelSet::new(vec![Layer::new("pr", "mm", Model::Linear(LinearGrowth::new(0.1, 0.0)))]);
    let err = run(&models, daily_series(2), &daily_targets(2)).unwrap_err();
    assert!(matches!(err, EngineError::MissingVariable { ref variable, .. } if variable == "pr"));
}

#[test]
fn empty_model_set_is_fatal() {
    let err = run(&ModelSet::default(), daily_series(2), &daily_targets(2)).unwrap_err();
    assert!(matches!(err, EngineError::EmptyModelSet));
}

#[test]
fn shape_change_mid_series_is_fatal() {
    let mut frames: Vec<RasterFrame> = (0..3).map(|k| frame(day(k as i64), celsius(k))).collect();
    frames[2] = frame(day(2), DMatrix::from_element(N, N - 1, 12.0));

    let err = run(&growth_only(), MemorySeries::new(frames), &daily_targets(3)).unwrap_err();
    assert!(matches!(
        err,
        EngineError::ShapeMismatch {
            expected: (N, N),
            found: (N, 9),
            ..
        }
    ));
}

#[test]
fn unconvertible_units_are_fatal() {
    let err = mapgrowth(&growth_only(), daily_series(2), &daily_targets(2), &IdentityConverter).unwrap_err();
    assert!(matches!(err, EngineError::Unit { .. }));
}

#[test]
fn empty_source_is_fatal() {
    let err = run(&growth_only(), MemorySeries::default(), &daily_targets(1)).unwrap_err();
    assert!(matches!(err, EngineError::EmptySource));
}

#[test]
fn fitted_models_drive_a_run() {
    let truth = ModelSet::new(vec![Layer::new(
        "tas",
        "°C",
        Model::Linear(LinearGrowth::new(0.04, 8.0)),
    )]);
    let obs = growth_maps::data::synthetic_observations(&truth, &[10.0, 12.0, 15.0, 18.0, 21.0], 0.0, 1).unwrap();

    let start = ModelSet::new(vec![Layer::new(
        "tas",
        "°C",
        Model::Linear(LinearGrowth::new(Param::free(0.1, 0.0, 1.0), 8.0)),
    )]);
    let outcome = fit(&start, &obs, &FitOptions::default()).unwrap();

    let cell = ModelCell::new(start);
    cell.replace(outcome.models);
    let snapshot = cell.snapshot();

    let out = mapgrowth(&snapshot, daily_series(1), &daily_targets(1), &IdentityConverter).unwrap();
    let expected = 0.04 * (celsius(0)[(0, 0)] - 8.0);
    assert!((out.get(0).unwrap().grid[(0, 0)] - expected).abs() < 1e-9);
}
