//! Terminal-friendly text summaries.
//!
//! Formatting is kept separate from computation so callers can log, print or
//! ignore these strings.

use std::fmt::Write as _;

use crate::domain::OutputSeries;
use crate::fit::FitOutcome;
use crate::models::ModelSet;
use crate::report::series_stats;

/// One line per output step: time, valid/missing cells, min/mean/max.
pub fn format_series_summary(series: &OutputSeries) -> String {
    let (rows, cols) = series.shape();
    let mut out = String::new();
    let _ = writeln!(out, "Output series: {} step(s), grid {rows}x{cols}", series.len());
    let _ = writeln!(
        out,
        "{:<20} {:>8} {:>8} {:>12} {:>12} {:>12}",
        "time", "valid", "missing", "min", "mean", "max"
    );
    for (frame, s) in series.iter().zip(series_stats(series)) {
        let _ = writeln!(
            out,
            "{:<20} {:>8} {:>8} {:>12.6} {:>12.6} {:>12.6}",
            frame.time.format("%Y-%m-%d %H:%M").to_string(),
            s.valid,
            s.missing,
            s.min,
            s.mean,
            s.max
        );
    }
    out
}

/// Fitted free parameters and fit quality.
pub fn format_fit_summary(outcome: &FitOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Fit: n={} sse={:.6e} rmse={:.6e} iterations={}",
        outcome.n, outcome.sse, outcome.rmse, outcome.iterations
    );
    out.push_str(&format_parameters(&outcome.models));
    out
}

/// Free parameters of a model set with their bounds.
pub fn format_parameters(models: &ModelSet) -> String {
    let mut out = String::new();
    for p in models.free_params() {
        let _ = writeln!(
            out,
            "  [{}] {}/{}.{:<10} = {:>14.6} in [{}, {}]",
            p.layer, p.variable, p.model, p.name, p.value, p.lower, p.upper
        );
    }
    out
}
