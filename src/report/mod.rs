//! Reporting utilities: per-grid statistics and text summaries.

pub mod format;
pub mod stats;

pub use format::*;
pub use stats::*;
