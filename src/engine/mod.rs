//! Spatiotemporal rate aggregation.
//!
//! Responsibilities:
//!
//! - describe the output timespan and sub-period policy (`spec`)
//! - stream and check source frames (`source`)
//! - evaluate a model set cell-wise over frames (`evaluate`, parallel)
//! - drive a whole run (`mapgrowth`)

pub mod evaluate;
pub mod mapgrowth;
pub mod source;
pub mod spec;

pub use mapgrowth::*;
pub use source::MemorySeries;
pub use spec::*;
