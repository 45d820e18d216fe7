//! Input/output helpers.
//!
//! - observation CSV ingest + validation (`observations`)
//! - model set JSON read/write (`modelset`)
//! - run configuration JSON (`config`)

pub mod config;
pub mod modelset;
pub mod observations;

pub use config::*;
pub use modelset::*;
pub use observations::*;
