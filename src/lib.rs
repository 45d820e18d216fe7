//! `growth-maps` library crate.
//!
//! Turns a time series of gridded environmental variables into a gridded
//! series of biological growth rates:
//!
//! - a [`models::ModelSet`] of layers (growth and stress models bound to
//!   input variables) is evaluated cell by cell on each source frame
//! - the [`engine`] streams frames forward once and emits one grid per
//!   target timestamp
//! - the [`fit`] module calibrates free model parameters to observations
//!
//! There is no binary; callers drive the library directly.

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod units;
