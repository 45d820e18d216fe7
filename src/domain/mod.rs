//! Domain types.
//!
//! Grids are `nalgebra::DMatrix<f64>` (rows × cols); timestamps are
//! `chrono::NaiveDateTime`.

pub mod frame;
pub mod types;

pub use frame::*;
pub use types::*;
