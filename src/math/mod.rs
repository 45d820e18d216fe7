//! Numerical building blocks: thermal rate formulas.

pub mod thermal;

pub use thermal::*;
