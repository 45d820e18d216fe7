//! Rate models, layers and their combination.
//!
//! Models are small pure values so the engine and the fitter can share them
//! read-only.

pub mod combine;
pub mod layer;
pub mod model;
pub mod params;

pub use combine::*;
pub use layer::*;
pub use model::*;
pub use params::*;
