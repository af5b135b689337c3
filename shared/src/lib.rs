//! Shared types, models and engines for the Rice Planting Advisor
//!
//! This crate contains the pure prediction and crop-tracking logic shared
//! between the backend, the browser (via WASM), and other components of the
//! system.

pub mod engine;
pub mod error;
pub mod models;
pub mod quarter;
pub mod types;
pub mod validation;

pub use engine::*;
pub use error::*;
pub use models::*;
pub use quarter::*;
pub use types::*;
pub use validation::*;
