//! HTTP handlers

pub mod growth;
pub mod health;
pub mod planting;

pub use growth::*;
pub use health::*;
pub use planting::*;
