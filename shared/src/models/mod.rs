//! Domain models for the Rice Planting Advisor

mod growth;
mod planting;
mod weather;

pub use growth::*;
pub use planting::*;
pub use weather::*;
