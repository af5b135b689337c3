//! Business logic services for the Rice Planting Advisor

pub mod growth;
pub mod planting;
pub mod weather;

pub use growth::GrowthCycleService;
pub use planting::{AnalysisStore, PgAnalysisStore, PlantingService};
pub use weather::WeatherService;
