//! Prediction and crop-tracking engines
//!
//! Everything in here is synchronous and free of I/O. Callers fetch the
//! forecast and historical records once and pass them in.

pub mod growth_stage;
pub mod quarter_selector;
pub mod window_selector;
pub mod yield_estimator;

pub use growth_stage::GrowthStageEngine;
pub use quarter_selector::{HistoricalBaselines, QuarterSelector};
pub use window_selector::{PlantingWindowSelector, WindowThresholds};
pub use yield_estimator::{HorizonCoverage, YieldCoefficients, YieldEstimator};
