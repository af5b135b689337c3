//! Error taxonomy for the planting and crop-tracking engines

use thiserror::Error;

use crate::quarter::Quarter;

/// Errors produced by engine operations
///
/// A quarter that the forecast does not reach is not an error; see
/// [`crate::models::CoverageStatus`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed or out-of-range input
    #[error("Invalid {field}: {message}")]
    Input { field: String, message: String },

    /// Forecast or historical source could not be reached or parsed
    #[error("Weather data provider failed: {0}")]
    Provider(String),

    #[error("{0} not found")]
    NotFound(String),

    /// No historical record exists for the quarter in any year
    #[error("No historical baseline for {quarter}")]
    MissingBaseline { quarter: Quarter },

    /// No quarter of the year has any historical record
    #[error("No historical baselines for any quarter of {year}")]
    NoBaselines { year: i32 },
}

impl EngineError {
    pub fn input(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Input {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
