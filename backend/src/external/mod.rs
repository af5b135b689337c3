//! External data sources

pub mod weather;

use shared::{GpsCoordinates, HistoricalRecord, Quarter, WeatherForecast};

use crate::error::AppResult;

pub use weather::{OpenMeteoClient, MAX_FORECAST_DAYS};

/// Source of daily forecasts and historical quarter baselines.
///
/// Any failure to reach or parse the source is reported as
/// [`crate::error::AppError::Provider`].
#[axum::async_trait]
pub trait WeatherForecastProvider: Send + Sync {
    /// Ordered daily forecast starting today, at most `horizon_days` long
    async fn get_forecast(
        &self,
        coordinates: GpsCoordinates,
        horizon_days: u32,
    ) -> AppResult<WeatherForecast>;

    /// Baseline for one quarter of one year
    async fn get_historical(&self, quarter: Quarter, year: i32)
        -> AppResult<Option<HistoricalRecord>>;

    /// Every stored baseline for a quarter, any year
    async fn list_historical(&self, quarter: Quarter) -> AppResult<Vec<HistoricalRecord>>;
}
