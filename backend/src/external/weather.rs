//! Forecast API client
//!
//! Integrates with the Open-Meteo daily forecast API

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use shared::{GpsCoordinates, WeatherDayPoint, WeatherForecast};

use crate::error::{AppError, AppResult};

/// Longest horizon the daily endpoint serves
pub const MAX_FORECAST_DAYS: u32 = 16;

const DAILY_VARIABLES: &str =
    "temperature_2m_mean,relative_humidity_2m_mean,precipitation_sum,wind_speed_10m_max";

/// Daily forecast client
#[derive(Clone)]
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

/// Open-Meteo forecast response
#[derive(Debug, Deserialize)]
struct OMForecastResponse {
    daily: OMDaily,
}

/// Parallel arrays, one entry per day; a value is null when the model has no data
#[derive(Debug, Deserialize)]
struct OMDaily {
    time: Vec<String>,
    temperature_2m_mean: Vec<Option<f64>>,
    relative_humidity_2m_mean: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    wind_speed_10m_max: Vec<Option<f64>>,
}

impl OpenMeteoClient {
    /// Create a new client against `base_url`
    pub fn new(base_url: String, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Fetch the daily forecast for a coordinate
    pub async fn get_daily_forecast(
        &self,
        coordinates: GpsCoordinates,
        horizon_days: u32,
    ) -> AppResult<WeatherForecast> {
        let days = horizon_days.clamp(1, MAX_FORECAST_DAYS);
        let url = format!(
            "{}?latitude={}&longitude={}&daily={}&forecast_days={}&wind_speed_unit=ms&timezone=auto",
            self.base_url, coordinates.latitude, coordinates.longitude, DAILY_VARIABLES, days
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Forecast request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Forecast API error: {} - {}",
                status, body
            )));
        }

        let data: OMForecastResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse forecast response: {}", e)))?;

        let points = convert_daily(data.daily)?;
        tracing::debug!(
            latitude = coordinates.latitude,
            longitude = coordinates.longitude,
            days = points.len(),
            "Fetched daily forecast"
        );

        Ok(WeatherForecast::new(coordinates, points))
    }
}

/// Turn the parallel daily arrays into day points.
///
/// Days with any missing variable are dropped, leaving a gap the window
/// scan will not bridge.
fn convert_daily(daily: OMDaily) -> AppResult<Vec<WeatherDayPoint>> {
    let len = daily.time.len();
    if daily.temperature_2m_mean.len() != len
        || daily.relative_humidity_2m_mean.len() != len
        || daily.precipitation_sum.len() != len
        || daily.wind_speed_10m_max.len() != len
    {
        return Err(AppError::Provider(
            "Forecast response has mismatched daily arrays".to_string(),
        ));
    }

    let mut points = Vec::with_capacity(len);
    for (i, time) in daily.time.iter().enumerate() {
        let date = NaiveDate::parse_from_str(time, "%Y-%m-%d")
            .map_err(|_| AppError::Provider(format!("Invalid forecast date: {}", time)))?;

        let values = (
            daily.temperature_2m_mean[i],
            daily.relative_humidity_2m_mean[i],
            daily.precipitation_sum[i],
            daily.wind_speed_10m_max[i],
        );
        match values {
            (Some(temperature_c), Some(humidity_percent), Some(precipitation_mm), Some(wind_mps)) => {
                points.push(WeatherDayPoint {
                    date,
                    temperature_c,
                    humidity_percent,
                    precipitation_mm,
                    wind_mps,
                })
            }
            _ => tracing::warn!(%date, "Dropping forecast day with missing values"),
        }
    }

    points.sort_by_key(|p| p.date);
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> OMDaily {
        serde_json::from_str::<OMForecastResponse>(json).unwrap().daily
    }

    #[test]
    fn test_convert_daily_forecast() {
        let daily = parse(
            r#"{
                "latitude": 14.6,
                "longitude": 120.98,
                "daily": {
                    "time": ["2025-04-01", "2025-04-02"],
                    "temperature_2m_mean": [28.4, 29.1],
                    "relative_humidity_2m_mean": [78, 81],
                    "precipitation_sum": [0.0, 12.5],
                    "wind_speed_10m_max": [3.2, 6.8]
                }
            }"#,
        );

        let points = convert_daily(daily).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        assert_eq!(points[1].precipitation_mm, 12.5);
        assert_eq!(points[1].humidity_percent, 81.0);
    }

    #[test]
    fn test_days_with_nulls_are_dropped() {
        let daily = parse(
            r#"{
                "daily": {
                    "time": ["2025-04-01", "2025-04-02", "2025-04-03"],
                    "temperature_2m_mean": [28.4, null, 27.9],
                    "relative_humidity_2m_mean": [78, 80, 79],
                    "precipitation_sum": [0.0, 1.0, 2.0],
                    "wind_speed_10m_max": [3.2, 3.0, 2.9]
                }
            }"#,
        );

        let points = convert_daily(daily).unwrap();
        let dates: Vec<_> = points.iter().map(|p| p.date.to_string()).collect();
        assert_eq!(dates, vec!["2025-04-01", "2025-04-03"]);
    }

    #[test]
    fn test_mismatched_arrays_are_provider_errors() {
        let daily = parse(
            r#"{
                "daily": {
                    "time": ["2025-04-01", "2025-04-02"],
                    "temperature_2m_mean": [28.4],
                    "relative_humidity_2m_mean": [78, 80],
                    "precipitation_sum": [0.0, 1.0],
                    "wind_speed_10m_max": [3.2, 3.0]
                }
            }"#,
        );

        assert!(matches!(convert_daily(daily), Err(AppError::Provider(_))));
    }
}
