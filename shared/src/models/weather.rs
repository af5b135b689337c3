//! Weather data models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::quarter::Quarter;
use crate::types::GpsCoordinates;

/// One day of forecast weather
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherDayPoint {
    pub date: NaiveDate,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub precipitation_mm: f64,
    pub wind_mps: f64,
}

/// Ordered daily forecast for a location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherForecast {
    pub location: GpsCoordinates,
    pub days: Vec<WeatherDayPoint>,
}

impl WeatherForecast {
    pub fn new(location: GpsCoordinates, days: Vec<WeatherDayPoint>) -> Self {
        Self { location, days }
    }
}

/// Historical weather aggregated at the 7-day window scale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalWeather {
    pub mean_temperature_c: f64,
    pub weekly_precipitation_mm: f64,
    pub mean_humidity_percent: f64,
    pub mean_wind_mps: f64,
}

/// Historical yield and weather reference for one quarter of one year
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalRecord {
    pub quarter: Quarter,
    pub year: i32,
    /// Yield in tonnes per hectare
    pub yield_t_per_ha: f64,
    /// Number of observations averaged into this record
    pub sample_size: u32,
    pub weather: HistoricalWeather,
}
