//! Planting window selection
//!
//! Slides a 7-day window over the forecast, keeps the windows that sit
//! entirely inside the target quarter, and ranks them by weather score.

use std::cmp::Ordering;

use crate::error::EngineResult;
use crate::models::{CandidateWindow, CoverageStatus, RiskFlag, WeatherDayPoint, WindowSelection};
use crate::quarter::Quarter;
use crate::types::DateRange;

/// Days in a planting window
pub const WINDOW_DAYS: usize = 7;

/// Forecast horizon requested from the provider unless configured otherwise
pub const DEFAULT_HORIZON_DAYS: u32 = 16;

/// Scoring thresholds and weights for candidate windows
#[derive(Debug, Clone, PartialEq)]
pub struct WindowThresholds {
    /// Daily rainfall above which a day is flagged as heavy rain
    pub heavy_rain_mm: f64,
    /// Wind speed above which a day is flagged as stormy
    pub storm_wind_mps: f64,
    /// Viable germination temperature band
    pub germination_min_c: f64,
    pub germination_max_c: f64,
    /// Temperature variance at which the temperature stability term reaches 0
    pub temperature_variance_ceiling: f64,
    /// Wind variance at which the wind stability term reaches 0
    pub wind_variance_ceiling: f64,
    pub temperature_weight: f64,
    pub wind_weight: f64,
    /// Points subtracted from the weather score per risk flag
    pub risk_penalty: f64,
}

impl Default for WindowThresholds {
    fn default() -> Self {
        Self {
            heavy_rain_mm: 25.0,
            storm_wind_mps: 10.0,
            germination_min_c: 20.0,
            germination_max_c: 35.0,
            temperature_variance_ceiling: 9.0,
            wind_variance_ceiling: 16.0,
            temperature_weight: 0.6,
            wind_weight: 0.4,
            risk_penalty: 15.0,
        }
    }
}

/// Scores and ranks 7-day planting windows
#[derive(Debug, Clone, Default)]
pub struct PlantingWindowSelector {
    thresholds: WindowThresholds,
}

impl PlantingWindowSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rank every full window of `quarter` in `year` found in the forecast
    pub fn select(
        &self,
        forecast: &[WeatherDayPoint],
        quarter: Quarter,
        year: i32,
    ) -> EngineResult<WindowSelection> {
        let range = quarter.date_range(year)?;

        let reaches_quarter = match (forecast.first(), forecast.last()) {
            (Some(first), Some(last)) => range.intersects(&DateRange::new(first.date, last.date)),
            _ => false,
        };

        if !reaches_quarter {
            return Ok(WindowSelection {
                quarter,
                year,
                status: CoverageStatus::NoForecastCoverage,
                best_window: None,
                windows: Vec::new(),
            });
        }

        let mut windows: Vec<CandidateWindow> = forecast
            .windows(WINDOW_DAYS)
            .filter(|days| is_contiguous(days) && days.iter().all(|d| range.contains(d.date)))
            .map(|days| self.score_window(days))
            .collect();

        windows.sort_by(rank_order);

        let status = if windows.is_empty() {
            CoverageStatus::InsufficientCoverage
        } else {
            CoverageStatus::Ranked
        };

        Ok(WindowSelection {
            quarter,
            year,
            status,
            best_window: windows.first().cloned(),
            windows,
        })
    }

    /// Score a run of forecast days as one candidate window
    pub fn score_window(&self, days: &[WeatherDayPoint]) -> CandidateWindow {
        let stability_score = self.stability_score(days);
        let risk_flags = self.risk_flags(days);
        let weather_score = stability_score - self.thresholds.risk_penalty * risk_flags.len() as f64;

        CandidateWindow {
            start_date: days.first().map(|d| d.date).unwrap_or_default(),
            end_date: days.last().map(|d| d.date).unwrap_or_default(),
            days: days.to_vec(),
            stability_score,
            risk_flags,
            weather_score,
        }
    }

    /// 0-100; 100 when temperature and wind do not vary at all
    pub fn stability_score(&self, days: &[WeatherDayPoint]) -> f64 {
        let t = &self.thresholds;
        let temperature_variance = variance(days.iter().map(|d| d.temperature_c));
        let wind_variance = variance(days.iter().map(|d| d.wind_mps));

        let temperature_term = inverse_normalized(temperature_variance, t.temperature_variance_ceiling);
        let wind_term = inverse_normalized(wind_variance, t.wind_variance_ceiling);
        let weight_sum = t.temperature_weight + t.wind_weight;

        if weight_sum <= 0.0 {
            return 0.0;
        }

        ((t.temperature_weight * temperature_term + t.wind_weight * wind_term) / weight_sum * 100.0)
            .clamp(0.0, 100.0)
    }

    /// Every threshold breach in the window, in day order
    pub fn risk_flags(&self, days: &[WeatherDayPoint]) -> Vec<RiskFlag> {
        let t = &self.thresholds;
        let mut flags = Vec::new();

        for day in days {
            if day.precipitation_mm > t.heavy_rain_mm {
                flags.push(RiskFlag::HeavyRain {
                    date: day.date,
                    precipitation_mm: day.precipitation_mm,
                });
            }
            if day.wind_mps > t.storm_wind_mps {
                flags.push(RiskFlag::StormWind {
                    date: day.date,
                    wind_mps: day.wind_mps,
                });
            }
            if day.temperature_c < t.germination_min_c || day.temperature_c > t.germination_max_c {
                flags.push(RiskFlag::TemperatureOutOfRange {
                    date: day.date,
                    temperature_c: day.temperature_c,
                });
            }
        }

        flags
    }
}

/// Best weather score first, earliest start first on ties
fn rank_order(a: &CandidateWindow, b: &CandidateWindow) -> Ordering {
    b.weather_score
        .total_cmp(&a.weather_score)
        .then_with(|| a.start_date.cmp(&b.start_date))
}

fn is_contiguous(days: &[WeatherDayPoint]) -> bool {
    days.windows(2)
        .all(|pair| pair[0].date.succ_opt() == Some(pair[1].date))
}

fn inverse_normalized(variance: f64, ceiling: f64) -> f64 {
    if ceiling <= 0.0 {
        return if variance <= 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - variance / ceiling).clamp(0.0, 1.0)
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Population variance
pub(crate) fn variance(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let m = mean(values.clone());
    let (sum_sq, count) = values.fold((0.0, 0usize), |(s, n), v| (s + (v - m).powi(2), n + 1));
    if count == 0 {
        0.0
    } else {
        sum_sq / count as f64
    }
}
