//! Yield estimation against historical quarter baselines
//!
//! The prediction is the baseline yield scaled by how far the window's
//! weather departs from the baseline's weather. Confidence is the product
//! of independent factors so that any one weak signal caps it.

use crate::engine::window_selector::{mean, WINDOW_DAYS};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    CandidateWindow, HistoricalComparison, HistoricalRecord, HistoricalWeather, WeatherDayPoint,
    WindowFeatures, YieldEstimate, YieldTrend,
};
use crate::quarter::Quarter;
use crate::types::DateRange;

/// Stability assumed when no live window backs an estimate
pub const UNKNOWN_STABILITY: f64 = 50.0;

/// Domain constants for yield adjustment and confidence
#[derive(Debug, Clone, PartialEq)]
pub struct YieldCoefficients {
    /// Effect of one normalized unit of warmer-than-baseline weather
    pub temperature: f64,
    pub temperature_scale_c: f64,
    /// Effect of one normalized unit of wetter-than-baseline weather
    pub precipitation: f64,
    pub precipitation_scale_mm: f64,
    pub humidity: f64,
    pub humidity_scale_percent: f64,
    pub wind: f64,
    pub wind_scale_mps: f64,
    /// Bounds on the final adjustment factor
    pub min_factor: f64,
    pub max_factor: f64,
    /// Coverage factor when no forecast day is present
    pub coverage_floor: f64,
    /// Sample size at which the sample factor reaches 1
    pub full_confidence_sample: u32,
    pub sample_floor: f64,
    /// Variance factor of a completely unstable window
    pub variance_floor: f64,
    /// Multiplier applied when the baseline comes from another year
    pub fallback_penalty: f64,
    /// Percent change beyond which a trend is improving or declining
    pub trend_threshold_percent: f64,
}

impl Default for YieldCoefficients {
    fn default() -> Self {
        Self {
            temperature: -0.10,
            temperature_scale_c: 5.0,
            precipitation: 0.06,
            precipitation_scale_mm: 50.0,
            humidity: -0.04,
            humidity_scale_percent: 20.0,
            wind: -0.08,
            wind_scale_mps: 5.0,
            min_factor: 0.5,
            max_factor: 1.5,
            coverage_floor: 0.25,
            full_confidence_sample: 10,
            sample_floor: 0.2,
            variance_floor: 0.3,
            fallback_penalty: 0.8,
            trend_threshold_percent: 5.0,
        }
    }
}

/// Predicts yield and confidence for one quarter
#[derive(Debug, Clone, Default)]
pub struct YieldEstimator {
    coefficients: YieldCoefficients,
}

impl YieldEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coefficients(coefficients: YieldCoefficients) -> Self {
        Self { coefficients }
    }

    /// Estimate yield for `quarter` of `year` from window features.
    ///
    /// `records` may hold any years; the exact year is preferred and the
    /// nearest year of the same quarter is used otherwise.
    pub fn estimate(
        &self,
        features: &WindowFeatures,
        records: &[HistoricalRecord],
        quarter: Quarter,
        year: i32,
    ) -> EngineResult<YieldEstimate> {
        let (baseline, is_exact) = resolve_baseline(records, quarter, year)
            .ok_or(EngineError::MissingBaseline { quarter })?;

        let adjustment_factor = self.adjustment_factor(features, &baseline.weather);
        let predicted_yield = baseline.yield_t_per_ha * adjustment_factor;
        let confidence_level = self.confidence(features, baseline.sample_size, is_exact);

        Ok(YieldEstimate {
            predicted_yield,
            adjustment_factor,
            confidence_level,
            baseline_year: baseline.year,
            is_estimate: !is_exact,
            comparison: self.compare(predicted_yield, baseline.yield_t_per_ha),
        })
    }

    /// Historical-only estimate: the baseline's own weather with no live days
    pub fn estimate_historical(
        &self,
        records: &[HistoricalRecord],
        quarter: Quarter,
        year: i32,
    ) -> EngineResult<YieldEstimate> {
        let (baseline, _) = resolve_baseline(records, quarter, year)
            .ok_or(EngineError::MissingBaseline { quarter })?;
        let features = historical_features(&baseline.weather);
        self.estimate(&features, records, quarter, year)
    }

    /// Multiplier on the baseline yield, within `[min_factor, max_factor]`
    pub fn adjustment_factor(&self, features: &WindowFeatures, baseline: &HistoricalWeather) -> f64 {
        let c = &self.coefficients;

        let adjustment = c.temperature
            * deviation(features.mean_temperature_c, baseline.mean_temperature_c, c.temperature_scale_c)
            + c.precipitation
                * deviation(
                    features.total_precipitation_mm,
                    baseline.weekly_precipitation_mm,
                    c.precipitation_scale_mm,
                )
            + c.humidity
                * deviation(
                    features.mean_humidity_percent,
                    baseline.mean_humidity_percent,
                    c.humidity_scale_percent,
                )
            + c.wind * deviation(features.mean_wind_mps, baseline.mean_wind_mps, c.wind_scale_mps);

        (1.0 + adjustment).clamp(c.min_factor, c.max_factor)
    }

    /// Confidence in `[0, 1]`: coverage × sample size × window variance × fallback
    pub fn confidence(&self, features: &WindowFeatures, sample_size: u32, exact_year: bool) -> f64 {
        let c = &self.coefficients;

        let present_fraction = if features.days_expected == 0 {
            0.0
        } else {
            (features.days_present as f64 / features.days_expected as f64).clamp(0.0, 1.0)
        };
        let coverage = c.coverage_floor + (1.0 - c.coverage_floor) * present_fraction;

        let sample = if c.full_confidence_sample == 0 {
            1.0
        } else {
            (sample_size as f64 / c.full_confidence_sample as f64).clamp(c.sample_floor, 1.0)
        };

        let stability = (features.stability_score / 100.0).clamp(0.0, 1.0);
        let variance = c.variance_floor + (1.0 - c.variance_floor) * stability;

        let fallback = if exact_year { 1.0 } else { c.fallback_penalty };

        (coverage * sample * variance * fallback).clamp(0.0, 1.0)
    }

    /// Percent change against the historical yield with its trend label
    pub fn compare(&self, predicted_yield: f64, historical_yield: f64) -> HistoricalComparison {
        let delta_percent = if historical_yield.abs() < f64::EPSILON {
            0.0
        } else {
            (predicted_yield - historical_yield) / historical_yield * 100.0
        };

        let threshold = self.coefficients.trend_threshold_percent;
        let trend = if delta_percent > threshold {
            YieldTrend::Improving
        } else if delta_percent < -threshold {
            YieldTrend::Declining
        } else {
            YieldTrend::Stable
        };

        HistoricalComparison {
            historical_yield,
            delta_percent,
            trend,
        }
    }
}

/// Pick the record for `quarter` closest to `year`.
///
/// Returns the record and whether it matched the year exactly. Equally
/// distant years resolve to the earlier one.
pub fn resolve_baseline(
    records: &[HistoricalRecord],
    quarter: Quarter,
    year: i32,
) -> Option<(&HistoricalRecord, bool)> {
    records
        .iter()
        .filter(|r| r.quarter == quarter)
        .min_by_key(|r| ((r.year - year).abs(), r.year))
        .map(|r| (r, r.year == year))
}

/// Forecast days delivered against days requested inside one quarter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HorizonCoverage {
    pub days_present: u32,
    pub days_expected: u32,
}

impl HorizonCoverage {
    /// Count the days of `quarter` that `horizon` asked for and how many of
    /// them the forecast actually holds
    pub fn measure(forecast: &[WeatherDayPoint], horizon: &DateRange, quarter: &DateRange) -> Self {
        let Some(span) = horizon.overlap(quarter) else {
            return Self::default();
        };

        let days_expected = u32::try_from(span.len_days()).unwrap_or(u32::MAX);
        let delivered = forecast.iter().filter(|d| span.contains(d.date)).count();
        let days_present = u32::try_from(delivered).unwrap_or(u32::MAX).min(days_expected);

        Self {
            days_present,
            days_expected,
        }
    }
}

/// Aggregate a scored window into estimator features.
///
/// Weather comes from the window's own days; `coverage` describes how much
/// of the requested forecast for the quarter arrived.
pub fn window_features(window: &CandidateWindow, coverage: HorizonCoverage) -> WindowFeatures {
    let days = &window.days;
    WindowFeatures {
        mean_temperature_c: mean(days.iter().map(|d| d.temperature_c)),
        total_precipitation_mm: days.iter().map(|d| d.precipitation_mm).sum(),
        mean_humidity_percent: mean(days.iter().map(|d| d.humidity_percent)),
        mean_wind_mps: mean(days.iter().map(|d| d.wind_mps)),
        stability_score: window.stability_score,
        days_present: coverage.days_present,
        days_expected: coverage.days_expected,
    }
}

/// Features that reproduce the baseline weather with no forecast days behind them
pub fn historical_features(weather: &HistoricalWeather) -> WindowFeatures {
    WindowFeatures {
        mean_temperature_c: weather.mean_temperature_c,
        total_precipitation_mm: weather.weekly_precipitation_mm,
        mean_humidity_percent: weather.mean_humidity_percent,
        mean_wind_mps: weather.mean_wind_mps,
        stability_score: UNKNOWN_STABILITY,
        days_present: 0,
        days_expected: WINDOW_DAYS as u32,
    }
}

fn deviation(value: f64, baseline: f64, scale: f64) -> f64 {
    if scale <= 0.0 {
        return 0.0;
    }
    ((value - baseline) / scale).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn baseline_weather() -> HistoricalWeather {
        HistoricalWeather {
            mean_temperature_c: 28.0,
            weekly_precipitation_mm: 40.0,
            mean_humidity_percent: 75.0,
            mean_wind_mps: 4.0,
        }
    }

    fn record(quarter: Quarter, year: i32, yield_t_per_ha: f64, sample_size: u32) -> HistoricalRecord {
        HistoricalRecord {
            quarter,
            year,
            yield_t_per_ha,
            sample_size,
            weather: baseline_weather(),
        }
    }

    fn features_like_baseline() -> WindowFeatures {
        WindowFeatures {
            mean_temperature_c: 28.0,
            total_precipitation_mm: 40.0,
            mean_humidity_percent: 75.0,
            mean_wind_mps: 4.0,
            stability_score: 100.0,
            days_present: 7,
            days_expected: 7,
        }
    }

    #[test]
    fn test_baseline_weather_keeps_baseline_yield() {
        let estimator = YieldEstimator::new();
        let records = vec![record(Quarter::Q2, 2025, 4.2, 10)];

        let estimate = estimator
            .estimate(&features_like_baseline(), &records, Quarter::Q2, 2025)
            .unwrap();

        assert_eq!(estimate.adjustment_factor, 1.0);
        assert_eq!(estimate.predicted_yield, 4.2);
        assert_eq!(estimate.confidence_level, 1.0);
        assert!(!estimate.is_estimate);
        assert_eq!(estimate.comparison.trend, YieldTrend::Stable);
    }

    #[test]
    fn test_windy_hot_window_lowers_yield() {
        let estimator = YieldEstimator::new();
        let records = vec![record(Quarter::Q2, 2025, 4.0, 10)];
        let features = WindowFeatures {
            mean_temperature_c: 33.0,
            mean_wind_mps: 9.0,
            ..features_like_baseline()
        };

        let estimate = estimator.estimate(&features, &records, Quarter::Q2, 2025).unwrap();
        // -0.10 (temp) - 0.08 (wind)
        assert!((estimate.adjustment_factor - 0.82).abs() < 1e-9);
        assert_eq!(estimate.comparison.trend, YieldTrend::Declining);
    }

    #[test]
    fn test_adjustment_factor_is_bounded() {
        let estimator = YieldEstimator::with_coefficients(YieldCoefficients {
            precipitation: 2.0,
            ..YieldCoefficients::default()
        });
        let features = WindowFeatures {
            total_precipitation_mm: 500.0,
            ..features_like_baseline()
        };
        assert_eq!(estimator.adjustment_factor(&features, &baseline_weather()), 1.5);
    }

    #[test]
    fn test_nearest_year_fallback_is_flagged() {
        let estimator = YieldEstimator::new();
        let records = vec![
            record(Quarter::Q2, 2019, 3.0, 10),
            record(Quarter::Q2, 2022, 4.0, 10),
            record(Quarter::Q3, 2025, 9.0, 10),
        ];

        let estimate = estimator
            .estimate(&features_like_baseline(), &records, Quarter::Q2, 2025)
            .unwrap();

        assert_eq!(estimate.baseline_year, 2022);
        assert!(estimate.is_estimate);
        assert_eq!(estimate.predicted_yield, 4.0);
        assert!((estimate.confidence_level - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_tie_prefers_earlier_year() {
        let records = vec![
            record(Quarter::Q1, 2026, 5.0, 10),
            record(Quarter::Q1, 2024, 4.0, 10),
        ];
        let (found, exact) = resolve_baseline(&records, Quarter::Q1, 2025).unwrap();
        assert_eq!(found.year, 2024);
        assert!(!exact);
    }

    #[test]
    fn test_missing_baseline_is_an_error() {
        let estimator = YieldEstimator::new();
        let records = vec![record(Quarter::Q1, 2025, 4.0, 10)];

        let err = estimator
            .estimate(&features_like_baseline(), &records, Quarter::Q3, 2025)
            .unwrap_err();
        assert_eq!(err, EngineError::MissingBaseline { quarter: Quarter::Q3 });
    }

    #[test]
    fn test_small_sample_caps_confidence() {
        let estimator = YieldEstimator::new();
        let full = estimator.confidence(&features_like_baseline(), 10, true);
        let thin = estimator.confidence(&features_like_baseline(), 3, true);
        let none = estimator.confidence(&features_like_baseline(), 0, true);

        assert_eq!(full, 1.0);
        assert!((thin - 0.3).abs() < 1e-9);
        assert!((none - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_historical_only_estimate() {
        let estimator = YieldEstimator::new();
        let records = vec![record(Quarter::Q4, 2025, 3.6, 10)];

        let estimate = estimator.estimate_historical(&records, Quarter::Q4, 2025).unwrap();
        assert_eq!(estimate.predicted_yield, 3.6);
        // coverage floor 0.25, stability 50 -> 0.65
        assert!((estimate.confidence_level - 0.25 * 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_horizon_coverage_counts_delivered_days() {
        let june = |d: u32| WeatherDayPoint {
            date: NaiveDate::from_ymd_opt(2025, 6, d).unwrap(),
            temperature_c: 28.0,
            humidity_percent: 80.0,
            precipitation_mm: 5.0,
            wind_mps: 3.0,
        };
        let horizon = DateRange::following(NaiveDate::from_ymd_opt(2025, 6, 25).unwrap(), 16);
        let forecast: Vec<WeatherDayPoint> = [25, 26, 28, 30].into_iter().map(june).collect();

        let q2 = Quarter::Q2.date_range(2025).unwrap();
        let q3 = Quarter::Q3.date_range(2025).unwrap();
        let q4 = Quarter::Q4.date_range(2025).unwrap();

        assert_eq!(
            HorizonCoverage::measure(&forecast, &horizon, &q2),
            HorizonCoverage { days_present: 4, days_expected: 6 }
        );
        assert_eq!(
            HorizonCoverage::measure(&forecast, &horizon, &q3),
            HorizonCoverage { days_present: 0, days_expected: 10 }
        );
        assert_eq!(HorizonCoverage::measure(&forecast, &horizon, &q4), HorizonCoverage::default());
    }

    #[test]
    fn test_trend_thresholds() {
        let estimator = YieldEstimator::new();
        assert_eq!(estimator.compare(4.3, 4.0).trend, YieldTrend::Improving);
        assert_eq!(estimator.compare(4.1, 4.0).trend, YieldTrend::Stable);
        assert_eq!(estimator.compare(3.9, 4.0).trend, YieldTrend::Stable);
        assert_eq!(estimator.compare(3.7, 4.0).trend, YieldTrend::Declining);
        assert_eq!(estimator.compare(1.0, 0.0).delta_percent, 0.0);
    }
}
