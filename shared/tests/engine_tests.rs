//! Planting and crop-tracking engine tests
//!
//! Covers:
//! - Growth stage timeline and farmer boundary behaviour
//! - Planting window shape and ordering
//! - Yield confidence monotonicity
//! - Quarter ranking without live forecast coverage
//! - The Manila planting scenario
//! - Lossless analysis serialization

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use shared::engine::growth_stage::{DEFAULT_CYCLE_DAYS, DEFAULT_STAGE_BANDS};
use shared::{
    CoverageStatus, DateRange, EstimateBasis, GrowthStage, GrowthStageEngine, HistoricalBaselines,
    HistoricalRecord, HistoricalWeather, Location, PlantingRequest, PlantingWindowSelector,
    Quarter, QuarterSelector, StageBoundary, WeatherDayPoint, WindowFeatures, YieldEstimator,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn manila_request(quarter: Quarter) -> PlantingRequest {
    PlantingRequest {
        location: Location {
            latitude: 14.5995,
            longitude: 120.9842,
            name: "Manila".to_string(),
        },
        year: 2025,
        quarter,
    }
}

/// The 16 days a forecast starting on `start` was requested for
fn requested_horizon(start: NaiveDate) -> DateRange {
    DateRange::following(start, 16)
}

fn baseline(quarter: Quarter, year: i32, yield_t_per_ha: f64) -> HistoricalRecord {
    HistoricalRecord {
        quarter,
        year,
        yield_t_per_ha,
        sample_size: 12,
        weather: HistoricalWeather {
            mean_temperature_c: 28.5,
            weekly_precipitation_mm: 55.0,
            mean_humidity_percent: 80.0,
            mean_wind_mps: 3.5,
        },
    }
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[cfg(test)]
mod scenario_tests {
    use super::*;

    /// 16 days from 2025-04-01; days 8-14 calm with moderate rain, the rest stormy
    fn manila_forecast() -> Vec<WeatherDayPoint> {
        (0..16)
            .map(|i| {
                let day = i + 1;
                let date = date(2025, 4, 1) + Duration::days(i);
                if (8..=14).contains(&day) {
                    WeatherDayPoint {
                        date,
                        temperature_c: 28.0,
                        humidity_percent: 80.0,
                        precipitation_mm: 8.0,
                        wind_mps: 2.5,
                    }
                } else {
                    WeatherDayPoint {
                        date,
                        temperature_c: if day % 2 == 0 { 24.0 } else { 31.0 },
                        humidity_percent: 92.0,
                        precipitation_mm: 45.0,
                        wind_mps: if day % 2 == 0 { 12.0 } else { 17.0 },
                    }
                }
            })
            .collect()
    }

    #[test]
    fn test_manila_calm_stretch_is_best_window() {
        let forecast = manila_forecast();
        let baselines = HistoricalBaselines::new(
            Quarter::ALL
                .iter()
                .map(|q| baseline(*q, 2025, 4.0))
                .collect(),
        );

        let recommendation = QuarterSelector::default()
            .recommend(
                &manila_request(Quarter::Q2),
                &forecast,
                &requested_horizon(date(2025, 4, 1)),
                &baselines,
            )
            .unwrap();

        let selection = &recommendation.selection;
        assert_eq!(selection.status, CoverageStatus::Ranked);
        assert_eq!(selection.windows.len(), 10);

        let best = selection.best_window.as_ref().unwrap();
        assert_eq!(best.start_date, date(2025, 4, 8));
        assert_eq!(best.end_date, date(2025, 4, 14));
        assert!(best.risk_flags.is_empty());

        let stormy = selection
            .windows
            .iter()
            .find(|w| w.start_date == date(2025, 4, 1))
            .unwrap();
        assert!(best.weather_score > stormy.weather_score);
        assert!(!stormy.risk_flags.is_empty());

        let q2 = recommendation.ranking.summary(Quarter::Q2).unwrap();
        assert_eq!(q2.basis, EstimateBasis::LiveForecast);
    }

    #[test]
    fn test_manila_saved_analysis_round_trips() {
        let forecast = manila_forecast();
        let baselines = HistoricalBaselines::new(vec![
            baseline(Quarter::Q1, 2023, 3.9),
            baseline(Quarter::Q2, 2024, 4.4),
            baseline(Quarter::Q3, 2025, 4.1),
        ]);

        let recommendation = QuarterSelector::default()
            .recommend(
                &manila_request(Quarter::Q2),
                &forecast,
                &requested_horizon(date(2025, 4, 1)),
                &baselines,
            )
            .unwrap();
        let analysis = recommendation.to_analysis();

        let json = serde_json::to_string(&analysis).unwrap();
        let restored: shared::PlantingAnalysis = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, analysis);
        assert_eq!(restored.selected_quarter, Quarter::Q2);
        assert_eq!(restored.best_window, analysis.best_window);
        assert_eq!(restored.confidence_level, analysis.confidence_level);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn day_strategy() -> impl Strategy<Value = (f64, f64, f64, f64)> {
        (
            10.0f64..40.0,  // temperature
            40.0f64..100.0, // humidity
            0.0f64..80.0,   // precipitation
            0.0f64..25.0,   // wind
        )
    }

    fn forecast_strategy() -> impl Strategy<Value = Vec<WeatherDayPoint>> {
        (0i64..365, prop::collection::vec(day_strategy(), 0..24)).prop_map(|(offset, days)| {
            let start = date(2025, 1, 1) + Duration::days(offset);
            days.into_iter()
                .enumerate()
                .map(|(i, (t, h, p, w))| WeatherDayPoint {
                    date: start + Duration::days(i as i64),
                    temperature_c: t,
                    humidity_percent: h,
                    precipitation_mm: p,
                    wind_mps: w,
                })
                .collect()
        })
    }

    fn quarter_strategy() -> impl Strategy<Value = Quarter> {
        prop::sample::select(Quarter::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Every day before the cycle end lands in exactly one band
        #[test]
        fn prop_timeline_single_band(das in 0i64..DEFAULT_CYCLE_DAYS) {
            let status = GrowthStageEngine::compute(das, &[], date(2025, 1, 1));

            let matching: Vec<_> = DEFAULT_STAGE_BANDS
                .iter()
                .filter(|(_, start, end)| das >= *start && das <= *end)
                .collect();
            prop_assert_eq!(matching.len(), 1);
            prop_assert_eq!(matching[0].0, status.stage);
            prop_assert!(status.progress_percent >= 0.0 && status.progress_percent <= 100.0);
            prop_assert_eq!(status.next_in_days, matching[0].2 - das + 1);
        }

        /// At or past the cycle end the crop is mature
        #[test]
        fn prop_timeline_clamps_to_maturity(das in DEFAULT_CYCLE_DAYS..5000) {
            let status = GrowthStageEngine::compute(das, &[], date(2025, 1, 1));
            prop_assert_eq!(status.stage, GrowthStage::Maturity);
            prop_assert_eq!(status.progress_percent, 100.0);
            prop_assert_eq!(status.next_in_days, 0);
        }

        /// Contiguous boundaries report the first stage and its span on day one
        #[test]
        fn prop_contiguous_boundaries_first_day(
            offset in 0i64..3000,
            spans in prop::collection::vec(1i64..40, 1..=9)
        ) {
            let mut start = date(2020, 1, 1) + Duration::days(offset);
            let boundaries: Vec<StageBoundary> = spans
                .iter()
                .zip(GrowthStage::ALL.iter())
                .map(|(span, stage)| {
                    let end = start + Duration::days(span - 1);
                    let boundary = StageBoundary::new(*stage, start, end);
                    start = end + Duration::days(1);
                    boundary
                })
                .collect();
            prop_assert!(shared::validate_boundaries(&boundaries).is_ok());

            let first = &boundaries[0];
            let status = GrowthStageEngine::compute(0, &boundaries, first.start_date);
            prop_assert_eq!(status.stage, first.stage);
            prop_assert_eq!(status.next_in_days, first.span_days());
            prop_assert!(!status.upcoming);

            for boundary in &boundaries {
                let status = GrowthStageEngine::compute(0, &boundaries, boundary.start_date);
                prop_assert_eq!(status.stage, boundary.stage);
                prop_assert_eq!(status.next_in_days, boundary.span_days());
                prop_assert!(status.progress_percent >= 0.0 && status.progress_percent <= 100.0);
            }
        }

        /// No window has fewer than 7 forecast days, all inside the quarter
        #[test]
        fn prop_windows_have_seven_days(
            forecast in forecast_strategy(),
            quarter in quarter_strategy()
        ) {
            let selection = PlantingWindowSelector::new().select(&forecast, quarter, 2025).unwrap();
            let range = quarter.date_range(2025).unwrap();

            for window in &selection.windows {
                prop_assert_eq!(window.days.len(), 7);
                prop_assert!(window.days.iter().all(|d| range.contains(d.date)));
                prop_assert_eq!((window.end_date - window.start_date).num_days(), 6);
            }
            if selection.windows.is_empty() {
                prop_assert!(selection.best_window.is_none());
            }
        }

        /// Windows are sorted by score, then by start date
        #[test]
        fn prop_windows_ranked(
            forecast in forecast_strategy(),
            quarter in quarter_strategy()
        ) {
            let selection = PlantingWindowSelector::new().select(&forecast, quarter, 2025).unwrap();

            for pair in selection.windows.windows(2) {
                prop_assert!(pair[0].weather_score >= pair[1].weather_score);
                if pair[0].weather_score == pair[1].weather_score {
                    prop_assert!(pair[0].start_date < pair[1].start_date);
                }
            }
        }

        /// Fewer forecast days present never raises confidence
        #[test]
        fn prop_confidence_monotonic_in_coverage(
            stability in 0.0f64..=100.0,
            sample_size in 0u32..30,
            exact in any::<bool>()
        ) {
            let estimator = YieldEstimator::new();
            let mut previous = f64::INFINITY;

            for present in (0..=7u32).rev() {
                let features = WindowFeatures {
                    mean_temperature_c: 28.0,
                    total_precipitation_mm: 40.0,
                    mean_humidity_percent: 78.0,
                    mean_wind_mps: 3.0,
                    stability_score: stability,
                    days_present: present,
                    days_expected: 7,
                };
                let confidence = estimator.confidence(&features, sample_size, exact);
                prop_assert!((0.0..=1.0).contains(&confidence));
                prop_assert!(confidence <= previous);
                previous = confidence;
            }
        }

        /// A live quarter loses confidence for every requested day the forecast lacks
        #[test]
        fn prop_live_confidence_tracks_delivered_days(kept in 7usize..=16) {
            let start = date(2025, 4, 10);
            let forecast: Vec<WeatherDayPoint> = (0..16)
                .map(|i| WeatherDayPoint {
                    date: start + Duration::days(i),
                    temperature_c: 28.0,
                    humidity_percent: 80.0,
                    precipitation_mm: 5.0,
                    wind_mps: 3.0,
                })
                .collect();
            let baselines = HistoricalBaselines::new(
                Quarter::ALL.iter().map(|q| baseline(*q, 2025, 4.0)).collect(),
            );
            let confidence = |days: &[WeatherDayPoint]| {
                let ranking = QuarterSelector::default()
                    .rank(days, &requested_horizon(start), &baselines, 2025)
                    .unwrap();
                let q2 = ranking.summary(Quarter::Q2).unwrap();
                q2.estimate.as_ref().unwrap().confidence_level
            };

            let complete = confidence(forecast.as_slice());
            let partial = confidence(&forecast[..kept]);
            if kept < forecast.len() {
                prop_assert!(partial < complete);
            } else {
                prop_assert_eq!(partial, complete);
            }
        }

        /// A horizon that never reaches the target year ranks purely on history
        #[test]
        fn prop_far_year_is_historical_only(
            offset in 0i64..340,
            yields in prop::collection::vec(2.0f64..7.0, 4)
        ) {
            let start = date(2024, 1, 1) + Duration::days(offset);
            let forecast: Vec<WeatherDayPoint> = (0..16)
                .map(|i| WeatherDayPoint {
                    date: start + Duration::days(i),
                    temperature_c: 28.0,
                    humidity_percent: 80.0,
                    precipitation_mm: 5.0,
                    wind_mps: 3.0,
                })
                .collect();
            let baselines = HistoricalBaselines::new(
                Quarter::ALL
                    .iter()
                    .zip(yields.iter())
                    .map(|(q, y)| baseline(*q, 2026, *y))
                    .collect(),
            );

            let ranking = QuarterSelector::default()
                .rank(&forecast, &requested_horizon(start), &baselines, 2026)
                .unwrap();

            for summary in &ranking.quarters {
                prop_assert_eq!(summary.basis, EstimateBasis::HistoricalOnly);
                prop_assert_eq!(summary.coverage, CoverageStatus::NoForecastCoverage);
                prop_assert!(summary.best_window.is_none());
            }

            let best_yield = yields.iter().cloned().fold(f64::MIN, f64::max);
            let optimal = ranking.summary(ranking.optimal_quarter).unwrap();
            prop_assert_eq!(optimal.estimate.as_ref().unwrap().predicted_yield, best_yield);
        }

        /// Serialized analyses come back bit-for-bit
        #[test]
        fn prop_analysis_json_lossless(forecast in forecast_strategy()) {
            let baselines = HistoricalBaselines::new(
                Quarter::ALL.iter().map(|q| baseline(*q, 2024, 4.2)).collect(),
            );
            let start = forecast.first().map(|d| d.date).unwrap_or(date(2025, 1, 1));
            let quarter = Quarter::of_date(start);

            let recommendation = QuarterSelector::default()
                .recommend(&manila_request(quarter), &forecast, &requested_horizon(start), &baselines)
                .unwrap();
            let analysis = recommendation.to_analysis();

            let json = serde_json::to_string(&analysis).unwrap();
            let restored: shared::PlantingAnalysis = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(restored, analysis);
        }
    }
}
