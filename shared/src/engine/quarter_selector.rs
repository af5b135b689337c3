//! Quarter ranking
//!
//! Scores each quarter of the target year from the live forecast where the
//! horizon reaches it and from history alone where it does not, then ranks
//! the quarters by predicted yield.

use std::cmp::Ordering;

use crate::engine::window_selector::PlantingWindowSelector;
use crate::engine::yield_estimator::{window_features, HorizonCoverage, YieldEstimator};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    EstimateBasis, HistoricalRecord, PlantingRecommendation, PlantingRequest, QuarterRanking,
    QuarterSummary, WeatherDayPoint, WindowSelection,
};
use crate::quarter::Quarter;
use crate::types::DateRange;
use crate::validation::validate_planting_request;

/// Historical records collected for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalBaselines {
    records: Vec<HistoricalRecord>,
}

impl HistoricalBaselines {
    pub fn new(records: Vec<HistoricalRecord>) -> Self {
        Self { records }
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = HistoricalRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }
}

/// Ranks the four quarters of a year
#[derive(Debug, Clone, Default)]
pub struct QuarterSelector {
    window_selector: PlantingWindowSelector,
    yield_estimator: YieldEstimator,
}

impl QuarterSelector {
    pub fn new(window_selector: PlantingWindowSelector, yield_estimator: YieldEstimator) -> Self {
        Self {
            window_selector,
            yield_estimator,
        }
    }

    /// Answer a planting request from an already fetched forecast and baselines.
    ///
    /// `horizon` is the span of days the forecast was requested for; days
    /// missing from `forecast` within it lower confidence.
    pub fn recommend(
        &self,
        request: &PlantingRequest,
        forecast: &[WeatherDayPoint],
        horizon: &DateRange,
        baselines: &HistoricalBaselines,
    ) -> EngineResult<PlantingRecommendation> {
        validate_planting_request(request)?;

        let (ranking, mut selections) =
            self.evaluate(forecast, horizon, baselines, request.year)?;

        let position = selections
            .iter()
            .position(|s| s.quarter == request.quarter)
            .ok_or_else(|| EngineError::NotFound(format!("Quarter {}", request.quarter)))?;
        let selection = selections.swap_remove(position);

        Ok(PlantingRecommendation {
            location: request.location.clone(),
            year: request.year,
            requested_quarter: request.quarter,
            coverage_message: selection.status.message().to_string(),
            selection,
            ranking,
        })
    }

    /// Rank all four quarters of `year`
    pub fn rank(
        &self,
        forecast: &[WeatherDayPoint],
        horizon: &DateRange,
        baselines: &HistoricalBaselines,
        year: i32,
    ) -> EngineResult<QuarterRanking> {
        self.evaluate(forecast, horizon, baselines, year)
            .map(|(ranking, _)| ranking)
    }

    fn evaluate(
        &self,
        forecast: &[WeatherDayPoint],
        horizon: &DateRange,
        baselines: &HistoricalBaselines,
        year: i32,
    ) -> EngineResult<(QuarterRanking, Vec<WindowSelection>)> {
        let mut summaries = Vec::with_capacity(Quarter::ALL.len());
        let mut selections = Vec::with_capacity(Quarter::ALL.len());

        for quarter in Quarter::ALL {
            let selection = self.window_selector.select(forecast, quarter, year)?;
            let coverage =
                HorizonCoverage::measure(forecast, horizon, &quarter.date_range(year)?);
            summaries.push(self.summarize(&selection, coverage, baselines, quarter, year)?);
            selections.push(selection);
        }

        summaries.sort_by(rank_order);
        for (index, summary) in summaries.iter_mut().enumerate() {
            summary.rank = index + 1;
        }

        let optimal_quarter = summaries
            .first()
            .filter(|s| s.estimate.is_some())
            .map(|s| s.quarter)
            .ok_or(EngineError::NoBaselines { year })?;

        Ok((
            QuarterRanking {
                year,
                optimal_quarter,
                quarters: summaries,
            },
            selections,
        ))
    }

    fn summarize(
        &self,
        selection: &WindowSelection,
        coverage: HorizonCoverage,
        baselines: &HistoricalBaselines,
        quarter: Quarter,
        year: i32,
    ) -> EngineResult<QuarterSummary> {
        let records = baselines.records();

        let (basis, estimate) = match &selection.best_window {
            Some(window) => (
                EstimateBasis::LiveForecast,
                self.yield_estimator
                    .estimate(&window_features(window, coverage), records, quarter, year),
            ),
            None => (
                EstimateBasis::HistoricalOnly,
                self.yield_estimator.estimate_historical(records, quarter, year),
            ),
        };

        let (basis, estimate) = match estimate {
            Ok(estimate) => (basis, Some(estimate)),
            Err(EngineError::MissingBaseline { .. }) => (EstimateBasis::Unavailable, None),
            Err(other) => return Err(other),
        };

        Ok(QuarterSummary {
            quarter,
            rank: 0,
            basis,
            coverage: selection.status,
            best_window: selection.best_window.clone(),
            windows_evaluated: selection.windows.len(),
            estimate,
        })
    }
}

/// Quarters with an estimate first, then predicted yield, confidence and
/// calendar order
fn rank_order(a: &QuarterSummary, b: &QuarterSummary) -> Ordering {
    match (&a.estimate, &b.estimate) {
        (Some(ea), Some(eb)) => eb
            .predicted_yield
            .total_cmp(&ea.predicted_yield)
            .then_with(|| eb.confidence_level.total_cmp(&ea.confidence_level))
            .then_with(|| a.quarter.cmp(&b.quarter)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.quarter.cmp(&b.quarter),
    }
}
