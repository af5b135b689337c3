//! Planting recommendation models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::WeatherDayPoint;
use crate::quarter::Quarter;
use crate::types::Location;

/// Request for a planting recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct PlantingRequest {
    #[validate]
    pub location: Location,
    #[validate(range(min = 1900, max = 2200))]
    pub year: i32,
    pub quarter: Quarter,
}

/// A weather risk found on one day of a candidate window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RiskFlag {
    HeavyRain { date: NaiveDate, precipitation_mm: f64 },
    StormWind { date: NaiveDate, wind_mps: f64 },
    TemperatureOutOfRange { date: NaiveDate, temperature_c: f64 },
}

impl RiskFlag {
    pub fn date(&self) -> NaiveDate {
        match self {
            RiskFlag::HeavyRain { date, .. }
            | RiskFlag::StormWind { date, .. }
            | RiskFlag::TemperatureOutOfRange { date, .. } => *date,
        }
    }
}

/// Seven contiguous forecast days scored as a planting window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: Vec<WeatherDayPoint>,
    /// 0-100, higher is calmer
    pub stability_score: f64,
    pub risk_flags: Vec<RiskFlag>,
    /// Ranking metric; negative when risk penalties outweigh stability
    pub weather_score: f64,
}

/// How much of a quarter the forecast horizon reaches
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    /// At least one full window was scored
    Ranked,
    /// The horizon touches the quarter but no 7-day window fits inside it
    InsufficientCoverage,
    /// The horizon does not reach the quarter at all
    NoForecastCoverage,
}

impl CoverageStatus {
    /// Message shown to the farmer for this coverage state
    pub fn message(&self) -> &'static str {
        match self {
            CoverageStatus::Ranked => "Planting windows ranked from the live forecast",
            CoverageStatus::InsufficientCoverage => {
                "The forecast only reaches the edge of this quarter; using historical data"
            }
            CoverageStatus::NoForecastCoverage => {
                "The forecast does not reach that far yet; using historical data"
            }
        }
    }
}

/// Result of scanning one quarter for planting windows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowSelection {
    pub quarter: Quarter,
    pub year: i32,
    pub status: CoverageStatus,
    pub best_window: Option<CandidateWindow>,
    /// Every scored window, best first
    pub windows: Vec<CandidateWindow>,
}

/// Weather aggregated over a window, as fed to the yield estimator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowFeatures {
    pub mean_temperature_c: f64,
    pub total_precipitation_mm: f64,
    pub mean_humidity_percent: f64,
    pub mean_wind_mps: f64,
    pub stability_score: f64,
    pub days_present: u32,
    pub days_expected: u32,
}

/// Qualitative yield direction against history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum YieldTrend {
    Improving,
    Stable,
    Declining,
}

impl std::fmt::Display for YieldTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            YieldTrend::Improving => write!(f, "improving"),
            YieldTrend::Stable => write!(f, "stable"),
            YieldTrend::Declining => write!(f, "declining"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalComparison {
    pub historical_yield: f64,
    pub delta_percent: f64,
    pub trend: YieldTrend,
}

/// Predicted yield for one quarter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YieldEstimate {
    /// Tonnes per hectare
    pub predicted_yield: f64,
    pub adjustment_factor: f64,
    /// 0-1
    pub confidence_level: f64,
    /// Year of the historical record the prediction is anchored on
    pub baseline_year: i32,
    /// True when the baseline came from a different year than requested
    pub is_estimate: bool,
    pub comparison: HistoricalComparison,
}

/// What a quarter's estimate is based on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EstimateBasis {
    LiveForecast,
    HistoricalOnly,
    /// No historical baseline exists for the quarter
    Unavailable,
}

/// Per-quarter line of the quarter ranking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuarterSummary {
    pub quarter: Quarter,
    /// 1 is best
    pub rank: usize,
    pub basis: EstimateBasis,
    pub coverage: CoverageStatus,
    pub best_window: Option<CandidateWindow>,
    pub windows_evaluated: usize,
    pub estimate: Option<YieldEstimate>,
}

/// All four quarters of a year, ranked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuarterRanking {
    pub year: i32,
    pub optimal_quarter: Quarter,
    /// Ordered by rank
    pub quarters: Vec<QuarterSummary>,
}

impl QuarterRanking {
    pub fn summary(&self, quarter: Quarter) -> Option<&QuarterSummary> {
        self.quarters.iter().find(|s| s.quarter == quarter)
    }
}

/// Full answer to a [`PlantingRequest`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantingRecommendation {
    pub location: Location,
    pub year: i32,
    pub requested_quarter: Quarter,
    pub coverage_message: String,
    /// Windows of the requested quarter
    pub selection: WindowSelection,
    pub ranking: QuarterRanking,
}

impl PlantingRecommendation {
    /// Snapshot of this recommendation in the shape that gets saved
    pub fn to_analysis(&self) -> PlantingAnalysis {
        let requested = self.ranking.summary(self.requested_quarter);
        let confidence_level = requested
            .and_then(|s| s.estimate.as_ref())
            .map(|e| e.confidence_level)
            .unwrap_or(0.0);
        let risk_flags = self
            .selection
            .best_window
            .as_ref()
            .map(|w| w.risk_flags.clone())
            .unwrap_or_default();

        PlantingAnalysis {
            location: self.location.clone(),
            year: self.year,
            selected_quarter: self.requested_quarter,
            optimal_quarter: self.ranking.optimal_quarter,
            best_window: self.selection.best_window.clone(),
            windows: self.selection.windows.clone(),
            quarter_summaries: self.ranking.quarters.clone(),
            confidence_level,
            risk_flags,
        }
    }
}

/// A planting analysis as saved by the farmer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct PlantingAnalysis {
    #[validate]
    pub location: Location,
    pub year: i32,
    pub selected_quarter: Quarter,
    pub optimal_quarter: Quarter,
    pub best_window: Option<CandidateWindow>,
    pub windows: Vec<CandidateWindow>,
    pub quarter_summaries: Vec<QuarterSummary>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence_level: f64,
    pub risk_flags: Vec<RiskFlag>,
}
