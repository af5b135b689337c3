//! WebAssembly module for the Rice Planting Advisor
//!
//! Provides offline client-side computation for:
//! - Growth stage tracking from a sowing date and farmer boundaries
//! - Planting window scoring over a downloaded forecast
//! - Yield trend labels

use wasm_bindgen::prelude::*;

use shared::{
    parse_date, validate_boundaries, GrowthStageEngine, PlantingWindowSelector, Quarter,
    StageBoundary, WeatherDayPoint, YieldEstimator,
};

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

/// Current growth stage as JSON.
///
/// `boundaries_json` is a JSON array of stage boundaries; pass an empty
/// string or `[]` to use the default timeline.
#[wasm_bindgen]
pub fn compute_growth_stage(
    sowing_date: &str,
    as_of: &str,
    boundaries_json: &str,
) -> Result<String, JsValue> {
    growth_stage_json(sowing_date, as_of, boundaries_json).map_err(|e| JsValue::from_str(&e))
}

/// Default-timeline stage name for a days-after-sowing count
#[wasm_bindgen]
pub fn stage_for_days_after_sowing(days_after_sowing: i32) -> String {
    let status = GrowthStageEngine::compute(
        i64::from(days_after_sowing),
        &[],
        chrono::NaiveDate::MIN,
    );
    status.stage.as_str().to_string()
}

/// Ranked 7-day windows of one quarter as JSON
#[wasm_bindgen]
pub fn rank_planting_windows(forecast_json: &str, quarter: u8, year: i32) -> Result<String, JsValue> {
    windows_json(forecast_json, quarter, year).map_err(|e| JsValue::from_str(&e))
}

/// Quarter number (1-4) of an ISO date
#[wasm_bindgen]
pub fn quarter_of_date(date: &str) -> Result<u8, JsValue> {
    parse_date("date", date)
        .map(|d| Quarter::of_date(d).number())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// "improving", "stable" or "declining"
#[wasm_bindgen]
pub fn yield_trend(predicted_yield: f64, historical_yield: f64) -> String {
    YieldEstimator::new()
        .compare(predicted_yield, historical_yield)
        .trend
        .to_string()
}

fn growth_stage_json(sowing_date: &str, as_of: &str, boundaries_json: &str) -> Result<String, String> {
    let mut boundaries: Vec<StageBoundary> = if boundaries_json.trim().is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(boundaries_json)
            .map_err(|e| format!("Invalid boundaries JSON: {}", e))?
    };

    if !boundaries.is_empty() {
        boundaries.sort_by_key(|b| b.start_date);
        validate_boundaries(&boundaries).map_err(|e| e.to_string())?;
    }

    let status = GrowthStageEngine::compute_for_dates(sowing_date, as_of, &boundaries)
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&status).map_err(|e| e.to_string())
}

fn windows_json(forecast_json: &str, quarter: u8, year: i32) -> Result<String, String> {
    let quarter = Quarter::try_from(quarter).map_err(|e| e.to_string())?;
    let mut days: Vec<WeatherDayPoint> = serde_json::from_str(forecast_json)
        .map_err(|e| format!("Invalid forecast JSON: {}", e))?;
    days.sort_by_key(|d| d.date);

    let selection = PlantingWindowSelector::new()
        .select(&days, quarter, year)
        .map_err(|e| e.to_string())?;
    serde_json::to_string(&selection).map_err(|e| e.to_string())
}
