//! HTTP handlers for planting recommendations and saved analyses

use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared::{PlantingAnalysis, PlantingRecommendation, PlantingRequest};

use crate::error::AppResult;
use crate::extract::{Json, Path};
use crate::middleware::CurrentUser;
use crate::services::planting::{PlantingService, SavedAnalysis};
use crate::AppState;

fn planting_service(state: &AppState) -> PlantingService {
    PlantingService::new(
        state.weather.clone(),
        state.analyses.clone(),
        state.config.weather.horizon_days,
    )
}

/// Rank planting windows and quarters for a location and year
pub async fn create_recommendation(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(request): Json<PlantingRequest>,
) -> AppResult<Json<PlantingRecommendation>> {
    let today = Utc::now().date_naive();
    let recommendation = planting_service(&state).recommend(&request, today).await?;
    Ok(Json(recommendation))
}

/// Save a planting analysis
pub async fn save_analysis(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(analysis): Json<PlantingAnalysis>,
) -> AppResult<(StatusCode, Json<SavedAnalysis>)> {
    let saved = planting_service(&state)
        .save_analysis(current_user.0.user_id, analysis)
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// List the caller's saved analyses
pub async fn list_analyses(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Value>> {
    let analyses = planting_service(&state)
        .list_analyses(current_user.0.user_id)
        .await?;
    Ok(Json(json!({ "analyses": analyses })))
}

pub async fn get_analysis(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(analysis_id): Path<Uuid>,
) -> AppResult<Json<SavedAnalysis>> {
    let analysis = planting_service(&state)
        .get_analysis(current_user.0.user_id, analysis_id)
        .await?;
    Ok(Json(analysis))
}

pub async fn delete_analysis(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(analysis_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    planting_service(&state)
        .delete_analysis(current_user.0.user_id, analysis_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Describe the recommendation request and response
pub async fn get_schema() -> Json<Value> {
    Json(schema_document())
}

fn schema_document() -> Value {
    json!({
        "request": {
            "location": {
                "latitude": "number, -90 to 90",
                "longitude": "number, -180 to 180",
                "name": "string, 1 to 200 characters"
            },
            "year": "integer, 1900 to 2200",
            "quarter": "integer 1-4 (Q1 Jan-Mar, Q2 Apr-Jun, Q3 Jul-Sep, Q4 Oct-Dec)"
        },
        "response": {
            "selection": {
                "status": ["ranked", "insufficient_coverage", "no_forecast_coverage"],
                "best_window": "7-day window with the highest weather_score, or null",
                "windows": "all 7-day windows of the requested quarter, best first"
            },
            "ranking": {
                "optimal_quarter": "quarter with the highest predicted yield",
                "quarters": {
                    "basis": ["live_forecast", "historical_only", "unavailable"],
                    "estimate": "predicted_yield (t/ha), confidence_level (0-1), comparison"
                }
            },
            "coverage_message": "explains when the forecast does not reach the quarter"
        },
        "errors": {
            "INPUT_ERROR": 400,
            "NOT_FOUND": 404,
            "MISSING_BASELINE": 422,
            "PROVIDER_UNAVAILABLE": 503
        }
    })
}
