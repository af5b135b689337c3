//! HTTP handlers for growth cycles and stage tracking

use axum::{extract::State, http::StatusCode};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared::{parse_date, StageBoundary};

use crate::error::AppResult;
use crate::extract::{Json, Path, Query};
use crate::middleware::CurrentUser;
use crate::services::growth::{
    ConfirmHarvestInput, GrowthCycle, GrowthCycleService, ReplaceBoundariesInput, StageReport,
    UpsertCycleInput,
};
use crate::AppState;

/// Record a sowing for a farm
pub async fn upsert_cycle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<UpsertCycleInput>,
) -> AppResult<Json<GrowthCycle>> {
    let service = GrowthCycleService::new(state.db);
    let cycle = service
        .upsert_cycle(current_user.0.user_id, farm_id, input)
        .await?;
    Ok(Json(cycle))
}

pub async fn list_cycles(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let service = GrowthCycleService::new(state.db);
    let cycles = service.list_cycles(current_user.0.user_id, farm_id).await?;
    Ok(Json(json!({ "cycles": cycles })))
}

/// Confirm the harvest date of a cycle
pub async fn confirm_harvest(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(cycle_id): Path<Uuid>,
    Json(input): Json<ConfirmHarvestInput>,
) -> AppResult<Json<GrowthCycle>> {
    let service = GrowthCycleService::new(state.db);
    let cycle = service
        .confirm_harvest(current_user.0.user_id, cycle_id, input)
        .await?;
    Ok(Json(cycle))
}

pub async fn delete_cycle(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(cycle_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = GrowthCycleService::new(state.db);
    service.delete_cycle(current_user.0.user_id, cycle_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace all stage boundaries of a cycle
pub async fn replace_boundaries(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(cycle_id): Path<Uuid>,
    Json(input): Json<ReplaceBoundariesInput>,
) -> AppResult<Json<Vec<StageBoundary>>> {
    let service = GrowthCycleService::new(state.db);
    let boundaries = service
        .replace_boundaries(current_user.0.user_id, cycle_id, input)
        .await?;
    Ok(Json(boundaries))
}

pub async fn list_boundaries(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(cycle_id): Path<Uuid>,
) -> AppResult<Json<Vec<StageBoundary>>> {
    let service = GrowthCycleService::new(state.db);
    let boundaries = service
        .list_boundaries(current_user.0.user_id, cycle_id)
        .await?;
    Ok(Json(boundaries))
}

/// Query parameters for the stage endpoint
#[derive(Debug, Deserialize)]
pub struct StageQuery {
    /// YYYY-MM-DD; today when omitted
    pub as_of: Option<String>,
}

/// Current growth stage of a cycle
pub async fn get_stage(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(cycle_id): Path<Uuid>,
    Query(query): Query<StageQuery>,
) -> AppResult<Json<StageReport>> {
    let as_of = resolve_as_of(query.as_of.as_deref())?;

    let service = GrowthCycleService::new(state.db);
    let report = service
        .stage_status(current_user.0.user_id, cycle_id, as_of)
        .await?;
    Ok(Json(report))
}

fn resolve_as_of(value: Option<&str>) -> AppResult<NaiveDate> {
    match value {
        Some(value) => Ok(parse_date("as_of", value)?),
        None => Ok(Utc::now().date_naive()),
    }
}
