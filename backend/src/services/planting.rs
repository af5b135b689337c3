//! Planting recommendation service and saved analyses

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::{
    DateRange, HistoricalBaselines, PlantingAnalysis, PlantingRecommendation, PlantingRequest,
    Quarter, QuarterSelector,
};

use crate::error::{AppError, AppResult};
use crate::external::{WeatherForecastProvider, MAX_FORECAST_DAYS};

/// A planting analysis saved by a user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SavedAnalysis {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub analysis: PlantingAnalysis,
    pub created_at: DateTime<Utc>,
}

/// Persistence for saved analyses, scoped to the owning user
#[axum::async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn create(&self, user_id: Uuid, analysis: &PlantingAnalysis) -> AppResult<Uuid>;

    async fn get(&self, user_id: Uuid, id: Uuid) -> AppResult<SavedAnalysis>;

    /// Newest first
    async fn list(&self, user_id: Uuid) -> AppResult<Vec<SavedAnalysis>>;

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<()>;
}

/// Runs planting recommendations and manages saved analyses
#[derive(Clone)]
pub struct PlantingService {
    provider: Arc<dyn WeatherForecastProvider>,
    analyses: Arc<dyn AnalysisStore>,
    selector: QuarterSelector,
    horizon_days: u32,
}

impl PlantingService {
    /// Create a new PlantingService instance
    pub fn new(
        provider: Arc<dyn WeatherForecastProvider>,
        analyses: Arc<dyn AnalysisStore>,
        horizon_days: u32,
    ) -> Self {
        Self {
            provider,
            analyses,
            selector: QuarterSelector::default(),
            horizon_days: horizon_days.clamp(1, MAX_FORECAST_DAYS),
        }
    }

    /// Rank windows for the requested quarter and all quarters of the year.
    ///
    /// The forecast is fetched once, for `horizon_days` days from `today`,
    /// and shared by every quarter.
    pub async fn recommend(
        &self,
        request: &PlantingRequest,
        today: NaiveDate,
    ) -> AppResult<PlantingRecommendation> {
        request.validate()?;

        let forecast = self
            .provider
            .get_forecast(request.location.coordinates(), self.horizon_days)
            .await
            .map_err(|e| {
                tracing::error!(location = %request.location.name, "Forecast unavailable: {}", e);
                e
            })?;

        let horizon = DateRange::following(today, self.horizon_days);
        if forecast.days.len() < self.horizon_days as usize {
            tracing::warn!(
                location = %request.location.name,
                delivered = forecast.days.len(),
                requested = self.horizon_days,
                "Forecast is missing days"
            );
        }

        let baselines = self.load_baselines(request.year).await?;
        let recommendation = self
            .selector
            .recommend(request, &forecast.days, &horizon, &baselines)?;

        tracing::info!(
            location = %request.location.name,
            year = request.year,
            quarter = %request.quarter,
            optimal = %recommendation.ranking.optimal_quarter,
            windows = recommendation.selection.windows.len(),
            "Planting recommendation computed"
        );

        Ok(recommendation)
    }

    /// Exact-year baseline per quarter, falling back to every year of that quarter
    async fn load_baselines(&self, year: i32) -> AppResult<HistoricalBaselines> {
        let mut baselines = HistoricalBaselines::default();

        for quarter in Quarter::ALL {
            match self.provider.get_historical(quarter, year).await? {
                Some(record) => baselines.extend([record]),
                None => {
                    let records = self.provider.list_historical(quarter).await?;
                    tracing::debug!(
                        %quarter,
                        year,
                        candidates = records.len(),
                        "No exact baseline, using nearest year"
                    );
                    baselines.extend(records);
                }
            }
        }

        Ok(baselines)
    }

    // ========================================================================
    // Saved analyses
    // ========================================================================

    pub async fn save_analysis(
        &self,
        user_id: Uuid,
        analysis: PlantingAnalysis,
    ) -> AppResult<SavedAnalysis> {
        analysis.validate()?;

        let id = self.analyses.create(user_id, &analysis).await?;
        tracing::info!(analysis_id = %id, %user_id, "Planting analysis saved");

        self.analyses.get(user_id, id).await
    }

    pub async fn get_analysis(&self, user_id: Uuid, id: Uuid) -> AppResult<SavedAnalysis> {
        self.analyses.get(user_id, id).await
    }

    pub async fn list_analyses(&self, user_id: Uuid) -> AppResult<Vec<SavedAnalysis>> {
        self.analyses.list(user_id).await
    }

    pub async fn delete_analysis(&self, user_id: Uuid, id: Uuid) -> AppResult<()> {
        self.analyses.delete(user_id, id).await?;
        tracing::info!(analysis_id = %id, %user_id, "Planting analysis deleted");
        Ok(())
    }
}

// ============================================================================
// PostgreSQL store
// ============================================================================

#[derive(Debug, FromRow)]
struct AnalysisRow {
    id: Uuid,
    user_id: Uuid,
    payload: Json<PlantingAnalysis>,
    created_at: DateTime<Utc>,
}

impl From<AnalysisRow> for SavedAnalysis {
    fn from(row: AnalysisRow) -> Self {
        SavedAnalysis {
            id: row.id,
            user_id: row.user_id,
            analysis: row.payload.0,
            created_at: row.created_at,
        }
    }
}

/// Analyses stored as JSONB in `planting_analyses`
#[derive(Clone)]
pub struct PgAnalysisStore {
    db: PgPool,
}

impl PgAnalysisStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[axum::async_trait]
impl AnalysisStore for PgAnalysisStore {
    async fn create(&self, user_id: Uuid, analysis: &PlantingAnalysis) -> AppResult<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO planting_analyses (user_id, location_name, year, selected_quarter, payload)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&analysis.location.name)
        .bind(analysis.year)
        .bind(analysis.selected_quarter.number() as i16)
        .bind(Json(analysis))
        .fetch_one(&self.db)
        .await?;

        Ok(id)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> AppResult<SavedAnalysis> {
        let row = sqlx::query_as::<_, AnalysisRow>(
            r#"
            SELECT id, user_id, payload, created_at
            FROM planting_analyses
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Planting analysis".to_string()))?;

        Ok(row.into())
    }

    async fn list(&self, user_id: Uuid) -> AppResult<Vec<SavedAnalysis>> {
        let rows = sqlx::query_as::<_, AnalysisRow>(
            r#"
            SELECT id, user_id, payload, created_at
            FROM planting_analyses
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(SavedAnalysis::from).collect())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM planting_analyses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Planting analysis".to_string()));
        }

        Ok(())
    }
}
