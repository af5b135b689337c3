//! Growth cycle service: cycles, farmer stage boundaries and stage status

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::{validate_boundaries, GrowthStageEngine, PlantingMethod, StageBoundary, StageStatus};

use crate::error::{AppError, AppResult};

/// Growth cycle service
#[derive(Clone)]
pub struct GrowthCycleService {
    db: PgPool,
}

/// Growth cycle record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GrowthCycle {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub variety: String,
    pub planting_method: String,
    pub cycle_start_date: NaiveDate,
    pub cycle_end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a sowing
#[derive(Debug, Deserialize, Validate)]
pub struct UpsertCycleInput {
    #[validate(length(min = 1, max = 100))]
    pub variety: String,
    pub planting_method: PlantingMethod,
    pub cycle_start_date: NaiveDate,
    pub cycle_end_date: Option<NaiveDate>,
}

/// Input for confirming the harvest date
#[derive(Debug, Deserialize)]
pub struct ConfirmHarvestInput {
    pub harvest_date: NaiveDate,
}

/// Full replacement set of stage boundaries
#[derive(Debug, Deserialize)]
pub struct ReplaceBoundariesInput {
    pub boundaries: Vec<StageBoundary>,
}

/// Stage of a cycle on a reference date
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub cycle_id: Uuid,
    pub sowing_date: NaiveDate,
    pub as_of: NaiveDate,
    pub days_after_sowing: i64,
    #[serde(flatten)]
    pub status: StageStatus,
}

#[derive(Debug, FromRow)]
struct BoundaryRow {
    stage: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    note: Option<String>,
}

impl BoundaryRow {
    fn into_boundary(self) -> AppResult<StageBoundary> {
        let stage = self.stage.parse().map_err(AppError::Internal)?;
        Ok(StageBoundary {
            stage,
            start_date: self.start_date,
            end_date: self.end_date,
            note: self.note,
        })
    }
}

impl GrowthCycleService {
    /// Create a new GrowthCycleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Cycles
    // ========================================================================

    /// Record a sowing; an existing cycle with the same start date is updated
    pub async fn upsert_cycle(
        &self,
        owner_id: Uuid,
        farm_id: Uuid,
        input: UpsertCycleInput,
    ) -> AppResult<GrowthCycle> {
        input.validate()?;
        check_cycle_dates(input.cycle_start_date, input.cycle_end_date)?;
        self.ensure_farm(owner_id, farm_id).await?;

        let cycle = sqlx::query_as::<_, GrowthCycle>(
            r#"
            INSERT INTO growth_cycles (farm_id, variety, planting_method, cycle_start_date, cycle_end_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (farm_id, cycle_start_date) DO UPDATE
            SET variety = EXCLUDED.variety,
                planting_method = EXCLUDED.planting_method,
                cycle_end_date = EXCLUDED.cycle_end_date,
                updated_at = NOW()
            RETURNING id, farm_id, variety, planting_method, cycle_start_date, cycle_end_date,
                      created_at, updated_at
            "#,
        )
        .bind(farm_id)
        .bind(input.variety.trim())
        .bind(input.planting_method.as_str())
        .bind(input.cycle_start_date)
        .bind(input.cycle_end_date)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(cycle_id = %cycle.id, %farm_id, "Growth cycle recorded");
        Ok(cycle)
    }

    /// List the cycles of a farm, newest sowing first
    pub async fn list_cycles(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<Vec<GrowthCycle>> {
        self.ensure_farm(owner_id, farm_id).await?;

        let cycles = sqlx::query_as::<_, GrowthCycle>(
            r#"
            SELECT id, farm_id, variety, planting_method, cycle_start_date, cycle_end_date,
                   created_at, updated_at
            FROM growth_cycles
            WHERE farm_id = $1
            ORDER BY cycle_start_date DESC
            "#,
        )
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        Ok(cycles)
    }

    /// Get a cycle owned by the user
    pub async fn get_cycle(&self, owner_id: Uuid, cycle_id: Uuid) -> AppResult<GrowthCycle> {
        sqlx::query_as::<_, GrowthCycle>(
            r#"
            SELECT gc.id, gc.farm_id, gc.variety, gc.planting_method, gc.cycle_start_date,
                   gc.cycle_end_date, gc.created_at, gc.updated_at
            FROM growth_cycles gc
            JOIN farms f ON f.id = gc.farm_id
            WHERE gc.id = $1 AND f.owner_id = $2
            "#,
        )
        .bind(cycle_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Growth cycle".to_string()))
    }

    /// Set the confirmed harvest date
    pub async fn confirm_harvest(
        &self,
        owner_id: Uuid,
        cycle_id: Uuid,
        input: ConfirmHarvestInput,
    ) -> AppResult<GrowthCycle> {
        let cycle = self.get_cycle(owner_id, cycle_id).await?;
        check_cycle_dates(cycle.cycle_start_date, Some(input.harvest_date))?;

        let cycle = sqlx::query_as::<_, GrowthCycle>(
            r#"
            UPDATE growth_cycles
            SET cycle_end_date = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, farm_id, variety, planting_method, cycle_start_date, cycle_end_date,
                      created_at, updated_at
            "#,
        )
        .bind(cycle.id)
        .bind(input.harvest_date)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(cycle_id = %cycle.id, harvest_date = %input.harvest_date, "Harvest confirmed");
        Ok(cycle)
    }

    /// Delete a cycle; its stage boundaries go with it
    pub async fn delete_cycle(&self, owner_id: Uuid, cycle_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM growth_cycles gc
            USING farms f
            WHERE gc.farm_id = f.id AND gc.id = $1 AND f.owner_id = $2
            "#,
        )
        .bind(cycle_id)
        .bind(owner_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Growth cycle".to_string()));
        }

        tracing::info!(%cycle_id, "Growth cycle deleted");
        Ok(())
    }

    // ========================================================================
    // Stage boundaries
    // ========================================================================

    /// Replace every stage boundary of a cycle in one transaction
    pub async fn replace_boundaries(
        &self,
        owner_id: Uuid,
        cycle_id: Uuid,
        input: ReplaceBoundariesInput,
    ) -> AppResult<Vec<StageBoundary>> {
        let boundaries = prepare_boundaries(input.boundaries)?;

        let mut tx = self.db.begin().await?;

        let owned: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT gc.id
            FROM growth_cycles gc
            JOIN farms f ON f.id = gc.farm_id
            WHERE gc.id = $1 AND f.owner_id = $2
            FOR UPDATE OF gc
            "#,
        )
        .bind(cycle_id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?;

        if owned.is_none() {
            return Err(AppError::NotFound("Growth cycle".to_string()));
        }

        sqlx::query("DELETE FROM stage_boundaries WHERE cycle_id = $1")
            .bind(cycle_id)
            .execute(&mut *tx)
            .await?;

        for boundary in &boundaries {
            sqlx::query(
                r#"
                INSERT INTO stage_boundaries (cycle_id, stage, start_date, end_date, note)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(cycle_id)
            .bind(boundary.stage.as_str())
            .bind(boundary.start_date)
            .bind(boundary.end_date)
            .bind(&boundary.note)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(%cycle_id, count = boundaries.len(), "Stage boundaries replaced");
        Ok(boundaries)
    }

    /// List a cycle's boundaries in stage order
    pub async fn list_boundaries(
        &self,
        owner_id: Uuid,
        cycle_id: Uuid,
    ) -> AppResult<Vec<StageBoundary>> {
        self.get_cycle(owner_id, cycle_id).await?;
        self.load_boundaries(cycle_id).await
    }

    /// Stage of a cycle as seen on `as_of`
    pub async fn stage_status(
        &self,
        owner_id: Uuid,
        cycle_id: Uuid,
        as_of: NaiveDate,
    ) -> AppResult<StageReport> {
        let cycle = self.get_cycle(owner_id, cycle_id).await?;
        let boundaries = self.load_boundaries(cycle_id).await?;

        let status = GrowthStageEngine::compute_on(cycle.cycle_start_date, as_of, &boundaries);
        tracing::debug!(
            %cycle_id,
            %as_of,
            stage = %status.stage,
            source = ?status.source,
            "Stage computed"
        );

        Ok(StageReport {
            cycle_id,
            sowing_date: cycle.cycle_start_date,
            as_of,
            days_after_sowing: (as_of - cycle.cycle_start_date).num_days(),
            status,
        })
    }

    async fn load_boundaries(&self, cycle_id: Uuid) -> AppResult<Vec<StageBoundary>> {
        let rows = sqlx::query_as::<_, BoundaryRow>(
            r#"
            SELECT stage, start_date, end_date, note
            FROM stage_boundaries
            WHERE cycle_id = $1
            ORDER BY start_date
            "#,
        )
        .bind(cycle_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(BoundaryRow::into_boundary).collect()
    }

    async fn ensure_farm(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<()> {
        let farm: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM farms WHERE id = $1 AND owner_id = $2")
                .bind(farm_id)
                .bind(owner_id)
                .fetch_optional(&self.db)
                .await?;

        farm.map(|_| ()).ok_or_else(|| AppError::NotFound("Farm".to_string()))
    }
}

/// Order boundaries by date, tidy notes and reject invalid sets
pub fn prepare_boundaries(mut boundaries: Vec<StageBoundary>) -> AppResult<Vec<StageBoundary>> {
    boundaries.sort_by_key(|b| b.start_date);
    for boundary in &mut boundaries {
        boundary.note = boundary
            .note
            .take()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
    }

    validate_boundaries(&boundaries)?;
    Ok(boundaries)
}

fn check_cycle_dates(start: NaiveDate, end: Option<NaiveDate>) -> AppResult<()> {
    match end {
        Some(end) if end < start => Err(AppError::input(
            "cycle_end_date",
            format!("Harvest date {} is before sowing date {}", end, start),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::GrowthStage;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_prepare_sorts_by_date() {
        let boundaries = vec![
            StageBoundary::new(GrowthStage::Tillering, date(2025, 7, 11), date(2025, 7, 25)),
            StageBoundary::new(GrowthStage::Nursery, date(2025, 6, 1), date(2025, 6, 20)),
            StageBoundary::new(GrowthStage::Vegetative, date(2025, 6, 21), date(2025, 7, 10)),
        ];

        let prepared = prepare_boundaries(boundaries).unwrap();
        let stages: Vec<_> = prepared.iter().map(|b| b.stage).collect();
        assert_eq!(
            stages,
            vec![GrowthStage::Nursery, GrowthStage::Vegetative, GrowthStage::Tillering]
        );
    }

    #[test]
    fn test_prepare_rejects_empty_set() {
        let err = prepare_boundaries(vec![]).unwrap_err();
        assert!(matches!(err, AppError::Input { ref field, .. } if field == "boundaries"));
    }

    #[test]
    fn test_prepare_rejects_overlap() {
        let boundaries = vec![
            StageBoundary::new(GrowthStage::Nursery, date(2025, 6, 1), date(2025, 6, 20)),
            StageBoundary::new(GrowthStage::Vegetative, date(2025, 6, 20), date(2025, 7, 10)),
        ];
        assert!(matches!(prepare_boundaries(boundaries), Err(AppError::Input { .. })));
    }

    #[test]
    fn test_prepare_rejects_stage_out_of_order() {
        let boundaries = vec![
            StageBoundary::new(GrowthStage::Heading, date(2025, 6, 1), date(2025, 6, 20)),
            StageBoundary::new(GrowthStage::Booting, date(2025, 6, 21), date(2025, 7, 10)),
        ];
        assert!(matches!(prepare_boundaries(boundaries), Err(AppError::Input { .. })));
    }

    #[test]
    fn test_prepare_drops_blank_notes() {
        let mut boundary = StageBoundary::new(GrowthStage::Nursery, date(2025, 6, 1), date(2025, 6, 20));
        boundary.note = Some("   ".to_string());
        let prepared = prepare_boundaries(vec![boundary]).unwrap();
        assert_eq!(prepared[0].note, None);
    }

    #[test]
    fn test_harvest_before_sowing_is_rejected() {
        assert!(check_cycle_dates(date(2025, 6, 1), Some(date(2025, 5, 31))).is_err());
        assert!(check_cycle_dates(date(2025, 6, 1), Some(date(2025, 6, 1))).is_ok());
        assert!(check_cycle_dates(date(2025, 6, 1), None).is_ok());
    }

    #[test]
    fn test_boundary_row_parses_stage() {
        let row = BoundaryRow {
            stage: "panicle_initiation".to_string(),
            start_date: date(2025, 7, 20),
            end_date: date(2025, 8, 3),
            note: None,
        };
        assert_eq!(row.into_boundary().unwrap().stage, GrowthStage::PanicleInitiation);

        let bad = BoundaryRow {
            stage: "ripening".to_string(),
            start_date: date(2025, 7, 20),
            end_date: date(2025, 8, 3),
            note: None,
        };
        assert!(matches!(bad.into_boundary(), Err(AppError::Internal(_))));
    }
}
