//! Growth stage engine
//!
//! Maps a sowing date, a reference date and optional farmer-supplied stage
//! boundaries to the crop's current stage. Without boundaries the default
//! 130-day rice timeline is used.

use chrono::NaiveDate;

use crate::error::EngineResult;
use crate::models::{GrowthStage, StageBoundary, StageSource, StageStatus};
use crate::validation::parse_date;

/// Length of the default timeline in days after sowing
pub const DEFAULT_CYCLE_DAYS: i64 = 130;

/// Inclusive days-after-sowing bands of the default timeline
pub const DEFAULT_STAGE_BANDS: [(GrowthStage, i64, i64); 9] = [
    (GrowthStage::Nursery, 0, 20),
    (GrowthStage::Vegetative, 21, 35),
    (GrowthStage::Tillering, 36, 50),
    (GrowthStage::PanicleInitiation, 51, 65),
    (GrowthStage::Booting, 66, 75),
    (GrowthStage::Heading, 76, 85),
    (GrowthStage::Flowering, 86, 95),
    (GrowthStage::GrainFill, 96, 115),
    (GrowthStage::Maturity, 116, 130),
];

/// Stateless stage calculator
pub struct GrowthStageEngine;

impl GrowthStageEngine {
    /// Compute the stage status.
    ///
    /// With an empty `boundaries` slice the default timeline is read at
    /// `days_after_sowing`. Otherwise the boundaries are read at `today` and
    /// must already be sorted and non-overlapping.
    pub fn compute(
        days_after_sowing: i64,
        boundaries: &[StageBoundary],
        today: NaiveDate,
    ) -> StageStatus {
        if boundaries.is_empty() {
            Self::from_timeline(days_after_sowing)
        } else {
            Self::from_boundaries(boundaries, today)
        }
    }

    /// Compute the stage status for a sowing date as seen on `today`
    pub fn compute_on(
        sowing_date: NaiveDate,
        today: NaiveDate,
        boundaries: &[StageBoundary],
    ) -> StageStatus {
        let das = (today - sowing_date).num_days();
        Self::compute(das, boundaries, today)
    }

    /// Same as [`Self::compute_on`] for ISO-8601 date strings
    pub fn compute_for_dates(
        sowing_date: &str,
        today: &str,
        boundaries: &[StageBoundary],
    ) -> EngineResult<StageStatus> {
        let sowing_date = parse_date("sowing_date", sowing_date)?;
        let today = parse_date("today", today)?;
        Ok(Self::compute_on(sowing_date, today, boundaries))
    }

    fn from_timeline(das: i64) -> StageStatus {
        if das < 0 {
            return StageStatus {
                stage: GrowthStage::Nursery,
                next_stage: GrowthStage::Nursery.next(),
                progress_percent: 0.0,
                next_in_days: -das,
                upcoming: true,
                source: StageSource::DefaultTimeline,
            };
        }

        if das >= DEFAULT_CYCLE_DAYS {
            return Self::mature(StageSource::DefaultTimeline);
        }

        let (stage, _, band_end) = DEFAULT_STAGE_BANDS
            .iter()
            .copied()
            .find(|(_, start, end)| das >= *start && das <= *end)
            .unwrap_or((GrowthStage::Maturity, 116, DEFAULT_CYCLE_DAYS));

        let progress = (das as f64 / DEFAULT_CYCLE_DAYS as f64 * 100.0).min(100.0);

        StageStatus {
            stage,
            next_stage: stage.next(),
            progress_percent: progress,
            next_in_days: band_end - das + 1,
            upcoming: false,
            source: StageSource::DefaultTimeline,
        }
    }

    fn from_boundaries(boundaries: &[StageBoundary], today: NaiveDate) -> StageStatus {
        let (first, last) = match (boundaries.first(), boundaries.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Self::from_timeline(0),
        };

        if today > last.end_date {
            return Self::mature(StageSource::FarmerBoundaries);
        }

        let total_span = ((last.end_date - first.start_date).num_days() + 1).max(1);
        let elapsed = (today - first.start_date).num_days();
        let progress = (elapsed as f64 / total_span as f64 * 100.0).clamp(0.0, 100.0);

        for boundary in boundaries {
            if boundary.contains(today) {
                return StageStatus {
                    stage: boundary.stage,
                    next_stage: boundary.stage.next(),
                    progress_percent: progress,
                    next_in_days: (boundary.end_date - today).num_days() + 1,
                    upcoming: false,
                    source: StageSource::FarmerBoundaries,
                };
            }

            if today < boundary.start_date {
                return StageStatus {
                    stage: boundary.stage,
                    next_stage: boundary.stage.next(),
                    progress_percent: progress,
                    next_in_days: (boundary.start_date - today).num_days(),
                    upcoming: true,
                    source: StageSource::FarmerBoundaries,
                };
            }
        }

        // Only reachable with unsorted input
        Self::mature(StageSource::FarmerBoundaries)
    }

    fn mature(source: StageSource) -> StageStatus {
        StageStatus {
            stage: GrowthStage::Maturity,
            next_stage: None,
            progress_percent: 100.0,
            next_in_days: 0,
            upcoming: false,
            source,
        }
    }
}
