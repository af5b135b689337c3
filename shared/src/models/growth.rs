//! Crop growth models: phenological stages, farmer overrides and stage status

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Phenological stages of a rice crop, in growth order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    Nursery,
    Vegetative,
    Tillering,
    PanicleInitiation,
    Booting,
    Heading,
    Flowering,
    GrainFill,
    Maturity,
}

impl GrowthStage {
    pub const ALL: [GrowthStage; 9] = [
        GrowthStage::Nursery,
        GrowthStage::Vegetative,
        GrowthStage::Tillering,
        GrowthStage::PanicleInitiation,
        GrowthStage::Booting,
        GrowthStage::Heading,
        GrowthStage::Flowering,
        GrowthStage::GrainFill,
        GrowthStage::Maturity,
    ];

    /// Position in the growth sequence, starting at 0
    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    /// The stage that follows this one, if any
    pub fn next(&self) -> Option<GrowthStage> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    /// Stable identifier used in storage and URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthStage::Nursery => "nursery",
            GrowthStage::Vegetative => "vegetative",
            GrowthStage::Tillering => "tillering",
            GrowthStage::PanicleInitiation => "panicle_initiation",
            GrowthStage::Booting => "booting",
            GrowthStage::Heading => "heading",
            GrowthStage::Flowering => "flowering",
            GrowthStage::GrainFill => "grain_fill",
            GrowthStage::Maturity => "maturity",
        }
    }
}

impl std::str::FromStr for GrowthStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GrowthStage::ALL
            .iter()
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown growth stage: {}", s))
    }
}

impl std::fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrowthStage::Nursery => write!(f, "Nursery"),
            GrowthStage::Vegetative => write!(f, "Vegetative"),
            GrowthStage::Tillering => write!(f, "Tillering"),
            GrowthStage::PanicleInitiation => write!(f, "Panicle Initiation"),
            GrowthStage::Booting => write!(f, "Booting"),
            GrowthStage::Heading => write!(f, "Heading"),
            GrowthStage::Flowering => write!(f, "Flowering"),
            GrowthStage::GrainFill => write!(f, "Grain Fill"),
            GrowthStage::Maturity => write!(f, "Maturity"),
        }
    }
}

/// How the crop was established
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlantingMethod {
    Transplanted,
    DirectSeeded,
}

impl PlantingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlantingMethod::Transplanted => "transplanted",
            PlantingMethod::DirectSeeded => "direct_seeded",
        }
    }
}

impl std::str::FromStr for PlantingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transplanted" => Ok(PlantingMethod::Transplanted),
            "direct_seeded" => Ok(PlantingMethod::DirectSeeded),
            other => Err(format!("Unknown planting method: {}", other)),
        }
    }
}

/// Farmer-supplied date range for one stage of a growth cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageBoundary {
    pub stage: GrowthStage,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StageBoundary {
    pub fn new(stage: GrowthStage, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            stage,
            start_date,
            end_date,
            note: None,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Days covered by the boundary, counting both ends
    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// Where a stage status came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageSource {
    DefaultTimeline,
    FarmerBoundaries,
}

/// Current phenological position of a crop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageStatus {
    pub stage: GrowthStage,
    pub next_stage: Option<GrowthStage>,
    /// Share of the whole cycle elapsed, 0-100
    pub progress_percent: f64,
    /// Days until the next stage transition; 0 once mature
    pub next_in_days: i64,
    /// True when `stage` has not started yet on the reference date
    pub upcoming: bool,
    pub source: StageSource,
}
