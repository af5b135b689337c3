//! Calendar quarters used as planting-season proxies
//!
//! Every component that needs quarter boundaries goes through
//! [`Quarter::date_range`]; the month table below is the only place the
//! calendar split is written down.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::DateRange;

/// Calendar quarter of a year
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

/// (start month, start day, end month, end day) per quarter, in quarter order
const QUARTER_TABLE: [(u32, u32, u32, u32); 4] = [
    (1, 1, 3, 31),
    (4, 1, 6, 30),
    (7, 1, 9, 30),
    (10, 1, 12, 31),
];

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    /// Quarter number, 1 through 4
    pub fn number(&self) -> u8 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    /// Inclusive calendar range of this quarter in the given year
    pub fn date_range(&self, year: i32) -> Result<DateRange, EngineError> {
        let (sm, sd, em, ed) = QUARTER_TABLE[(self.number() - 1) as usize];
        let start = NaiveDate::from_ymd_opt(year, sm, sd);
        let end = NaiveDate::from_ymd_opt(year, em, ed);

        match (start, end) {
            (Some(start), Some(end)) => Ok(DateRange::new(start, end)),
            _ => Err(EngineError::input(
                "year",
                format!("Year {} is outside the supported calendar", year),
            )),
        }
    }

    /// Quarter a date falls in
    pub fn of_date(date: NaiveDate) -> Quarter {
        let month = date.month();
        Quarter::ALL
            .into_iter()
            .zip(QUARTER_TABLE)
            .find(|(_, (start_month, _, end_month, _))| (*start_month..=*end_month).contains(&month))
            .map(|(quarter, _)| quarter)
            .unwrap_or(Quarter::Q4)
    }
}

impl TryFrom<u8> for Quarter {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Quarter::Q1),
            2 => Ok(Quarter::Q2),
            3 => Ok(Quarter::Q3),
            4 => Ok(Quarter::Q4),
            other => Err(EngineError::input(
                "quarter",
                format!("Quarter must be between 1 and 4, got {}", other),
            )),
        }
    }
}

impl From<Quarter> for u8 {
    fn from(quarter: Quarter) -> Self {
        quarter.number()
    }
}

impl std::fmt::Display for Quarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q{}", self.number())
    }
}
