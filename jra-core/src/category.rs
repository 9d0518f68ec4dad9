//! The four data categories collected per year.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CollectError;

/// One of the fixed data kinds. Declaration order is collection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    RaceCalendar,
    RaceResults,
    HorseData,
    TrackCondition,
}

impl CategoryKind {
    /// All categories, in collection order.
    pub const ALL: [CategoryKind; 4] = [
        CategoryKind::RaceCalendar,
        CategoryKind::RaceResults,
        CategoryKind::HorseData,
        CategoryKind::TrackCondition,
    ];

    /// File name prefix: `{prefix}_{year}.csv`.
    pub fn prefix(self) -> &'static str {
        match self {
            CategoryKind::RaceCalendar => "race_calendar",
            CategoryKind::RaceResults => "race_results",
            CategoryKind::HorseData => "horse_data",
            CategoryKind::TrackCondition => "track_condition",
        }
    }

    /// Fixed column schema written as the CSV header.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            CategoryKind::RaceCalendar => &[
                "date",
                "venue",
                "race_number",
                "race_name",
                "race_class",
                "distance",
                "track_type",
            ],
            CategoryKind::RaceResults => &[
                "date",
                "venue",
                "race_number",
                "race_name",
                "horse_name",
                "jockey",
                "trainer",
                "finish_position",
                "finish_time",
                "odds",
                "weight",
            ],
            CategoryKind::HorseData => &[
                "horse_id",
                "horse_name",
                "birth_year",
                "sex",
                "color",
                "sire",
                "dam",
                "owner",
                "trainer",
                "stable",
            ],
            CategoryKind::TrackCondition => &[
                "date",
                "venue",
                "track_type",
                "condition",
                "weather",
                "temperature",
                "humidity",
                "rainfall",
            ],
        }
    }

    /// Human-readable label for log lines.
    pub fn label(self) -> &'static str {
        match self {
            CategoryKind::RaceCalendar => "race calendar",
            CategoryKind::RaceResults => "race results",
            CategoryKind::HorseData => "horse data",
            CategoryKind::TrackCondition => "track condition data",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for CategoryKind {
    type Err = CollectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryKind::ALL
            .into_iter()
            .find(|c| c.prefix() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = CategoryKind::ALL.iter().map(|c| c.prefix()).collect();
                CollectError::Validation(format!(
                    "unknown data type '{s}'. Valid: {}",
                    valid.join(", ")
                ))
            })
    }
}
