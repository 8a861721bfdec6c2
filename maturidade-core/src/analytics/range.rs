//! Date ranges and the dashboard's range presets.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An inclusive calendar date range.
///
/// `end < start` is not rejected; queries over such a range are simply empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Label used in export filenames for custom ranges.
    pub fn label(&self) -> String {
        format!("{}_{}", self.start, self.end)
    }

    /// Parse `YYYY-MM-DD..YYYY-MM-DD`.
    pub fn parse(value: &str) -> Result<Self> {
        let (start, end) = value.split_once("..").ok_or_else(|| Error::InvalidDate {
            value: value.to_string(),
            message: "expected START..END".to_string(),
        })?;
        Ok(Self {
            start: parse_date(start.trim())?,
            end: parse_date(end.trim())?,
        })
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| Error::InvalidDate {
        value: value.to_string(),
        message: e.to_string(),
    })
}

/// Preset ranges offered by the dashboard's range selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangePreset {
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl RangePreset {
    pub const ALL: [RangePreset; 4] = [
        RangePreset::Last30Days,
        RangePreset::ThreeMonths,
        RangePreset::SixMonths,
        RangePreset::OneYear,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RangePreset::Last30Days => "30d",
            RangePreset::ThreeMonths => "3m",
            RangePreset::SixMonths => "6m",
            RangePreset::OneYear => "1y",
        }
    }

    /// The range ending at `today`.
    pub fn resolve(&self, today: NaiveDate) -> DateRange {
        let start = match self {
            RangePreset::Last30Days => today.checked_sub_days(Days::new(30)),
            RangePreset::ThreeMonths => today.checked_sub_months(Months::new(3)),
            RangePreset::SixMonths => today.checked_sub_months(Months::new(6)),
            RangePreset::OneYear => today.checked_sub_months(Months::new(12)),
        };
        DateRange {
            start: start.unwrap_or(NaiveDate::MIN),
            end: today,
        }
    }
}

impl std::str::FromStr for RangePreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RangePreset::ALL
            .into_iter()
            .find(|preset| preset.label() == s)
            .ok_or_else(|| format!("unknown range preset: {} (use 30d, 3m, 6m or 1y)", s))
    }
}
