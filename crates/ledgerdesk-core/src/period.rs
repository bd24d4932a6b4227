//! Reporting periods
//!
//! Named periods are turned into inclusive date ranges before entries are
//! fetched. Resolution is a pure function of "today" so callers and tests can
//! pin the clock.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use ledgerdesk_config::PeriodPreset;

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, swapping the bounds if given in reverse
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        *date >= self.start && *date <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Period selected by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPeriod {
    pub preset: PeriodPreset,
    /// Custom start date (when preset is Custom)
    pub custom_start: Option<NaiveDate>,
    /// Custom end date (when preset is Custom)
    pub custom_end: Option<NaiveDate>,
}

impl Default for ReportPeriod {
    fn default() -> Self {
        Self::new(PeriodPreset::CurrentMonth)
    }
}

impl ReportPeriod {
    pub fn new(preset: PeriodPreset) -> Self {
        Self {
            preset,
            custom_start: None,
            custom_end: None,
        }
    }

    pub fn custom(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            preset: PeriodPreset::Custom,
            custom_start: Some(start),
            custom_end: Some(end),
        }
    }

    /// Resolve against an explicit "today".
    ///
    /// Returns `None` only for a custom period missing one of its dates.
    pub fn resolve(&self, today: NaiveDate) -> Option<DateRange> {
        let year = today.year();
        match self.preset {
            PeriodPreset::CurrentMonth => {
                let start = first_of_month(year, today.month())?;
                Some(DateRange::new(start, last_of_month(year, today.month())?))
            }
            PeriodPreset::PreviousMonth => {
                let (y, m) = if today.month() == 1 {
                    (year - 1, 12)
                } else {
                    (year, today.month() - 1)
                };
                Some(DateRange::new(first_of_month(y, m)?, last_of_month(y, m)?))
            }
            PeriodPreset::CurrentQuarter => {
                let first_month = (today.month0() / 3) * 3 + 1;
                let last_month = first_month + 2;
                Some(DateRange::new(
                    first_of_month(year, first_month)?,
                    last_of_month(year, last_month)?,
                ))
            }
            PeriodPreset::YearToDate => Some(DateRange::new(NaiveDate::from_ymd_opt(year, 1, 1)?, today)),
            PeriodPreset::PreviousYear => Some(DateRange::new(
                NaiveDate::from_ymd_opt(year - 1, 1, 1)?,
                NaiveDate::from_ymd_opt(year - 1, 12, 31)?,
            )),
            PeriodPreset::Custom => match (self.custom_start, self.custom_end) {
                (Some(start), Some(end)) => Some(DateRange::new(start, end)),
                _ => None,
            },
        }
    }

    /// Resolve against the local clock
    pub fn resolve_today(&self) -> Option<DateRange> {
        self.resolve(Local::now().date_naive())
    }

    /// Human-readable description of the period
    pub fn description(&self) -> String {
        match self.preset {
            PeriodPreset::CurrentMonth => "Current Month".to_string(),
            PeriodPreset::PreviousMonth => "Previous Month".to_string(),
            PeriodPreset::CurrentQuarter => "Current Quarter".to_string(),
            PeriodPreset::YearToDate => "Year to Date".to_string(),
            PeriodPreset::PreviousYear => "Previous Year".to_string(),
            PeriodPreset::Custom => match (self.custom_start, self.custom_end) {
                (Some(start), Some(end)) => format!("{} to {}", start, end),
                _ => "Custom Range".to_string(),
            },
        }
    }
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}
