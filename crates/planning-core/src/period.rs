//! Reporting window and period bucketing
//!
//! Rows are bucketed by substring match of a `YYYY-MM` key against their
//! date string, not by parsing the date. Any row whose date contains the key
//! lands in that bucket regardless of the day.

use crate::error::{PlanningError, Result};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Most months a window may span (labels are month names and must be unique)
pub const MAX_WINDOW_MONTHS: u32 = 12;

/// One reporting period
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Display label, e.g. `Oct`
    pub label: String,
    /// Current-year month key, e.g. `2024-10`
    pub current: String,
    /// Same month one year earlier, e.g. `2023-10`
    pub prior: String,
}

impl Period {
    /// Whether a date falls in the current-year month
    #[inline]
    #[must_use]
    pub fn is_current(&self, date: &str) -> bool {
        date.contains(self.current.as_str())
    }

    /// Whether a date falls in the prior-year month
    #[inline]
    #[must_use]
    pub fn is_prior(&self, date: &str) -> bool {
        date.contains(self.prior.as_str())
    }
}

/// Fixed set of consecutive periods being reported on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportingWindow {
    periods: Vec<Period>,
}

impl ReportingWindow {
    /// Build `months` consecutive periods starting at `anchor` (`YYYY-MM`)
    ///
    /// # Errors
    /// Returns error if the anchor is malformed or `months` is out of range
    pub fn new(anchor: &str, months: u32) -> Result<Self> {
        if months == 0 || months > MAX_WINDOW_MONTHS {
            return Err(PlanningError::InvalidConfig(format!(
                "window months must be between 1 and {MAX_WINDOW_MONTHS}, got {months}"
            )));
        }
        let start = parse_month(anchor)?;

        let periods = (0..months)
            .map(|offset| {
                let month = start
                    .checked_add_months(Months::new(offset))
                    .ok_or_else(|| PlanningError::InvalidMonth(anchor.to_string()))?;
                let prior = month
                    .checked_sub_months(Months::new(12))
                    .ok_or_else(|| PlanningError::InvalidMonth(anchor.to_string()))?;
                Ok(Period {
                    label: month.format("%b").to_string(),
                    current: month.format("%Y-%m").to_string(),
                    prior: prior.format("%Y-%m").to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { periods })
    }

    /// Periods in chronological order
    #[inline]
    #[must_use]
    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Period labels in chronological order
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.periods.iter().map(|p| p.label.as_str())
    }

    /// Find a period by label
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&Period> {
        self.periods.iter().find(|p| p.label == label)
    }

    /// Number of periods
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Whether the window is empty (never true for a constructed window)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

impl Default for ReportingWindow {
    fn default() -> Self {
        let period = |label: &str, current: &str, prior: &str| Period {
            label: label.to_string(),
            current: current.to_string(),
            prior: prior.to_string(),
        };
        Self {
            periods: vec![
                period("Oct", "2024-10", "2023-10"),
                period("Nov", "2024-11", "2023-11"),
                period("Dec", "2024-12", "2023-12"),
            ],
        }
    }
}

/// Parse a `YYYY-MM` month key into the first day of that month
///
/// # Errors
/// Returns [`PlanningError::InvalidMonth`] if the key is malformed
pub fn parse_month(key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", key.trim()), "%Y-%m-%d")
        .map_err(|_| PlanningError::InvalidMonth(key.to_string()))
}
