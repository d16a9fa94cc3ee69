//! Filter / group / sum pass
//!
//! Turns the flat row collection into one [`GroupSummaryRow`] per distinct
//! label at the active grouping level:
//! - rows are filtered on every pinned level except the grouping level
//! - forecasts are bucketed into current-year periods, actuals into the
//!   matching prior-year periods
//! - decomposition components are summed per period, with missing
//!   components replaced by a weighted share of the row's forecast
//! - constituent rows are kept per period for consensus re-derivation

use crate::config::FallbackWeights;
use crate::hierarchy::{resolve_grouping_level, FilterSelection, Level};
use crate::period::ReportingWindow;
use crate::row::{Component, ForecastRow};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Sums for one group in one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTotals {
    /// Actual quantity in the same month a year earlier
    pub last_year_actual: f64,
    /// Baseline forecast
    pub baseline: f64,
    /// Decomposition components (explicit or fallback)
    pub components: BTreeMap<Component, f64>,
    /// Rows bucketed into this period
    pub rows: Vec<ForecastRow>,
}

impl PeriodTotals {
    fn empty() -> Self {
        Self {
            last_year_actual: 0.0,
            baseline: 0.0,
            components: Component::ALL.into_iter().map(|c| (c, 0.0)).collect(),
            rows: Vec::new(),
        }
    }

    /// Sum of all decomposition components
    #[inline]
    #[must_use]
    pub fn system_total(&self) -> f64 {
        self.components.values().sum()
    }

    /// Sum of authoritative consensus (or baseline) over constituent rows
    #[inline]
    #[must_use]
    pub fn data_consensus(&self) -> f64 {
        self.rows.iter().map(ForecastRow::data_consensus).sum()
    }

    /// Whether any constituent row carries manual-input metadata
    #[inline]
    #[must_use]
    pub fn is_manually_touched(&self) -> bool {
        self.rows.iter().any(ForecastRow::has_manual_input)
    }
}

/// Aggregated entity for one label at the grouping level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummaryRow {
    /// Label at the grouping level
    pub key: String,
    /// Level the key belongs to
    pub level: Level,
    /// Totals by period label, in window order
    pub periods: IndexMap<String, PeriodTotals>,
}

impl GroupSummaryRow {
    fn new(key: String, level: Level, window: &ReportingWindow) -> Self {
        Self {
            key,
            level,
            periods: window
                .labels()
                .map(|label| (label.to_string(), PeriodTotals::empty()))
                .collect(),
        }
    }

    /// Totals for a period
    #[inline]
    #[must_use]
    pub fn period(&self, label: &str) -> Option<&PeriodTotals> {
        self.periods.get(label)
    }

    /// Baseline forecast for a period (zero if unknown)
    #[inline]
    #[must_use]
    pub fn baseline(&self, label: &str) -> f64 {
        self.period(label).map_or(0.0, |p| p.baseline)
    }

    /// Prior-year actual for a period (zero if unknown)
    #[inline]
    #[must_use]
    pub fn last_year_actual(&self, label: &str) -> f64 {
        self.period(label).map_or(0.0, |p| p.last_year_actual)
    }

    /// Component sum for a period (zero if unknown)
    #[inline]
    #[must_use]
    pub fn component(&self, label: &str, component: Component) -> f64 {
        self.period(label)
            .and_then(|p| p.components.get(&component).copied())
            .unwrap_or(0.0)
    }

    /// Sum of decomposition components for a period
    #[inline]
    #[must_use]
    pub fn system_total(&self, label: &str) -> f64 {
        self.period(label).map_or(0.0, PeriodTotals::system_total)
    }
}

/// Result of the filter / group / sum pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollup {
    /// Active grouping level
    pub level: Level,
    /// Groups in first-encounter order
    pub groups: IndexMap<String, GroupSummaryRow>,
}

impl Rollup {
    /// Empty rollup at a level
    #[inline]
    #[must_use]
    pub fn empty(level: Level) -> Self {
        Self {
            level,
            groups: IndexMap::new(),
        }
    }

    /// Group by key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&GroupSummaryRow> {
        self.groups.get(key)
    }

    /// Number of groups
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate groups in first-encounter order
    pub fn iter(&self) -> impl Iterator<Item = &GroupSummaryRow> + '_ {
        self.groups.values()
    }

    /// Baseline summed across all groups
    #[must_use]
    pub fn total_baseline(&self, label: &str) -> f64 {
        self.iter().map(|g| g.baseline(label)).sum()
    }
}

/// Whether a row survives the filter for a grouping level
///
/// The grouping level itself is never filtered so all its labels surface.
#[must_use]
pub fn row_matches(row: &ForecastRow, selection: &FilterSelection, grouping: Level) -> bool {
    Level::ALL
        .into_iter()
        .filter(|level| *level != grouping)
        .all(|level| selection.get(level).admits(row.value_at(level)))
}

/// Group and sum rows under a filter selection
#[must_use]
pub fn rollup(
    rows: &[ForecastRow],
    selection: &FilterSelection,
    window: &ReportingWindow,
    weights: &FallbackWeights,
) -> Rollup {
    let level = resolve_grouping_level(selection);
    let mut result = Rollup::empty(level);

    for row in rows.iter().filter(|r| row_matches(r, selection, level)) {
        let key = row.value_at(level);
        let group = result
            .groups
            .entry(key.to_string())
            .or_insert_with(|| GroupSummaryRow::new(key.to_string(), level, window));

        for period in window.periods() {
            let Some(totals) = group.periods.get_mut(&period.label) else {
                continue;
            };
            if period.is_current(&row.date) {
                totals.baseline += row.forecast;
                for component in Component::ALL {
                    let value = row
                        .component(component)
                        .unwrap_or_else(|| weights.weight(component) * row.forecast);
                    *totals.components.entry(component).or_insert(0.0) += value;
                }
                totals.rows.push(row.clone());
            }
            if period.is_prior(&row.date) {
                totals.last_year_actual += row.actual;
            }
        }
    }

    tracing::debug!(level = %level, groups = result.len(), "rollup computed");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, path: [&str; 5], date: &str, forecast: f64) -> ForecastRow {
        ForecastRow::new(key, path, date, forecast)
    }

    fn sample() -> Vec<ForecastRow> {
        vec![
            row("1", ["North", "C1", "Depot-5", "Snacks", "SKU-1"], "2024-10-05", 100.0),
            row("2", ["North", "C1", "Depot-5", "Snacks", "SKU-2"], "2024-10-18", 50.0),
            row("3", ["North", "C2", "Depot-7", "Drinks", "SKU-3"], "2024-11-02", 30.0),
            row("4", ["South", "C3", "Depot-9", "Drinks", "SKU-4"], "2024-10-01", 70.0),
            row("5", ["North", "C1", "Depot-5", "Snacks", "SKU-1"], "2023-10-03", 0.0)
                .with_actual(90.0),
        ]
    }

    #[test]
    fn groups_by_first_open_level_in_encounter_order() {
        let selection = FilterSelection::new().with(Level::Channel, "North");
        let result = rollup(
            &sample(),
            &selection,
            &ReportingWindow::default(),
            &FallbackWeights::default(),
        );

        assert_eq!(result.level, Level::Chain);
        let keys: Vec<_> = result.groups.keys().cloned().collect();
        assert_eq!(keys, vec!["C1", "C2"]);
        assert_eq!(result.get("C1").unwrap().baseline("Oct"), 150.0);
        assert_eq!(result.get("C1").unwrap().last_year_actual("Oct"), 90.0);
        assert_eq!(result.get("C2").unwrap().baseline("Nov"), 30.0);
    }

    #[test]
    fn grouping_level_is_not_filtered() {
        // SKU pinned but grouping stops at chain; SKU filter still applies below
        let selection = FilterSelection::new()
            .with(Level::Channel, "North")
            .with(Level::Sku, "SKU-2");
        let result = rollup(
            &sample(),
            &selection,
            &ReportingWindow::default(),
            &FallbackWeights::default(),
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("C1").unwrap().baseline("Oct"), 50.0);
    }

    #[test]
    fn fallback_components_use_weights() {
        let rows = vec![
            row("1", ["N", "C", "D", "S", "K"], "2024-10-01", 100.0)
                .with_component(Component::Trend, 10.0),
        ];
        let result = rollup(
            &rows,
            &FilterSelection::new(),
            &ReportingWindow::default(),
            &FallbackWeights::default(),
        );
        let group = result.get("N").unwrap();
        assert_eq!(group.component("Oct", Component::Trend), 10.0);
        assert!((group.component("Oct", Component::Seasonality) - 20.0).abs() < 1e-9);
        assert!((group.component("Oct", Component::Lag) - 5.0).abs() < 1e-9);
        assert!((group.system_total("Oct") - 60.0).abs() < 1e-9);
    }

    #[test]
    fn constituent_rows_retained_per_period() {
        let result = rollup(
            &sample(),
            &FilterSelection::new(),
            &ReportingWindow::default(),
            &FallbackWeights::default(),
        );
        let north = result.get("North").unwrap();
        let keys: Vec<_> = north.period("Oct").unwrap().rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["1", "2"]);
        assert_eq!(north.period("Nov").unwrap().rows.len(), 1);
        assert!(north.period("Dec").unwrap().rows.is_empty());
    }

    #[test]
    fn unmatched_selection_yields_empty_rollup() {
        let selection = FilterSelection::new().with(Level::Channel, "West");
        let result = rollup(
            &sample(),
            &selection,
            &ReportingWindow::default(),
            &FallbackWeights::default(),
        );
        assert!(result.is_empty());
        assert_eq!(result.level, Level::Chain);
        assert_eq!(result.total_baseline("Oct"), 0.0);
    }
}
