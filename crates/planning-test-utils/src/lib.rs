//! Testing utilities for the planning workspace
//!
//! Shared fixture builders for rows, selections, and stores.

#![allow(missing_docs)]

use planning_core::{
    FallbackWeights, FilterSelection, ForecastRow, Level, ManualNote, PlanningConfig,
    PlanningStore, ReportingWindow, Rollup, Team,
};

/// Row under a fixed path `North > C1 > Depot-5 > Snacks > <sku>`
pub fn sku_row(key: &str, sku: &str, date: &str, forecast: f64) -> ForecastRow {
    ForecastRow::new(key, ["North", "C1", "Depot-5", "Snacks", sku], date, forecast)
}

/// Row with an explicit full hierarchy path
pub fn path_row(key: &str, path: [&str; 5], date: &str, forecast: f64) -> ForecastRow {
    ForecastRow::new(key, path, date, forecast)
}

/// Row carrying an authoritative consensus and sales metadata
pub fn synced_row(key: &str, sku: &str, date: &str, forecast: f64, consensus: f64) -> ForecastRow {
    sku_row(key, sku, date, forecast)
        .with_consensus(consensus)
        .with_note(Team::Sales, ManualNote::new("upstream adjustment", "planner"))
}

/// Selection pinning the first `depth` levels of a path
pub fn pinned(path: [&str; 5], depth: usize) -> FilterSelection {
    Level::ALL
        .into_iter()
        .zip(path)
        .take(depth)
        .fold(FilterSelection::new(), |sel, (level, value)| sel.with(level, value))
}

/// Selection that groups rows under `North > C1 > Depot-5 > Snacks` by SKU
pub fn sku_selection() -> FilterSelection {
    pinned(["North", "C1", "Depot-5", "Snacks", ""], 4)
}

/// Rollup over the default window and weights
pub fn default_rollup(rows: &[ForecastRow], selection: &FilterSelection) -> Rollup {
    planning_core::rollup(
        rows,
        selection,
        &ReportingWindow::default(),
        &FallbackWeights::default(),
    )
}

/// Store over the default configuration
pub fn setup_store() -> PlanningStore {
    PlanningStore::new(&PlanningConfig::new()).expect("default config is valid")
}

/// Small multi-channel dataset spanning the default window and prior year
pub fn sample_rows() -> Vec<ForecastRow> {
    vec![
        path_row("R1", ["North", "C1", "Depot-5", "Snacks", "SKU-1"], "2024-10-05", 100.0),
        path_row("R2", ["North", "C1", "Depot-5", "Snacks", "SKU-2"], "2024-10-18", 50.0),
        path_row("R3", ["North", "C1", "Depot-6", "Drinks", "SKU-3"], "2024-11-02", 80.0),
        path_row("R4", ["North", "C2", "Depot-7", "Drinks", "SKU-4"], "2024-12-09", 25.0),
        path_row("R5", ["South", "C3", "Depot-9", "Snacks", "SKU-5"], "2024-10-11", 60.0),
        path_row("R6", ["South", "C3", "Depot-9", "Snacks", "SKU-5"], "2023-10-11", 0.0)
            .with_actual(55.0),
        path_row("R7", ["North", "C1", "Depot-5", "Snacks", "SKU-1"], "2023-11-20", 0.0)
            .with_actual(95.0),
    ]
}
