//! Stock norms derived from forecast accuracy
//!
//! For each group at a hierarchy level, rows are summed per date into a
//! series of `(actual, forecast)` points ordered by date string. From it:
//! - rolling standard error: sample standard deviation of
//!   `actual − forecast` over a trailing window of observed points
//! - safety stock: `z × standard error × √lead time`
//! - norm: mean forecast over the trailing window × cover periods + safety stock
//!
//! A point is observed when its summed actual is non-zero.

use crate::config::NormsParams;
use crate::hierarchy::Level;
use crate::row::ForecastRow;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Derived norm figures for one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormRow {
    pub key: String,
    /// Observed points in the error window
    pub observations: usize,
    pub std_error: f64,
    pub mean_demand: f64,
    pub safety_stock: f64,
    pub norm: f64,
}

/// Sample standard deviation; zero below two values
#[must_use]
pub fn std_error(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (n - 1.0)).sqrt()
}

/// Standard error over a trailing window ending at each point
#[must_use]
pub fn rolling_std_error(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|end| {
            let start = (end + 1).saturating_sub(window);
            std_error(&values[start..=end])
        })
        .collect()
}

/// Safety stock for a standard error and lead time
#[inline]
#[must_use]
pub fn safety_stock(std_error: f64, params: &NormsParams) -> f64 {
    params.z * std_error * params.lead_time.sqrt()
}

/// Compute norms for every group at a level, in first-encounter order
#[must_use]
pub fn compute_norms(rows: &[ForecastRow], level: Level, params: &NormsParams) -> Vec<NormRow> {
    let mut series: IndexMap<&str, BTreeMap<&str, (f64, f64)>> = IndexMap::new();
    for row in rows {
        let point = series
            .entry(row.value_at(level))
            .or_default()
            .entry(row.date.as_str())
            .or_insert((0.0, 0.0));
        point.0 += row.actual;
        point.1 += row.forecast;
    }

    series
        .into_iter()
        .map(|(key, points)| {
            let points: Vec<(f64, f64)> = points.into_values().collect();

            let errors: Vec<f64> = points
                .iter()
                .filter(|(actual, _)| *actual != 0.0)
                .map(|(actual, forecast)| actual - forecast)
                .collect();
            let rolling = rolling_std_error(&errors, params.window);
            let se = rolling.last().copied().unwrap_or(0.0);

            let recent = &points[points.len().saturating_sub(params.window)..];
            #[allow(clippy::cast_precision_loss)]
            let mean_demand = if recent.is_empty() {
                0.0
            } else {
                recent.iter().map(|(_, f)| f).sum::<f64>() / recent.len() as f64
            };

            let safety = safety_stock(se, params);
            NormRow {
                key: key.to_string(),
                observations: errors.len().min(params.window),
                std_error: se,
                mean_demand,
                safety_stock: safety,
                norm: mean_demand * params.cover_periods + safety,
            }
        })
        .collect()
}
