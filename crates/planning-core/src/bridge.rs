//! Bridge aggregation
//!
//! One [`BridgeRow`] per period summarizing every visible group: baseline,
//! each team's delta, the resulting final consensus, and the system-side
//! decomposition total kept as an independent cross-check.

use crate::consensus::TeamInputs;
use crate::period::ReportingWindow;
use crate::rollup::Rollup;
use crate::row::Component;
use crate::team::Team;
use serde::Serialize;
use std::collections::BTreeMap;

/// Waterfall breakdown for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeRow {
    /// Period label
    pub period: String,
    /// Baseline forecast across all groups
    pub baseline: f64,
    /// Summed delta per team
    pub teams: BTreeMap<Team, f64>,
    /// Baseline plus all team deltas
    #[serde(rename = "final")]
    pub final_total: f64,
    /// Summed decomposition per component
    pub components: BTreeMap<Component, f64>,
    /// Sum of all decomposition components
    pub system_final: f64,
}

impl BridgeRow {
    /// Delta contributed by one team
    #[inline]
    #[must_use]
    pub fn team(&self, team: Team) -> f64 {
        self.teams.get(&team).copied().unwrap_or(0.0)
    }
}

/// Build the bridge for every period in the window
#[must_use]
pub fn build_bridge(rollup: &Rollup, inputs: &TeamInputs, window: &ReportingWindow) -> Vec<BridgeRow> {
    window
        .labels()
        .map(|label| {
            let baseline = rollup.total_baseline(label);

            let teams: BTreeMap<Team, f64> = Team::ALL
                .into_iter()
                .map(|team| {
                    let delta: f64 = rollup
                        .iter()
                        .map(|g| inputs.team_delta(&g.key, team, label))
                        .sum();
                    (team, delta)
                })
                .collect();

            let components: BTreeMap<Component, f64> = Component::ALL
                .into_iter()
                .map(|c| (c, rollup.iter().map(|g| g.component(label, c)).sum::<f64>()))
                .collect();

            BridgeRow {
                period: label.to_string(),
                baseline,
                final_total: baseline + teams.values().sum::<f64>(),
                system_final: components.values().sum(),
                teams,
                components,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FallbackWeights;
    use crate::consensus::TeamEdit;
    use crate::hierarchy::FilterSelection;
    use crate::rollup::rollup;
    use crate::row::ForecastRow;

    #[test]
    fn bridge_sums_across_groups() {
        let rows = vec![
            ForecastRow::new("1", ["A", "c", "d", "s", "k"], "2024-10-01", 100.0),
            ForecastRow::new("2", ["B", "c", "d", "s", "k"], "2024-10-01", 50.0),
        ];
        let window = ReportingWindow::default();
        let rollup = rollup(&rows, &FilterSelection::new(), &window, &FallbackWeights::default());

        let mut inputs = TeamInputs::new();
        inputs.apply(&TeamEdit::value("A", Team::Sales, "Oct", "10"));
        inputs.apply(&TeamEdit::value("B", Team::Finance, "Oct", "oops"));

        let bridge = build_bridge(&rollup, &inputs, &window);
        assert_eq!(bridge.len(), 3);
        let oct = &bridge[0];
        assert_eq!(oct.period, "Oct");
        assert_eq!(oct.baseline, 150.0);
        assert_eq!(oct.team(Team::Sales), 10.0);
        assert_eq!(oct.team(Team::Finance), 0.0);
        assert_eq!(oct.final_total, 160.0);
        assert!((oct.system_final - 150.0).abs() < 1e-9);
    }

    #[test]
    fn edits_outside_rollup_are_not_bridged() {
        let rows = vec![ForecastRow::new("1", ["A", "c", "d", "s", "k"], "2024-10-01", 100.0)];
        let window = ReportingWindow::default();
        let rollup = rollup(&rows, &FilterSelection::new(), &window, &FallbackWeights::default());

        let mut inputs = TeamInputs::new();
        inputs.apply(&TeamEdit::value("Z", Team::Sales, "Oct", "99"));

        let bridge = build_bridge(&rollup, &inputs, &window);
        assert_eq!(bridge[0].final_total, 100.0);
    }
}
