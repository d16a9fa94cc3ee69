//! Team inputs and consensus values
//!
//! Two independent layers can put a delta on a group/period:
//! - **synchronized** entries, derived from upstream rows that carry an
//!   authoritative consensus plus manual-input metadata
//! - **manual** entries, written by UI edits
//!
//! [`synchronize`] rebuilds the synchronized layer from scratch on every data
//! or filter change. [`apply_edits`] writes manual entries and recomputes
//! consensus for the edited groups only. Edits never mark rows as touched.

use crate::rollup::{GroupSummaryRow, Rollup};
use crate::team::{Team, TeamField};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parse an entered delta; anything unparseable counts as zero
#[inline]
#[must_use]
pub fn parse_numeric(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Where a team entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryOrigin {
    /// Derived from upstream data during synchronization
    Synced,
    /// Entered through an edit
    Manual,
}

/// One team's input for a group and period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub value: String,
    pub comment: String,
    pub owner: String,
    pub origin: EntryOrigin,
}

impl TeamEntry {
    fn manual() -> Self {
        Self {
            value: String::new(),
            comment: String::new(),
            owner: String::new(),
            origin: EntryOrigin::Manual,
        }
    }

    /// Numeric delta carried by this entry
    #[inline]
    #[must_use]
    pub fn delta(&self) -> f64 {
        parse_numeric(&self.value)
    }

    fn set(&mut self, field: TeamField, value: String) {
        match field {
            TeamField::Value => self.value = value,
            TeamField::Comment => self.comment = value,
            TeamField::Owner => self.owner = value,
        }
    }
}

/// A single edit of a team input cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamEdit {
    pub group: String,
    pub team: Team,
    pub period: String,
    pub field: TeamField,
    pub value: String,
}

impl TeamEdit {
    /// Edit of the numeric delta
    #[must_use]
    pub fn value(
        group: impl Into<String>,
        team: Team,
        period: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            team,
            period: period.into(),
            field: TeamField::Value,
            value: value.into(),
        }
    }

    /// Edit of an arbitrary field
    #[must_use]
    pub fn field(
        group: impl Into<String>,
        team: Team,
        period: impl Into<String>,
        field: TeamField,
        value: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            team,
            period: period.into(),
            field,
            value: value.into(),
        }
    }
}

/// Team entries for one group: team → period → entry
pub type GroupInputs = BTreeMap<Team, BTreeMap<String, TeamEntry>>;

/// Sparse store of team inputs keyed by group
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamInputs {
    groups: IndexMap<String, GroupInputs>,
}

impl TeamInputs {
    /// Empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries for a group
    #[inline]
    #[must_use]
    pub fn group(&self, key: &str) -> Option<&GroupInputs> {
        self.groups.get(key)
    }

    /// Entry for a group, team, and period
    #[must_use]
    pub fn get(&self, key: &str, team: Team, period: &str) -> Option<&TeamEntry> {
        self.groups.get(key)?.get(&team)?.get(period)
    }

    /// Numeric delta of one team for a group and period
    #[must_use]
    pub fn team_delta(&self, key: &str, team: Team, period: &str) -> f64 {
        self.get(key, team, period).map_or(0.0, TeamEntry::delta)
    }

    /// Sum of every team's delta for a group and period
    #[must_use]
    pub fn delta_sum(&self, key: &str, period: &str) -> f64 {
        Team::ALL
            .into_iter()
            .map(|team| self.team_delta(key, team, period))
            .sum()
    }

    /// Group keys with at least one entry
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.groups.keys().map(String::as_str)
    }

    /// Total number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    /// Whether the store holds no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write one edit
    ///
    /// Value edits make the entry manual. Comment and owner edits on a synced
    /// entry keep it synced, so a later upstream correction still drops it.
    pub fn apply(&mut self, edit: &TeamEdit) {
        let entry = self
            .groups
            .entry(edit.group.clone())
            .or_default()
            .entry(edit.team)
            .or_default()
            .entry(edit.period.clone())
            .or_insert_with(TeamEntry::manual);
        entry.set(edit.field, edit.value.clone());
        // Annotating a synced cell leaves its delta owned by upstream data
        if edit.field == TeamField::Value {
            entry.origin = EntryOrigin::Manual;
        }
    }

    /// Remove every entry of a group
    pub fn clear_group(&mut self, key: &str) {
        self.groups.shift_remove(key);
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Copy holding only manual entries
    #[must_use]
    pub fn manual_only(&self) -> Self {
        let groups = self
            .groups
            .iter()
            .filter_map(|(key, teams)| {
                let kept: GroupInputs = teams
                    .iter()
                    .filter_map(|(team, periods)| {
                        let periods: BTreeMap<_, _> = periods
                            .iter()
                            .filter(|(_, e)| e.origin == EntryOrigin::Manual)
                            .map(|(p, e)| (p.clone(), e.clone()))
                            .collect();
                        (!periods.is_empty()).then_some((*team, periods))
                    })
                    .collect();
                (!kept.is_empty()).then(|| (key.clone(), kept))
            })
            .collect();
        Self { groups }
    }

}

/// Displayed consensus: group → period → value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsensusValues {
    groups: IndexMap<String, IndexMap<String, f64>>,
}

impl ConsensusValues {
    /// Consensus for a group and period
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str, period: &str) -> Option<f64> {
        self.groups.get(key)?.get(period).copied()
    }

    /// All periods for a group
    #[inline]
    #[must_use]
    pub fn group(&self, key: &str) -> Option<&IndexMap<String, f64>> {
        self.groups.get(key)
    }

    /// Number of groups with consensus values
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no group has consensus values
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Consensus per period as `baseline + Σ team deltas`
#[must_use]
pub fn group_consensus(group: &GroupSummaryRow, inputs: &TeamInputs) -> IndexMap<String, f64> {
    group
        .periods
        .iter()
        .map(|(label, totals)| {
            (
                label.clone(),
                totals.baseline + inputs.delta_sum(&group.key, label),
            )
        })
        .collect()
}

/// Distinct group keys touched by a batch of edits, in first-edit order
#[must_use]
pub fn edited_groups(edits: &[TeamEdit]) -> Vec<String> {
    edits
        .iter()
        .map(|edit| edit.group.clone())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Rebuild synchronized team inputs and consensus from the current rollup
///
/// For each group and period, when any constituent row carries manual-input
/// metadata the period is touched: consensus is the data consensus and the
/// delta `data consensus − baseline` is recorded for the first touched team.
/// Groups with a touched period have their entries fully replaced; other
/// groups keep their manual entries. Synced entries from earlier runs never
/// survive. Running this twice on the same input yields the same output.
///
/// Output groups follow rollup order, then groups outside the rollup in their
/// previous order.
#[must_use]
pub fn synchronize(rollup: &Rollup, previous: &TeamInputs) -> (TeamInputs, ConsensusValues) {
    let mut manual = previous.manual_only();
    let mut inputs = TeamInputs::new();
    let mut consensus = ConsensusValues::default();
    let mut touched_groups = 0usize;

    for group in rollup.iter() {
        let mut synced = GroupInputs::new();
        let mut touched: IndexMap<String, f64> = IndexMap::new();

        for (label, totals) in &group.periods {
            if !totals.is_manually_touched() {
                continue;
            }
            let data = totals.data_consensus();
            let delta = data - totals.baseline;

            let mut notes: BTreeMap<Team, (String, String)> = BTreeMap::new();
            for row in &totals.rows {
                for (team, note) in row.touched_teams() {
                    notes.entry(team).or_insert_with(|| {
                        (
                            note.comment.clone().unwrap_or_default(),
                            note.owner.clone().unwrap_or_default(),
                        )
                    });
                }
            }

            for (i, (team, (comment, owner))) in notes.into_iter().enumerate() {
                let value = if i == 0 { delta.to_string() } else { String::new() };
                synced.entry(team).or_default().insert(
                    label.clone(),
                    TeamEntry {
                        value,
                        comment,
                        owner,
                        origin: EntryOrigin::Synced,
                    },
                );
            }
            touched.insert(label.clone(), data);
        }

        let kept = manual.groups.shift_remove(&group.key);
        if !touched.is_empty() {
            touched_groups += 1;
            inputs.groups.insert(group.key.clone(), synced);
        } else if let Some(kept) = kept {
            inputs.groups.insert(group.key.clone(), kept);
        }

        let values = group_consensus(group, &inputs)
            .into_iter()
            .map(|(label, value)| {
                let value = touched.get(&label).copied().unwrap_or(value);
                (label, value)
            })
            .collect();
        consensus.groups.insert(group.key.clone(), values);
    }
    inputs.groups.extend(manual.groups);

    tracing::debug!(
        groups = rollup.len(),
        touched = touched_groups,
        "synchronized team inputs"
    );
    (inputs, consensus)
}

/// Apply edits and recompute consensus for the edited groups only
///
/// Returns the affected group keys in first-edit order. Edits for groups not
/// present in the rollup are stored but produce no consensus entry.
pub fn apply_edits(
    inputs: &mut TeamInputs,
    consensus: &mut ConsensusValues,
    rollup: &Rollup,
    edits: &[TeamEdit],
) -> Vec<String> {
    for edit in edits {
        inputs.apply(edit);
    }

    let affected = edited_groups(edits);
    refresh_consensus(consensus, rollup, inputs, &affected);
    affected
}

/// Recompute consensus as `baseline + Σ team deltas` for the given groups
///
/// Other groups are left untouched.
pub fn refresh_consensus(
    consensus: &mut ConsensusValues,
    rollup: &Rollup,
    inputs: &TeamInputs,
    keys: &[String],
) {
    for key in keys {
        match rollup.get(key) {
            Some(group) => {
                consensus
                    .groups
                    .insert(key.clone(), group_consensus(group, inputs));
            }
            None => tracing::warn!(group = %key, "edit stored for group outside current rollup"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FallbackWeights;
    use crate::hierarchy::{FilterSelection, Level};
    use crate::period::ReportingWindow;
    use crate::rollup::rollup;
    use crate::row::{ForecastRow, ManualNote};

    fn sku_rollup(rows: &[ForecastRow]) -> Rollup {
        let selection = FilterSelection::new()
            .with(Level::Channel, "N")
            .with(Level::Chain, "C")
            .with(Level::Depot, "D")
            .with(Level::SubCat, "S");
        rollup(
            rows,
            &selection,
            &ReportingWindow::default(),
            &FallbackWeights::default(),
        )
    }

    #[test]
    fn parse_numeric_defaults_to_zero() {
        assert_eq!(parse_numeric("20"), 20.0);
        assert_eq!(parse_numeric(" -5 "), -5.0);
        assert_eq!(parse_numeric(""), 0.0);
        assert_eq!(parse_numeric("ten"), 0.0);
        assert_eq!(parse_numeric("NaN"), 0.0);
        assert_eq!(parse_numeric("inf"), 0.0);
    }

    #[test]
    fn untouched_groups_default_to_baseline() {
        let rows = vec![ForecastRow::new("1", ["N", "C", "D", "S", "SKU-1"], "2024-10-01", 80.0)];
        let rollup = sku_rollup(&rows);
        let (inputs, consensus) = synchronize(&rollup, &TeamInputs::new());
        assert!(inputs.is_empty());
        assert_eq!(consensus.get("SKU-1", "Oct"), Some(80.0));
        assert_eq!(consensus.get("SKU-1", "Nov"), Some(0.0));
    }

    #[test]
    fn multiple_touched_teams_attribute_delta_once() {
        let rows = vec![ForecastRow::new("1", ["N", "C", "D", "S", "SKU-1"], "2024-10-01", 100.0)
            .with_consensus(120.0)
            .with_note(Team::Finance, ManualNote::new("budget", "fin"))
            .with_note(Team::Marketing, ManualNote::new("campaign", "mkt"))];
        let rollup = sku_rollup(&rows);
        let (inputs, consensus) = synchronize(&rollup, &TeamInputs::new());

        let marketing = inputs.get("SKU-1", Team::Marketing, "Oct").unwrap();
        assert_eq!(marketing.value, "20");
        assert_eq!(marketing.comment, "campaign");
        let finance = inputs.get("SKU-1", Team::Finance, "Oct").unwrap();
        assert_eq!(finance.value, "");
        assert_eq!(finance.owner, "fin");
        assert_eq!(inputs.delta_sum("SKU-1", "Oct"), 20.0);
        assert_eq!(consensus.get("SKU-1", "Oct"), Some(120.0));
    }

    #[test]
    fn stale_synced_entries_dropped_after_upstream_correction() {
        let touched = vec![ForecastRow::new("1", ["N", "C", "D", "S", "SKU-1"], "2024-10-01", 100.0)
            .with_consensus(130.0)
            .with_note(Team::Sales, ManualNote::new("deal", "ana"))];
        let (inputs, _) = synchronize(&sku_rollup(&touched), &TeamInputs::new());
        assert_eq!(inputs.team_delta("SKU-1", Team::Sales, "Oct"), 30.0);

        let corrected = vec![ForecastRow::new("1", ["N", "C", "D", "S", "SKU-1"], "2024-10-01", 100.0)];
        let (inputs, consensus) = synchronize(&sku_rollup(&corrected), &inputs);
        assert!(inputs.is_empty());
        assert_eq!(consensus.get("SKU-1", "Oct"), Some(100.0));
    }

    #[test]
    fn manual_edits_survive_sync_of_untouched_groups() {
        let rows = vec![
            ForecastRow::new("1", ["N", "C", "D", "S", "SKU-1"], "2024-10-01", 100.0),
            ForecastRow::new("2", ["N", "C", "D", "S", "SKU-2"], "2024-10-01", 40.0)
                .with_consensus(50.0)
                .with_note(Team::Sales, ManualNote::new("", "bo")),
        ];
        let rollup = sku_rollup(&rows);
        let mut inputs = TeamInputs::new();
        inputs.apply(&TeamEdit::value("SKU-1", Team::Sales, "Oct", "7"));
        inputs.apply(&TeamEdit::value("SKU-2", Team::Finance, "Nov", "3"));

        let (inputs, consensus) = synchronize(&rollup, &inputs);
        assert_eq!(consensus.get("SKU-1", "Oct"), Some(107.0));
        // SKU-2 has authoritative upstream data, so its entries are replaced
        assert_eq!(inputs.get("SKU-2", Team::Finance, "Nov"), None);
        assert_eq!(inputs.team_delta("SKU-2", Team::Sales, "Oct"), 10.0);
        assert_eq!(consensus.get("SKU-2", "Oct"), Some(50.0));
    }

    #[test]
    fn edits_for_unknown_groups_are_stored_without_consensus() {
        let rows = vec![ForecastRow::new("1", ["N", "C", "D", "S", "SKU-1"], "2024-10-01", 10.0)];
        let rollup = sku_rollup(&rows);
        let (mut inputs, mut consensus) = synchronize(&rollup, &TeamInputs::new());

        let affected = apply_edits(
            &mut inputs,
            &mut consensus,
            &rollup,
            &[TeamEdit::value("SKU-404", Team::Sales, "Oct", "5")],
        );
        assert_eq!(affected, vec!["SKU-404".to_string()]);
        assert_eq!(inputs.team_delta("SKU-404", Team::Sales, "Oct"), 5.0);
        assert_eq!(consensus.get("SKU-404", "Oct"), None);
    }

    #[test]
    fn comment_edits_do_not_change_consensus() {
        let rows = vec![ForecastRow::new("1", ["N", "C", "D", "S", "SKU-1"], "2024-10-01", 10.0)];
        let rollup = sku_rollup(&rows);
        let (mut inputs, mut consensus) = synchronize(&rollup, &TeamInputs::new());
        apply_edits(
            &mut inputs,
            &mut consensus,
            &rollup,
            &[TeamEdit::field("SKU-1", Team::Sales, "Oct", TeamField::Comment, "why")],
        );
        assert_eq!(consensus.get("SKU-1", "Oct"), Some(10.0));
        assert_eq!(inputs.get("SKU-1", Team::Sales, "Oct").unwrap().comment, "why");
    }

    #[test]
    fn annotated_synced_entry_dropped_after_upstream_correction() {
        let touched = vec![ForecastRow::new("1", ["N", "C", "D", "S", "SKU-1"], "2024-10-01", 200.0)
            .with_consensus(230.0)
            .with_note(Team::Sales, ManualNote::new("deal", "ana"))];
        let rollup = sku_rollup(&touched);
        let (mut inputs, mut consensus) = synchronize(&rollup, &TeamInputs::new());

        apply_edits(
            &mut inputs,
            &mut consensus,
            &rollup,
            &[TeamEdit::field("SKU-1", Team::Sales, "Oct", TeamField::Comment, "why")],
        );
        let sales = inputs.get("SKU-1", Team::Sales, "Oct").unwrap();
        assert_eq!(sales.origin, EntryOrigin::Synced);
        assert_eq!(sales.comment, "why");
        assert_eq!(consensus.get("SKU-1", "Oct"), Some(230.0));

        let corrected = vec![ForecastRow::new("1", ["N", "C", "D", "S", "SKU-1"], "2024-10-01", 200.0)];
        let (inputs, consensus) = synchronize(&sku_rollup(&corrected), &inputs);
        assert_eq!(inputs.get("SKU-1", Team::Sales, "Oct"), None);
        assert_eq!(consensus.get("SKU-1", "Oct"), Some(200.0));
    }

    #[test]
    fn value_edit_takes_over_synced_entry() {
        let rows = vec![ForecastRow::new("1", ["N", "C", "D", "S", "SKU-1"], "2024-10-01", 200.0)
            .with_consensus(230.0)
            .with_note(Team::Sales, ManualNote::new("deal", "ana"))];
        let (mut inputs, _) = synchronize(&sku_rollup(&rows), &TeamInputs::new());
        inputs.apply(&TeamEdit::value("SKU-1", Team::Sales, "Oct", "12"));
        let sales = inputs.get("SKU-1", Team::Sales, "Oct").unwrap();
        assert_eq!(sales.origin, EntryOrigin::Manual);
        assert_eq!(sales.delta(), 12.0);
    }

    #[test]
    fn synchronize_output_order_is_stable() {
        let rows = vec![
            ForecastRow::new("1", ["N", "C", "D", "S", "SKU-1"], "2024-10-01", 200.0)
                .with_consensus(230.0)
                .with_note(Team::Sales, ManualNote::new("deal", "ana")),
            ForecastRow::new("2", ["N", "C", "D", "S", "SKU-2"], "2024-10-01", 40.0),
        ];
        let rollup = sku_rollup(&rows);
        let mut seed = TeamInputs::new();
        seed.apply(&TeamEdit::value("SKU-1", Team::Finance, "Nov", "1"));
        seed.apply(&TeamEdit::value("SKU-2", Team::Finance, "Nov", "2"));
        seed.apply(&TeamEdit::value("SKU-404", Team::Sales, "Oct", "3"));

        let (once, _) = synchronize(&rollup, &seed);
        let (twice, _) = synchronize(&rollup, &once);
        assert_eq!(once.keys().collect::<Vec<_>>(), vec!["SKU-1", "SKU-2", "SKU-404"]);
        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
    }

    #[test]
    fn edited_groups_keep_first_edit_order() {
        let edits = [
            TeamEdit::value("B", Team::Sales, "Oct", "1"),
            TeamEdit::value("A", Team::Sales, "Oct", "1"),
            TeamEdit::value("B", Team::Finance, "Nov", "2"),
        ];
        assert_eq!(edited_groups(&edits), vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn clearing_removes_entries() {
        let mut inputs = TeamInputs::new();
        inputs.apply(&TeamEdit::value("A", Team::Sales, "Oct", "1"));
        inputs.apply(&TeamEdit::value("B", Team::Sales, "Oct", "1"));
        inputs.clear_group("A");
        assert_eq!(inputs.keys().collect::<Vec<_>>(), vec!["B"]);
        inputs.clear();
        assert!(inputs.is_empty());
    }
}
