//! Planning store
//!
//! Single owner of the planning state. Every change goes through
//! [`PlanningStore::dispatch`]:
//! 1. the pure [`reduce`] function produces the next [`PlanningState`]
//! 2. derived data is recomputed into a fresh [`Snapshot`]
//! 3. the snapshot is published to every subscriber
//!
//! Rollups are memoized on `(row revision, filters)`. Data and filter
//! changes run a full consensus synchronization; edits only refresh the
//! edited groups and the bridge.
//!
//! Manual edits persist across data reloads until explicitly cleared, except
//! in groups whose upstream rows carry authoritative manual-input metadata.

use crate::bridge::{build_bridge, BridgeRow};
use crate::config::{FallbackWeights, PlanningConfig};
use crate::consensus::{
    edited_groups, refresh_consensus, synchronize, ConsensusValues, TeamEdit, TeamInputs,
};
use crate::error::Result;
use crate::hierarchy::{FilterSelection, Level, Selection};
use crate::period::ReportingWindow;
use crate::rollup::{rollup, Rollup};
use crate::row::{merge_updates, ForecastRow, RawRow};
use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use std::sync::Arc;

/// Immutable planning state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanningState {
    /// Source rows, shared until modified
    pub rows: Arc<Vec<ForecastRow>>,
    /// Active filter selection
    pub filters: FilterSelection,
    /// Team inputs (synchronized and manual)
    pub inputs: TeamInputs,
    /// Bumped whenever `rows` changes
    pub revision: u64,
}

/// State transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace the whole row collection
    Load(Vec<ForecastRow>),
    /// Merge upstream updates into existing rows by id
    ApplyUpdates(Vec<RawRow>),
    /// Replace the whole filter selection
    SetFilters(FilterSelection),
    /// Change the selection at one level
    Select(Level, Selection),
    /// Single team-input edit
    Edit(TeamEdit),
    /// Batch of team-input edits
    EditBatch(Vec<TeamEdit>),
    /// Clear team inputs for one group, or all when `None`
    ClearInputs(Option<String>),
}

impl Action {
    fn edits(&self) -> Option<&[TeamEdit]> {
        match self {
            Action::Edit(edit) => Some(std::slice::from_ref(edit)),
            Action::EditBatch(edits) => Some(edits),
            _ => None,
        }
    }
}

/// Compute the next state for an action
///
/// Pure: derived data (rollups, consensus, bridge) is not touched here.
#[must_use]
pub fn reduce(state: &PlanningState, action: &Action) -> PlanningState {
    let mut next = state.clone();
    match action {
        Action::Load(rows) => {
            next.rows = Arc::new(rows.clone());
            next.revision += 1;
        }
        Action::ApplyUpdates(updates) => {
            let mut rows = (*state.rows).clone();
            if merge_updates(&mut rows, updates).matched > 0 {
                next.rows = Arc::new(rows);
                next.revision += 1;
            }
        }
        Action::SetFilters(filters) => next.filters = filters.clone(),
        Action::Select(level, selection) => next.filters.set(*level, selection.clone()),
        Action::Edit(edit) => next.inputs.apply(edit),
        Action::EditBatch(edits) => edits.iter().for_each(|e| next.inputs.apply(e)),
        Action::ClearInputs(Some(key)) => next.inputs.clear_group(key),
        Action::ClearInputs(None) => next.inputs.clear(),
    }
    next
}

/// Everything a presentation layer reads after a change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Row revision the snapshot was computed from
    pub revision: u64,
    /// Filter selection the snapshot was computed from
    pub filters: FilterSelection,
    /// Active grouping level
    pub level: Level,
    /// Grouped summary rows
    pub rollup: Arc<Rollup>,
    /// Consensus per group and period
    pub consensus: ConsensusValues,
    /// Team inputs per group
    pub inputs: TeamInputs,
    /// Bridge per period
    pub bridge: Vec<BridgeRow>,
}

/// Single-entry memo of the last rollup
#[derive(Debug, Default)]
pub struct RollupMemo {
    key: Option<(u64, FilterSelection)>,
    value: Option<Arc<Rollup>>,
    computations: u64,
}

impl RollupMemo {
    /// Return the memoized rollup or compute a new one
    pub fn get_or_compute(
        &mut self,
        state: &PlanningState,
        window: &ReportingWindow,
        weights: &FallbackWeights,
    ) -> Arc<Rollup> {
        let key = (state.revision, state.filters.clone());
        if let (Some(cached_key), Some(value)) = (&self.key, &self.value) {
            if *cached_key == key {
                return Arc::clone(value);
            }
        }
        let value = Arc::new(rollup(&state.rows, &state.filters, window, weights));
        self.computations += 1;
        self.key = Some(key);
        self.value = Some(Arc::clone(&value));
        value
    }

    /// Number of rollups actually computed
    #[inline]
    #[must_use]
    pub fn computations(&self) -> u64 {
        self.computations
    }
}

/// Owner of planning state and its derived snapshot
#[derive(Debug)]
pub struct PlanningStore {
    state: PlanningState,
    window: ReportingWindow,
    weights: FallbackWeights,
    memo: RollupMemo,
    snapshot: Arc<Snapshot>,
    subscribers: Vec<Sender<Arc<Snapshot>>>,
}

impl PlanningStore {
    /// Create an empty store from configuration
    ///
    /// # Errors
    /// Returns error if the configured reporting window is invalid
    pub fn new(config: &PlanningConfig) -> Result<Self> {
        Ok(Self::with_window(
            config.reporting_window()?,
            config.fallback_weights,
        ))
    }

    /// Create an empty store with an explicit window and weights
    #[must_use]
    pub fn with_window(window: ReportingWindow, weights: FallbackWeights) -> Self {
        let mut memo = RollupMemo::default();
        let state = PlanningState::default();
        let snapshot = Arc::new(full_snapshot(&state, &mut memo, &window, &weights).0);
        Self {
            state,
            window,
            weights,
            memo,
            snapshot,
            subscribers: Vec::new(),
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &PlanningState {
        &self.state
    }

    /// Latest snapshot
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Reporting window in use
    #[inline]
    #[must_use]
    pub fn window(&self) -> &ReportingWindow {
        &self.window
    }

    /// Number of rollups computed so far
    #[inline]
    #[must_use]
    pub fn rollup_computations(&self) -> u64 {
        self.memo.computations()
    }

    /// Receive every snapshot published after this call
    pub fn subscribe(&mut self) -> Receiver<Arc<Snapshot>> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Apply an action, recompute derived data, and publish the snapshot
    pub fn dispatch(&mut self, action: Action) -> Arc<Snapshot> {
        let mut next = reduce(&self.state, &action);

        let snapshot = match action.edits() {
            Some(edits) => {
                let rollup = self.memo.get_or_compute(&next, &self.window, &self.weights);
                let mut consensus = self.snapshot.consensus.clone();
                let keys = edited_groups(edits);
                refresh_consensus(&mut consensus, &rollup, &next.inputs, &keys);
                Snapshot {
                    revision: next.revision,
                    filters: next.filters.clone(),
                    level: rollup.level,
                    bridge: build_bridge(&rollup, &next.inputs, &self.window),
                    rollup,
                    consensus,
                    inputs: next.inputs.clone(),
                }
            }
            None => {
                let (snapshot, inputs) =
                    full_snapshot(&next, &mut self.memo, &self.window, &self.weights);
                next.inputs = inputs;
                snapshot
            }
        };

        self.state = next;
        self.snapshot = Arc::new(snapshot);
        self.publish();
        self.snapshot()
    }

    fn publish(&mut self) {
        let snapshot = &self.snapshot;
        self.subscribers
            .retain(|tx| tx.send(Arc::clone(snapshot)).is_ok());
    }
}

/// Recompute rollup, synchronized inputs, consensus, and bridge from scratch
fn full_snapshot(
    state: &PlanningState,
    memo: &mut RollupMemo,
    window: &ReportingWindow,
    weights: &FallbackWeights,
) -> (Snapshot, TeamInputs) {
    let rollup = memo.get_or_compute(state, window, weights);
    let (inputs, consensus) = synchronize(&rollup, &state.inputs);
    let snapshot = Snapshot {
        revision: state.revision,
        filters: state.filters.clone(),
        level: rollup.level,
        bridge: build_bridge(&rollup, &inputs, window),
        rollup,
        consensus,
        inputs: inputs.clone(),
    };
    (snapshot, inputs)
}
